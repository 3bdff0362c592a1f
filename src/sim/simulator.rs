//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间、事件队列与取消集合。

use super::event::{Event, EventId, FnEvent};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 生命周期：`Simulator::new()` → 若干次 `run_until`/`run` → `destroy()`。
/// 仿真器不是全局状态，需要调度的组件显式拿到 `&mut Simulator`。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    /// 尚未触发且未取消的事件
    live: HashSet<EventId>,
    /// 已取消但仍留在堆里的事件，出堆时跳过
    cancelled: HashSet<EventId>,
    fired: u64,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的事件总数
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// 仍在等待触发的事件数（不含已取消的）
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    pub fn is_pending(&self, id: EventId) -> bool {
        self.live.contains(&id)
    }

    /// 调度事件在指定时间执行；早于当前时间的 `at` 会被钳到 `now()`。
    #[tracing::instrument(level = "trace", skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        self.push(at, Box::new(ev))
    }

    /// 调度事件在 `delay` 之后执行
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.push(at, Box::new(ev))
    }

    /// 以闭包形式调度一个动作
    pub fn schedule_fn<F>(&mut self, at: SimTime, f: F) -> EventId
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.push(at, Box::new(FnEvent(f)))
    }

    fn push(&mut self, at: SimTime, ev: Box<dyn Event>) -> EventId {
        let at = if at < self.now {
            debug!(now = ?self.now, at = ?at, "调度时间早于当前时间，钳到 now");
            self.now
        } else {
            at
        };
        let id = EventId(self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(now = ?self.now, seq = id.0, "调度事件");

        self.q.push(ScheduledEvent { at, id, ev });
        self.live.insert(id);
        id
    }

    /// 取消一个尚未触发的事件。已触发或已取消的句柄返回 false，不做任何事。
    pub fn cancel(&mut self, id: EventId) -> bool {
        if self.live.remove(&id) {
            self.cancelled.insert(id);
            trace!(seq = id.0, "取消事件");
            true
        } else {
            false
        }
    }

    /// 弹出下一个未取消且触发时间不晚于 `until` 的事件
    fn pop_due(&mut self, until: SimTime) -> Option<ScheduledEvent> {
        while let Some(top) = self.q.peek() {
            if top.at > until {
                return None;
            }
            let item = self.q.pop()?;
            if self.cancelled.remove(&item.id) {
                continue;
            }
            self.live.remove(&item.id);
            return Some(item);
        }
        None
    }

    fn fire(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.now = item.at;
        self.fired = self.fired.saturating_add(1);
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空或到达 `until`；结束后 `now()` 至少为 `until`。
    #[tracing::instrument(skip(self, world))]
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        debug!(now = ?self.now, queue_size = self.q.len(), "run_until 开始");
        while let Some(item) = self.pop_due(until) {
            self.fire(item, world);
        }
        self.now = self.now.max(until);
        info!(now = ?self.now, fired = self.fired, pending = self.live.len(), "⏹️  到达停止时间");
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while let Some(item) = self.pop_due(SimTime::MAX) {
            event_count += 1;
            trace!(
                event_num = event_count,
                scheduled_at = ?item.at,
                seq = item.id.0,
                remaining_queue = self.q.len(),
                "执行事件"
            );
            self.fire(item, world);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }

    /// 结束仿真：丢弃所有未触发事件，返回丢弃的数量。
    pub fn destroy(mut self) -> usize {
        let dropped = self.live.len();
        self.q.clear();
        self.live.clear();
        self.cancelled.clear();
        info!(now = ?self.now, dropped, "🧹 仿真器销毁");
        dropped
    }
}
