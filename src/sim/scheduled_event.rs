//! 调度事件
//!
//! 队列中的一项：触发时间 + 插入序号 + 事件对象。

use super::event::{Event, EventId};
use super::time::SimTime;
use std::cmp::Ordering;

/// 调度事件。按 (at, id) 排序，id 单调递增，因此同一时刻按插入顺序触发。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) id: EventId,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    pub fn at(&self) -> SimTime {
        self.at
    }

    pub fn id(&self) -> EventId {
        self.id
    }
}

// BinaryHeap 是 max-heap；需要最小 (at, id) 优先，因此反向比较。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.id.cmp(&other.id))
            .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl Eq for ScheduledEvent {}
