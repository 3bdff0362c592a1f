//! 事件 trait
//!
//! 定义仿真事件接口。

use super::simulator::Simulator;
use super::world::World;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 已调度事件的句柄，可用于取消（见 [`Simulator::cancel`]）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// 把闭包包装成事件（`Simulator::schedule_fn` 使用）。
pub(crate) struct FnEvent<F>(pub(crate) F);

impl<F> Event for FnEvent<F>
where
    F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
{
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        (self.0)(sim, world)
    }
}
