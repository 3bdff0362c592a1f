//! 世界 trait
//!
//! 事件执行时拿到的可变仿真状态。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：持有拓扑、协议栈与 tracer 等全部可变状态（见 `net::NetWorld`）。
///
/// 事件通过 `as_any_mut` 向下转型拿到具体类型。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完后调用一次
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
