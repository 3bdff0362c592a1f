//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑。

use super::network::Network;
use crate::sim::World;
use std::any::Any;
use tracing::error;

/// 默认的网络世界实现：持有 Network（连同 TCP 栈与 tracer）。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 事件里把 `dyn World` 还原成 `NetWorld`；类型不符时记录错误并返回 None。
pub fn net_world(world: &mut dyn World) -> Option<&mut NetWorld> {
    let w = world.as_any_mut().downcast_mut::<NetWorld>();
    if w.is_none() {
        error!("world must be NetWorld");
    }
    w
}
