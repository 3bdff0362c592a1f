//! 数据包交付事件
//!
//! packet 在链路另一端到达（传播完成）时触发。

use super::id::NodeId;
use super::net_world::net_world;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};

/// 事件：把一个 packet 交给某个节点处理。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;
        if let Some(w) = net_world(world) {
            w.net.deliver(to, pkt, sim);
        }
    }
}
