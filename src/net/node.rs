//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、路由器）。

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;
use tracing::trace;

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 处理到达的数据包
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);
}

/// 主机节点：TCP 端点
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        trace!(node = %self.name, pkt_id = pkt.id, hop = pkt.hop, "🖥️  Host 收到数据包");
        if pkt.dst() == Some(self.id) || !pkt.has_next() {
            net.on_delivered(self.id, pkt, sim);
        } else {
            net.forward_from(self.id, pkt, sim);
        }
    }
}

/// 路由器节点：按 packet 携带的静态路由转发
#[derive(Debug)]
pub struct Router {
    id: NodeId,
    name: String,
}

impl Router {
    /// 创建新路由器
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Router {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        trace!(node = %self.name, pkt_id = pkt.id, hop = pkt.hop, "🔀 Router 转发数据包");
        if pkt.has_next() {
            net.forward_from(self.id, pkt, sim);
        } else {
            net.on_delivered(self.id, pkt, sim);
        }
    }
}
