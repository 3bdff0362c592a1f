//! 网络拓扑管理
//!
//! 节点、单向链路、按链路排队与序列化发送、统计信息，以及挂在网络上的
//! TCP 协议栈与 tracer。

use std::collections::HashMap;

use super::deliver_packet::DeliverPacket;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::node::{Host, Node, Router};
use super::packet::Packet;
use super::stats::Stats;
use crate::error::ConfigError;
use crate::proto::tcp::TcpStack;
use crate::queue::QueueLimit;
use crate::sim::{SimTime, Simulator};
use crate::trace::{TraceEvent, TraceSource, Tracer};
use tracing::{debug, trace, warn};

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    next_pkt_id: u64,
    pub stats: Stats,
    pub tcp: TcpStack,
    pub tracer: Tracer,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Host::new(id, name))));
        id
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Router::new(id, name))));
        id
    }

    /// 连接两个节点（创建单向链路，发送端带 DropTail 队列）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        limit: QueueLimit,
    ) -> Result<LinkId, ConfigError> {
        let link = Link::new(from, to, latency, bandwidth_bps, limit)?;
        let id = LinkId(self.links.len());
        self.links.push(link);
        self.edges.insert((from, to), id);
        Ok(id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0)?.as_deref().map(|n| n.name())
    }

    /// 创建数据包
    pub fn make_packet(
        &mut self,
        flow_id: u64,
        size_bytes: u32,
        route: Vec<NodeId>,
        now: SimTime,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            created_at: now,
            route,
            hop: 0,
            transport: Default::default(),
        }
    }

    /// 将数据包交付给节点处理
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let Some(mut node) = self.nodes.get_mut(to.0).and_then(Option::take) else {
            warn!(to = ?to, pkt_id = pkt.id, "目标节点不存在，丢弃数据包");
            self.stats.unroutable_pkts += 1;
            return;
        };
        node.on_packet(pkt, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点把数据包送上通往下一跳的链路：入队，链路空闲则立即开始发送。
    #[tracing::instrument(level = "trace", skip(self, sim, pkt), fields(pkt_id = pkt.id, from = ?from, hop = pkt.hop))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(link_id) = pkt.next().and_then(|to| self.link_between(from, to)) else {
            warn!(pkt_id = pkt.id, from = ?from, next = ?pkt.next(), "没有通往下一跳的链路");
            self.stats.unroutable_pkts += 1;
            return;
        };
        let link = &mut self.links[link_id.0];
        match link.queue.enqueue(pkt) {
            Ok(()) => {
                trace!(link_id = ?link_id, q_len = link.queue.len(), "入队");
                self.start_tx(link_id, sim);
            }
            Err(dropped) => {
                debug!(
                    link_id = ?link_id,
                    pkt_id = dropped.id,
                    size_bytes = dropped.size_bytes,
                    q_len = link.queue.len(),
                    "🗑️  队列已满，尾丢弃"
                );
                let (link_from, link_to) = (link.from, link.to);
                self.stats.dropped_pkts += 1;
                self.stats.dropped_bytes += dropped.size_bytes as u64;
                self.tracer.emit(
                    TraceSource::QueueDrop(link_id),
                    sim.now(),
                    TraceEvent::Drop {
                        link_from: link_from.0,
                        link_to: link_to.0,
                        pkt_id: dropped.id,
                        size_bytes: dropped.size_bytes,
                    },
                );
            }
        }
    }

    /// 链路完成一次序列化：标记空闲并发送队列中的下一个 packet。
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let Some(link) = self.links.get_mut(link_id.0) else {
            return;
        };
        link.busy = false;
        self.start_tx(link_id, sim);
    }

    /// 若链路空闲且队列非空，取出队首开始发送。
    fn start_tx(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        if link.busy {
            return;
        }
        let Some(pkt) = link.queue.dequeue() else {
            return;
        };
        link.busy = true;

        let now = sim.now();
        let depart = now.saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        let to = link.to;
        trace!(
            link_id = ?link_id,
            pkt_id = pkt.id,
            depart = ?depart,
            arrive = ?arrive,
            "开始序列化发送"
        );

        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(arrive, DeliverPacket { to, pkt: pkt.advance() });
    }
}
