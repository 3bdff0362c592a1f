//! Protocol dispatch hooks for the network.

use crate::sim::Simulator;
use tracing::trace;

use super::{Network, NodeId, Packet, Transport};

impl Network {
    /// 数据包送达目的地时的处理：更新统计，并把 TCP 段交给协议栈。
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        trace!(
            pkt_id = pkt.id,
            flow_id = pkt.flow_id,
            at = ?at,
            delay = ?sim.now().saturating_sub(pkt.created_at),
            "✅ 数据包送达目的地"
        );

        // 传输层处理（目的端产生 ACK、源端处理 ACK 驱动继续发送）
        if let Transport::Tcp(seg) = pkt.transport {
            let mut tcp = std::mem::take(&mut self.tcp);
            tcp.on_tcp_segment(pkt.flow_id, at, seg, sim, self);
            self.tcp = tcp;
        }
    }
}
