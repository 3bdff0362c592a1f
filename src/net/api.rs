//! Network-facing API used by the TCP stack.

use crate::sim::{SimTime, Simulator};
use crate::trace::{TraceEvent, TraceSource};

use super::{NodeId, Packet};

/// Minimal network API for protocol stacks.
pub trait NetApi {
    fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>, now: SimTime) -> Packet;
    fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator);

    /// Report a congestion-window change (`cwnd` in whole segments).
    fn trace_cwnd(&mut self, now: SimTime, conn_id: u64, cwnd: u64);
}

impl NetApi for super::Network {
    fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>, now: SimTime) -> Packet {
        super::Network::make_packet(self, flow_id, size_bytes, route, now)
    }

    fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        super::Network::forward_from(self, from, pkt, sim)
    }

    fn trace_cwnd(&mut self, now: SimTime, conn_id: u64, cwnd: u64) {
        self.tracer.emit(
            TraceSource::Cwnd(conn_id),
            now,
            TraceEvent::CwndSample { conn_id, cwnd },
        );
    }
}
