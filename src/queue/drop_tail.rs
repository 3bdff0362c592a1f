//! DropTail（尾丢弃）队列
//!
//! 队列满时直接丢弃新到达的 packet，已排队的 packet 不受影响。

use std::collections::VecDeque;

use crate::error::ConfigError;
use crate::net::Packet;

use super::{PacketQueue, QueueLimit};

#[derive(Debug)]
pub struct DropTailQueue {
    limit: QueueLimit,
    cur_bytes: u64,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(limit: QueueLimit) -> Result<Self, ConfigError> {
        Ok(Self {
            limit: limit.validate()?,
            cur_bytes: 0,
            q: VecDeque::new(),
        })
    }

    /// 按包数计容量
    pub fn with_packets(pkts: u64) -> Result<Self, ConfigError> {
        Self::new(QueueLimit::Packets(pkts))
    }

    fn admits(&self, pkt: &Packet) -> bool {
        match self.limit {
            QueueLimit::Packets(max) => (self.q.len() as u64) < max,
            QueueLimit::Bytes(max) => {
                self.cur_bytes.saturating_add(pkt.size_bytes as u64) <= max
            }
        }
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        if !self.admits(&pkt) {
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(pkt.size_bytes as u64);
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn limit(&self) -> QueueLimit {
        self.limit
    }
}
