//! 队列策略（Queue disciplines）
//!
//! 瓶颈链路只使用 DropTail（尾丢弃）；容量可按包数或字节数计。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// 队列容量的计量方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "limit", rename_all = "snake_case")]
pub enum QueueLimit {
    /// 最多容纳多少个 packet
    Packets(u64),
    /// 最多容纳多少字节
    Bytes(u64),
}

impl QueueLimit {
    pub fn validate(self) -> Result<Self, ConfigError> {
        match self {
            QueueLimit::Packets(0) | QueueLimit::Bytes(0) => Err(ConfigError::ZeroQueueCapacity),
            _ => Ok(self),
        }
    }
}

impl Default for QueueLimit {
    fn default() -> Self {
        QueueLimit::Packets(100)
    }
}

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn limit(&self) -> QueueLimit;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
