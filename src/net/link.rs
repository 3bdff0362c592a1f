//! 链路类型
//!
//! 单向点到点链路：带宽、传播时延、发送端队列，以及“是否正在发送”。

use super::id::NodeId;
use crate::error::ConfigError;
use crate::queue::{DropTailQueue, PacketQueue, QueueLimit};
use crate::sim::SimTime;

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 是否有 packet 正在序列化（同一时刻至多一个）
    pub busy: bool,
    /// 发送端排队（DropTail）；正在发送的 packet 不计入
    pub queue: Box<dyn PacketQueue>,
}

impl Link {
    /// 创建新链路；带宽必须为正，队列容量必须为正。
    pub fn new(
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        limit: QueueLimit,
    ) -> Result<Self, ConfigError> {
        if bandwidth_bps == 0 {
            return Err(ConfigError::NonPositiveRate { from, to });
        }
        Ok(Self {
            from,
            to,
            latency,
            bandwidth_bps,
            busy: false,
            queue: Box::new(DropTailQueue::new(limit)?),
        })
    }

    /// 计算传输指定字节数所需的时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        let bits = (bytes as u128).saturating_mul(8);
        let bps = self.bandwidth_bps.max(1) as u128;
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps - 1)) / bps;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}
