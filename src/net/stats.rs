//! 统计信息
//!
//! 网络层计数器（不区分链路；按链路的丢包请订阅 tracer）。

/// 网络统计信息
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    /// 找不到下一跳链路而被丢弃的 packet
    pub unroutable_pkts: u64,
}
