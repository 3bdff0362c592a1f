//! 数据包类型
//!
//! 定义网络数据包及其沿静态路由前进的操作。

use super::id::NodeId;
use super::transport::Transport;
use crate::sim::SimTime;

/// 网络数据包
///
/// 按值在队列、链路与事件之间移动；送达或被丢弃时即销毁。
#[derive(Debug, Clone)]
pub struct Packet {
    /// 全局唯一编号（uid），丢包报告中的 `seq_no` 即此值
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    pub created_at: SimTime,
    pub route: Vec<NodeId>,
    pub hop: usize, // 当前所在节点在 route 中的索引
    pub transport: Transport,
}

impl Packet {
    /// 获取源节点
    pub fn src(&self) -> Option<NodeId> {
        self.route.first().copied()
    }

    /// 获取目标节点
    pub fn dst(&self) -> Option<NodeId> {
        self.route.last().copied()
    }

    /// 获取当前所在节点
    pub fn at(&self) -> Option<NodeId> {
        self.route.get(self.hop).copied()
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }
}
