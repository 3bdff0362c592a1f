//! 瓶颈拓扑构建
//!
//! 拓扑结构（每条链路双向）：
//!
//! ```text
//! src0 ──┐ 5Mbps/2ms
//! src1 ──┤            router ── 800Kbps/5ms ── sink
//! ...  ──┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::net::{LinkId, NetWorld, NodeId};
use crate::queue::QueueLimit;
use crate::sim::SimTime;

/// 瓶颈拓扑配置选项
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BottleneckOpts {
    /// 发送端个数
    pub senders: usize,
    /// 接入链路带宽（bps）
    pub access_bps: u64,
    /// 接入链路单向时延
    pub access_latency: SimTime,
    /// 瓶颈链路带宽（bps）
    pub bottleneck_bps: u64,
    /// 瓶颈链路单向时延
    pub bottleneck_latency: SimTime,
    /// 每个链路发送端队列的容量
    pub queue: QueueLimit,
}

impl Default for BottleneckOpts {
    fn default() -> Self {
        Self {
            senders: 2,
            access_bps: 5_000_000,
            access_latency: SimTime::from_millis(2),
            bottleneck_bps: 800_000,
            bottleneck_latency: SimTime::from_millis(5),
            queue: QueueLimit::Packets(10),
        }
    }
}

/// 构建结果
#[derive(Debug, Clone)]
pub struct BottleneckTopo {
    pub senders: Vec<NodeId>,
    pub router: NodeId,
    pub sink: NodeId,
    /// router -> sink 方向的瓶颈链路（丢包发生的地方）
    pub bottleneck: LinkId,
    /// 每个发送端到 sink 的路由
    pub routes: Vec<Vec<NodeId>>,
}

/// 构建瓶颈拓扑
pub fn build_bottleneck(
    world: &mut NetWorld,
    opts: &BottleneckOpts,
) -> Result<BottleneckTopo, ConfigError> {
    if opts.senders == 0 {
        return Err(ConfigError::NoSenders);
    }
    let net = &mut world.net;
    let router = net.add_router("router");
    let sink = net.add_host("sink");

    let bottleneck =
        net.connect(router, sink, opts.bottleneck_latency, opts.bottleneck_bps, opts.queue)?;
    net.connect(sink, router, opts.bottleneck_latency, opts.bottleneck_bps, opts.queue)?;

    let mut senders = Vec::with_capacity(opts.senders);
    let mut routes = Vec::with_capacity(opts.senders);
    for i in 0..opts.senders {
        let h = net.add_host(format!("src{i}"));
        net.connect(h, router, opts.access_latency, opts.access_bps, opts.queue)?;
        net.connect(router, h, opts.access_latency, opts.access_bps, opts.queue)?;
        senders.push(h);
        routes.push(vec![h, router, sink]);
    }

    Ok(BottleneckTopo {
        senders,
        router,
        sink,
        bottleneck,
        routes,
    })
}
