//! TCP（简化版）协议实现
//!
//! 支持批量传输实验所需的最小功能：
//! - 数据段/累计 ACK 段，接收端乱序缓存
//! - 可选拥塞控制变体（Tahoe / Reno / NewReno，见 `congestion`）
//! - 3 dupACK 快速重传，超时重传（RFC 6298 RTO 估计 + 指数退避）
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现握手/窗口通告/选择确认等。

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::app::{BulkSource, TcpSink};
use super::congestion::{CcAction, CongestionController, TcpVariant};
use super::rtt::RttEstimator;
use crate::error::ConfigError;
use crate::net::{NetApi, NodeId, TcpSegment, Transport, with_tcp_stack};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识（复用 `flow_id` 的语义）。
pub type TcpConnId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// 拥塞控制变体
    pub variant: TcpVariant,
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// 数据段的首部开销（字节），计入线路上的包大小
    pub header_bytes: u32,
    /// ACK 包大小（字节）
    pub ack_bytes: u32,
    /// 初始 cwnd（字节）
    pub init_cwnd_bytes: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO
    pub init_rto: SimTime,
    /// RTO 下限
    pub min_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
    /// 发送缓冲（字节）：应用最多领先已确认数据这么多
    pub send_buffer_bytes: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        let mss = 536;
        Self {
            variant: TcpVariant::NewReno,
            mss,
            header_bytes: 40,
            ack_bytes: 40,
            init_cwnd_bytes: mss as u64,
            init_ssthresh_bytes: 65_535,
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            send_buffer_bytes: 128 * 1024,
        }
    }
}

impl TcpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mss == 0 {
            return Err(ConfigError::ZeroSegmentSize);
        }
        if self.init_rto == SimTime::ZERO || self.min_rto == SimTime::ZERO {
            return Err(ConfigError::ZeroRto);
        }
        Ok(())
    }
}

/// 连接级计数器
#[derive(Debug, Clone, Default)]
pub struct TcpConnStats {
    pub segments_sent: u64,
    pub retransmits: u64,
    pub fast_retransmits: u64,
    pub timeouts: u64,
    pub dup_acks: u64,
    /// 确认了从未发送过的数据的 ACK（被忽略）
    pub invalid_acks: u64,
}

#[derive(Debug, Clone)]
struct SentSeg {
    len: u32,
    sent_at: SimTime,
    retransmitted: bool,
}

#[derive(Debug, Clone)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub src: NodeId,
    pub dst: NodeId,
    pub fwd_route: Vec<NodeId>,
    pub rev_route: Vec<NodeId>,
    pub cfg: TcpConfig,

    cc: CongestionController,
    rtt: RttEstimator,
    source: BulkSource,
    sink: TcpSink,

    // sender
    app_end: u64,    // 应用已写入的字节
    next_seq: u64,   // 下一个要发的字节（go-back-N 时回退）
    high_tx: u64,    // 发送过的最高字节
    last_acked: u64, // 累计确认点
    inflight: BTreeMap<u64, SentSeg>, // seq -> segment
    rto_timer: Option<EventId>,

    stats: TcpConnStats,
    start_at: Option<SimTime>,
    done_at: Option<SimTime>,
}

impl TcpConn {
    /// `fwd_route` 从发送端到接收端；`max_bytes` 为 BulkSource 的字节预算（0 表示不限）。
    pub fn new(
        id: TcpConnId,
        fwd_route: Vec<NodeId>,
        max_bytes: u64,
        cfg: TcpConfig,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let (Some(&src), Some(&dst)) = (fwd_route.first(), fwd_route.last()) else {
            return Err(ConfigError::RouteTooShort(fwd_route.len()));
        };
        if fwd_route.len() < 2 {
            return Err(ConfigError::RouteTooShort(fwd_route.len()));
        }
        let mut rev_route = fwd_route.clone();
        rev_route.reverse();

        let mss = cfg.mss as f64;
        let cc = CongestionController::new(
            cfg.variant,
            cfg.init_cwnd_bytes as f64 / mss,
            cfg.init_ssthresh_bytes as f64 / mss,
        );
        let rtt = RttEstimator::new(cfg.init_rto, cfg.min_rto, cfg.max_rto);
        let source = BulkSource::new(max_bytes, cfg.send_buffer_bytes);
        Ok(Self {
            id,
            src,
            dst,
            fwd_route,
            rev_route,
            cfg,
            cc,
            rtt,
            source,
            sink: TcpSink::default(),
            app_end: 0,
            next_seq: 0,
            high_tx: 0,
            last_acked: 0,
            inflight: BTreeMap::new(),
            rto_timer: None,
            stats: TcpConnStats::default(),
            start_at: None,
            done_at: None,
        })
    }

    pub fn bytes_acked(&self) -> u64 {
        self.last_acked
    }

    /// 发送过的最高字节（不含重传）
    pub fn bytes_sent(&self) -> u64 {
        self.high_tx
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    pub fn start_time(&self) -> Option<SimTime> {
        self.start_at
    }

    pub fn done_time(&self) -> Option<SimTime> {
        self.done_at
    }

    pub fn controller(&self) -> &CongestionController {
        &self.cc
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn source(&self) -> &BulkSource {
        &self.source
    }

    pub fn sink(&self) -> &TcpSink {
        &self.sink
    }

    pub fn stats(&self) -> &TcpConnStats {
        &self.stats
    }

    pub fn rto_timer(&self) -> Option<EventId> {
        self.rto_timer
    }

    /// 尚未确认的字节区间数（按段计）
    pub fn segments_in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// 已发出（或即将重发）但未确认的字节
    pub fn flight_bytes(&self) -> u64 {
        self.next_seq.saturating_sub(self.last_acked)
    }

    fn has_outstanding(&self) -> bool {
        self.high_tx > self.last_acked
    }

    /// 应用写入 `n_bytes`；是否立即发出由拥塞窗口决定。
    pub fn send(&mut self, n_bytes: u64) {
        self.app_end = self.app_end.saturating_add(n_bytes);
    }

    fn seg_len(&self, seq: u64) -> u32 {
        (self.cfg.mss as u64).min(self.app_end.saturating_sub(seq)) as u32
    }

    /// 让应用写入更多数据，再按窗口发送。
    fn pump(&mut self, sim: &mut Simulator, net: &mut dyn NetApi) {
        let unacked = self.app_end - self.last_acked;
        let n = self.source.next_write(unacked);
        self.send(n);
        self.send_data_if_possible(sim, net);
        self.check_done(sim);
    }

    fn send_data_if_possible(&mut self, sim: &mut Simulator, net: &mut dyn NetApi) {
        if self.done_at.is_some() {
            return;
        }
        let wnd = self.cc.window_bytes(self.cfg.mss);
        while self.next_seq < self.app_end {
            let len = self.seg_len(self.next_seq);
            let flight = self.flight_bytes();
            if flight > 0 && flight + len as u64 > wnd {
                break;
            }
            let seq = self.next_seq;
            self.next_seq += len as u64;
            self.transmit_segment(seq, len, sim, net);
        }
    }

    fn transmit_segment(&mut self, seq: u64, len: u32, sim: &mut Simulator, net: &mut dyn NetApi) {
        let now = sim.now();
        let retransmitted = seq < self.high_tx;
        let size = len.saturating_add(self.cfg.header_bytes);
        let mut pkt = net.make_packet(self.id, size, self.fwd_route.clone(), now);
        pkt.transport = Transport::Tcp(TcpSegment::Data { seq, len });

        self.inflight.insert(
            seq,
            SentSeg {
                len,
                sent_at: now,
                retransmitted,
            },
        );
        self.stats.segments_sent += 1;
        if retransmitted {
            self.stats.retransmits += 1;
        }
        self.high_tx = self.high_tx.max(seq + len as u64);
        trace!(conn_id = self.id, seq, len, retransmitted, "发送数据段");

        net.forward_from(self.src, pkt, sim);
        self.arm_rto(sim);
    }

    fn retransmit_head(&mut self, sim: &mut Simulator, net: &mut dyn NetApi) {
        let seq = self.last_acked;
        if seq >= self.high_tx {
            return;
        }
        let len = self
            .inflight
            .get(&seq)
            .map(|s| s.len)
            .unwrap_or_else(|| self.seg_len(seq));
        self.transmit_segment(seq, len, sim, net);
    }

    /// 有未确认数据且计时器未运行时启动 RTO 计时器
    fn arm_rto(&mut self, sim: &mut Simulator) {
        if self.rto_timer.is_some() || !self.has_outstanding() {
            return;
        }
        let id = sim.schedule_in(self.rtt.rto(), TcpRto { conn_id: self.id });
        self.rto_timer = Some(id);
    }

    fn restart_rto(&mut self, sim: &mut Simulator) {
        if let Some(t) = self.rto_timer.take() {
            sim.cancel(t);
        }
        self.arm_rto(sim);
    }

    fn check_done(&mut self, sim: &mut Simulator) {
        if self.done_at.is_some() || !self.source.is_closed() || self.last_acked < self.app_end {
            return;
        }
        if let Some(t) = self.rto_timer.take() {
            sim.cancel(t);
        }
        self.done_at = Some(sim.now());
        info!(
            conn_id = self.id,
            acked = self.last_acked,
            now = ?sim.now(),
            "🏁 连接完成"
        );
    }

    fn trace_cwnd_if_changed(&self, before: f64, now: SimTime, net: &mut dyn NetApi) {
        if self.cc.cwnd() != before {
            net.trace_cwnd(now, self.id, self.cc.cwnd_segments());
        }
    }

    /// 发送端收到 ACK
    pub fn on_ack(&mut self, ack: u64, sim: &mut Simulator, net: &mut dyn NetApi) {
        if self.done_at.is_some() {
            return;
        }
        let now = sim.now();

        if ack > self.high_tx {
            warn!(conn_id = self.id, ack, high_tx = self.high_tx, "ACK 确认了未发送的数据，忽略");
            self.stats.invalid_acks += 1;
            return;
        }

        if ack > self.last_acked {
            let newly_acked = ack - self.last_acked;

            // 移除已确认段；只用未重传过的段采样 RTT（Karn）
            let mut any_retransmitted = false;
            let mut newest_sent_at = None;
            while let Some((&s, seg)) = self.inflight.first_key_value() {
                if s + seg.len as u64 > ack {
                    break;
                }
                any_retransmitted |= seg.retransmitted;
                newest_sent_at = Some(seg.sent_at);
                self.inflight.remove(&s);
            }
            if let (false, Some(sent_at)) = (any_retransmitted, newest_sent_at) {
                self.rtt.sample(now.saturating_sub(sent_at));
            }

            self.last_acked = ack;
            if self.next_seq < ack {
                self.next_seq = ack;
            }

            let before = self.cc.cwnd();
            let action = self
                .cc
                .on_new_ack(ack, newly_acked as f64 / self.cfg.mss as f64);
            self.trace_cwnd_if_changed(before, now, net);

            self.restart_rto(sim);
            if action == CcAction::RetransmitHead {
                debug!(conn_id = self.id, ack, "部分确认，重传下一个未确认段");
                self.retransmit_head(sim, net);
            }
            self.pump(sim, net);
        } else if ack == self.last_acked && self.has_outstanding() {
            self.stats.dup_acks += 1;
            let before = self.cc.cwnd();
            let action = self.cc.on_dup_ack(self.last_acked, self.high_tx);
            self.trace_cwnd_if_changed(before, now, net);

            match action {
                CcAction::RetransmitHead => {
                    debug!(conn_id = self.id, seq = self.last_acked, cwnd = self.cc.cwnd(), "⚡ 快速重传");
                    self.stats.fast_retransmits += 1;
                    self.retransmit_head(sim, net);
                }
                CcAction::GoBackN => {
                    debug!(conn_id = self.id, seq = self.last_acked, "⚡ 快速重传（回退到首个未确认字节）");
                    self.stats.fast_retransmits += 1;
                    self.next_seq = self.last_acked;
                }
                CcAction::Continue => {}
            }
            self.send_data_if_possible(sim, net);
        } else {
            trace!(conn_id = self.id, ack, last_acked = self.last_acked, "过期 ACK");
        }
    }

    /// RTO 计时器触发
    pub fn on_timeout(&mut self, sim: &mut Simulator, net: &mut dyn NetApi) {
        self.rto_timer = None;
        if self.done_at.is_some() || !self.has_outstanding() {
            return;
        }
        self.stats.timeouts += 1;

        let before = self.cc.cwnd();
        self.cc.on_timeout(self.high_tx);
        self.trace_cwnd_if_changed(before, sim.now(), net);
        self.rtt.backoff();
        debug!(
            conn_id = self.id,
            seq = self.last_acked,
            rto = ?self.rtt.rto(),
            "⏰ 超时重传"
        );

        self.next_seq = self.last_acked;
        self.send_data_if_possible(sim, net);
        self.arm_rto(sim);
    }

    /// 接收端收到数据段：交给 sink，回累计 ACK。
    pub fn on_data(&mut self, seq: u64, len: u32, sim: &mut Simulator, net: &mut dyn NetApi) {
        let ack = self.sink.on_segment(seq, len);
        let mut pkt = net.make_packet(self.id, self.cfg.ack_bytes, self.rev_route.clone(), sim.now());
        pkt.transport = Transport::Tcp(TcpSegment::Ack { ack });
        trace!(conn_id = self.id, seq, ack, "发送 ACK");
        net.forward_from(self.dst, pkt, sim);
    }
}

#[derive(Debug, Default)]
pub struct TcpStack {
    conns: HashMap<TcpConnId, TcpConn>,
}

impl TcpStack {
    pub fn insert(&mut self, conn: TcpConn) {
        self.conns.insert(conn.id, conn);
    }

    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn get_mut(&mut self, id: TcpConnId) -> Option<&mut TcpConn> {
        self.conns.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// 连接 id，升序
    pub fn ids(&self) -> Vec<TcpConnId> {
        let mut ids: Vec<_> = self.conns.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// 注册连接并让应用开始写数据（连接已建立假设）
    pub fn start_conn(&mut self, mut conn: TcpConn, sim: &mut Simulator, net: &mut dyn NetApi) {
        let id = conn.id;
        conn.start_at = Some(sim.now());
        info!(
            conn_id = id,
            variant = %conn.cfg.variant,
            src = ?conn.src,
            dst = ?conn.dst,
            budget = conn.source.max_bytes(),
            "▶️  启动 TCP 流"
        );
        self.insert(conn);
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.pump(sim, net);
        }
    }

    /// 停止连接上的应用：不再写入新数据，已写入的数据继续传完
    pub fn stop_conn(&mut self, id: TcpConnId, sim: &mut Simulator) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        conn.source.stop();
        info!(conn_id = id, written = conn.source.written(), "⏹️  应用停止");
        conn.check_done(sim);
    }

    pub fn on_timeout(&mut self, id: TcpConnId, sim: &mut Simulator, net: &mut dyn NetApi) {
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.on_timeout(sim, net);
        }
    }

    pub fn on_tcp_segment(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            trace!(conn_id, "未知连接的段");
            return;
        };
        match seg {
            TcpSegment::Data { seq, len } if at == conn.dst => conn.on_data(seq, len, sim, net),
            TcpSegment::Ack { ack } if at == conn.src => conn.on_ack(ack, sim, net),
            _ => trace!(conn_id, at = ?at, "段到达了非端点节点，忽略"),
        }
    }
}

/// 启动一个 TCP 流
#[derive(Debug)]
pub struct TcpStart {
    pub conn: TcpConn,
}

impl Event for TcpStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpStart { conn } = *self;
        with_tcp_stack(world, |net, tcp| tcp.start_conn(conn, sim, net));
    }
}

/// 停止一个 TCP 流上的应用
#[derive(Debug)]
pub struct TcpStop {
    pub conn_id: TcpConnId,
}

impl Event for TcpStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpStop { conn_id } = *self;
        with_tcp_stack(world, |_net, tcp| tcp.stop_conn(conn_id, sim));
    }
}

/// TCP RTO 事件；收到新 ACK 时会被取消并重新调度
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id } = *self;
        with_tcp_stack(world, |net, tcp| tcp.on_timeout(conn_id, sim, net));
    }
}
