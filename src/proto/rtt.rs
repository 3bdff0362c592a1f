//! RTO 估计（RFC 6298）
//!
//! srtt/rttvar 平滑 + 指数退避。样本只来自未重传过的段（Karn 算法由调用方保证）。

use crate::sim::SimTime;

#[derive(Debug, Clone)]
pub struct RttEstimator {
    srtt: Option<f64>, // ns
    rttvar: f64,       // ns
    rto: SimTime,
    min_rto: SimTime,
    max_rto: SimTime,
}

impl RttEstimator {
    pub fn new(init_rto: SimTime, min_rto: SimTime, max_rto: SimTime) -> Self {
        let max_rto = max_rto.max(min_rto);
        Self {
            srtt: None,
            rttvar: 0.0,
            rto: init_rto.max(min_rto).min(max_rto),
            min_rto,
            max_rto,
        }
    }

    pub fn rto(&self) -> SimTime {
        self.rto
    }

    pub fn srtt(&self) -> Option<SimTime> {
        self.srtt.map(|s| SimTime(s.round() as u64))
    }

    /// 新的 RTT 测量值
    pub fn sample(&mut self, rtt: SimTime) {
        let r = rtt.0 as f64;
        match self.srtt {
            None => {
                self.srtt = Some(r);
                self.rttvar = r / 2.0;
            }
            Some(srtt) => {
                self.rttvar = 0.75 * self.rttvar + 0.25 * (srtt - r).abs();
                self.srtt = Some(0.875 * srtt + 0.125 * r);
            }
        }
        let srtt = self.srtt.unwrap_or(r);
        let rto = SimTime((srtt + 4.0 * self.rttvar).round() as u64);
        self.rto = rto.max(self.min_rto).min(self.max_rto);
    }

    /// 超时后 RTO 翻倍（不超过 max_rto）
    pub fn backoff(&mut self) {
        self.rto = self.rto.saturating_mul(2).min(self.max_rto);
    }
}
