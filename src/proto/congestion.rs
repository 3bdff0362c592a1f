//! Loss-based congestion control: Tahoe, Reno, NewReno.
//!
//! The window is kept in (fractional) segments. The controller only decides
//! window sizes and what kind of retransmission the sender should perform;
//! the connection does the actual sending.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Duplicate ACKs that trigger fast retransmit.
pub const DUP_ACK_THRESHOLD: u32 = 3;

/// Lower bound for `ssthresh` after a loss, in segments.
pub const MIN_SSTHRESH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TcpVariant {
    #[serde(rename = "TcpTahoe")]
    Tahoe,
    #[serde(rename = "TcpReno")]
    Reno,
    #[default]
    #[serde(rename = "TcpNewReno")]
    NewReno,
}

impl TcpVariant {
    pub const ALL: [TcpVariant; 3] = [TcpVariant::Tahoe, TcpVariant::Reno, TcpVariant::NewReno];

    pub fn name(self) -> &'static str {
        match self {
            TcpVariant::Tahoe => "TcpTahoe",
            TcpVariant::Reno => "TcpReno",
            TcpVariant::NewReno => "TcpNewReno",
        }
    }

    fn has_fast_recovery(self) -> bool {
        !matches!(self, TcpVariant::Tahoe)
    }
}

impl fmt::Display for TcpVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TcpVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TcpVariant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| ConfigError::UnknownTcpVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcState {
    SlowStart,
    CongestionAvoidance,
    FastRecovery,
}

/// What the sender has to do after the controller processed a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcAction {
    /// Send new data if the window allows.
    Continue,
    /// Retransmit the first unacknowledged segment.
    RetransmitHead,
    /// Rewind to the first unacknowledged byte and resend from there.
    GoBackN,
}

#[derive(Debug, Clone)]
pub struct CongestionController {
    variant: TcpVariant,
    cwnd: f64,
    ssthresh: f64,
    state: CcState,
    dup_acks: u32,
    /// Highest byte sent when the last loss was detected.
    recover: u64,
}

impl CongestionController {
    /// `init_cwnd` and `init_ssthresh` are in segments; cwnd starts at least at 1.
    pub fn new(variant: TcpVariant, init_cwnd: f64, init_ssthresh: f64) -> Self {
        Self {
            variant,
            cwnd: init_cwnd.max(1.0),
            ssthresh: init_ssthresh.max(MIN_SSTHRESH),
            state: CcState::SlowStart,
            dup_acks: 0,
            recover: 0,
        }
    }

    pub fn variant(&self) -> TcpVariant {
        self.variant
    }

    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    /// Window rounded down to whole segments, as reported in traces.
    pub fn cwnd_segments(&self) -> u64 {
        self.cwnd.floor() as u64
    }

    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    pub fn state(&self) -> CcState {
        self.state
    }

    pub fn dup_acks(&self) -> u32 {
        self.dup_acks
    }

    pub fn recover(&self) -> u64 {
        self.recover
    }

    /// Window in bytes for a given segment size.
    pub fn window_bytes(&self, mss: u32) -> u64 {
        (self.cwnd * mss as f64).floor() as u64
    }

    /// A cumulative ACK advanced to `ack`, newly covering `acked_segments`.
    pub fn on_new_ack(&mut self, ack: u64, acked_segments: f64) -> CcAction {
        self.dup_acks = 0;

        if self.state == CcState::FastRecovery {
            let full = match self.variant {
                TcpVariant::NewReno => ack >= self.recover,
                _ => true,
            };
            if full {
                self.cwnd = self.ssthresh.max(1.0);
                self.state = CcState::CongestionAvoidance;
                return CcAction::Continue;
            }
            // NewReno partial ACK: deflate by what was acked, add back one segment.
            self.cwnd = (self.cwnd - acked_segments + 1.0).max(1.0);
            return CcAction::RetransmitHead;
        }

        match self.state {
            CcState::SlowStart => {
                self.cwnd += 1.0;
                if self.cwnd >= self.ssthresh {
                    self.state = CcState::CongestionAvoidance;
                }
            }
            CcState::CongestionAvoidance => {
                self.cwnd += 1.0 / self.cwnd;
            }
            CcState::FastRecovery => {}
        }
        CcAction::Continue
    }

    /// A duplicate ACK for `snd_una` arrived while `snd_max` bytes were sent.
    pub fn on_dup_ack(&mut self, snd_una: u64, snd_max: u64) -> CcAction {
        if self.state == CcState::FastRecovery {
            self.cwnd += 1.0;
            return CcAction::Continue;
        }

        self.dup_acks = self.dup_acks.saturating_add(1);
        if self.dup_acks != DUP_ACK_THRESHOLD {
            return CcAction::Continue;
        }
        // Reno re-enters recovery for every loss; the others ignore dup ACKs
        // left over from the window that was already being repaired.
        if self.variant != TcpVariant::Reno && snd_una < self.recover {
            return CcAction::Continue;
        }

        self.ssthresh = self.halved();
        self.recover = snd_max;
        if self.variant.has_fast_recovery() {
            self.cwnd = self.ssthresh + DUP_ACK_THRESHOLD as f64;
            self.state = CcState::FastRecovery;
            CcAction::RetransmitHead
        } else {
            self.cwnd = 1.0;
            self.state = CcState::SlowStart;
            CcAction::GoBackN
        }
    }

    /// Retransmission timer expired. Always back to slow start with one segment.
    pub fn on_timeout(&mut self, snd_max: u64) -> CcAction {
        self.ssthresh = self.halved();
        self.cwnd = 1.0;
        self.state = CcState::SlowStart;
        self.dup_acks = 0;
        self.recover = snd_max;
        CcAction::GoBackN
    }

    fn halved(&self) -> f64 {
        (self.cwnd / 2.0).max(MIN_SSTHRESH)
    }
}
