//! Configuration errors.
//!
//! Everything here is raised while the scenario is being built; once the
//! simulator starts running nothing is fatal.

use std::path::PathBuf;

use crate::net::NodeId;

/// Invalid simulation parameters, reported before the first event fires.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown TCP variant `{0}` (expected TcpTahoe, TcpReno or TcpNewReno)")]
    UnknownTcpVariant(String),

    #[error("link {from:?} -> {to:?} needs a positive data rate")]
    NonPositiveRate { from: NodeId, to: NodeId },

    #[error("queue capacity must be positive")]
    ZeroQueueCapacity,

    #[error("segment size (mss) must be positive")]
    ZeroSegmentSize,

    #[error("retransmission timeout must be positive")]
    ZeroRto,

    #[error("route needs at least two nodes, got {0}")]
    RouteTooShort(usize),

    #[error("scenario needs at least one sender")]
    NoSenders,
}

/// Errors while loading a scenario for the command-line runner.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
