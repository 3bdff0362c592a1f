//! Bulk-transfer scenario: topology + one TCP flow per sender.
//!
//! A `Scenario` can be loaded from JSON; missing fields take the reference
//! values (two senders, 500 MiB each, apps active from 0.2 s to 10.0 s).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, ScenarioError};
use crate::net::NetWorld;
use crate::proto::tcp::{TcpConfig, TcpConn, TcpConnId, TcpStart, TcpStop};
use crate::sim::{SimTime, Simulator};
use crate::topo::bottleneck::{BottleneckOpts, BottleneckTopo, build_bottleneck};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub topology: BottleneckOpts,
    pub tcp: TcpConfig,
    /// Byte budget of each bulk sender (0 = unlimited).
    pub data_bytes: u64,
    pub app_start: SimTime,
    pub app_stop: SimTime,
    pub sim_stop: SimTime,
    /// When the cwnd trace of the first sender is attached.
    pub cwnd_trace_at: SimTime,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            topology: BottleneckOpts::default(),
            tcp: TcpConfig::default(),
            data_bytes: 500 * 1024 * 1024,
            app_start: SimTime::from_millis(200),
            app_stop: SimTime::from_millis(10_000),
            sim_stop: SimTime::from_millis(10_100),
            cwnd_trace_at: SimTime::from_millis(500).saturating_add(SimTime(1)),
        }
    }
}

/// What `Scenario::install` built.
#[derive(Debug, Clone)]
pub struct Installed {
    pub topo: BottleneckTopo,
    /// One connection per sender, same order as `topo.senders`.
    pub conn_ids: Vec<TcpConnId>,
}

impl Scenario {
    pub fn from_json_file(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Build the topology and schedule start/stop of every flow.
    pub fn install(
        &self,
        sim: &mut Simulator,
        world: &mut NetWorld,
    ) -> Result<Installed, ConfigError> {
        self.tcp.validate()?;
        let topo = build_bottleneck(world, &self.topology)?;

        let mut conn_ids = Vec::with_capacity(topo.routes.len());
        for (i, route) in topo.routes.iter().enumerate() {
            let conn_id = i as TcpConnId + 1;
            let conn = TcpConn::new(conn_id, route.clone(), self.data_bytes, self.tcp.clone())?;
            sim.schedule(self.app_start, TcpStart { conn });
            sim.schedule(self.app_stop, TcpStop { conn_id });
            conn_ids.push(conn_id);
        }

        info!(
            variant = %self.tcp.variant,
            senders = conn_ids.len(),
            data_bytes = self.data_bytes,
            sim_stop = %self.sim_stop,
            "场景已安装"
        );
        Ok(Installed { topo, conn_ids })
    }
}
