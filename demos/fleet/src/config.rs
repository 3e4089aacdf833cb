//! Command-line and file configuration.
//!
//! Layering: `FleetConfig::default()` → optional JSON file (`--config`) →
//! individual flags / environment variables.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use fleet_core::{Criterion, FleetConfig};

/// `fleet`: runs a coordinator, one agent, one bridge and one simulated
/// vehicle per roster entry in a single process.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Map file: `{{Name, {X, Y}}, [Neighbors]}.` records.
    #[arg(long, env = "FLEET_MAP", default_value = "demos/fleet/data/map.txt")]
    pub map: PathBuf,

    /// Roster file: `{Id, Speed, StartNode}.` records.
    #[arg(long, env = "FLEET_ROSTER", default_value = "demos/fleet/data/vehicles.txt")]
    pub roster: PathBuf,

    /// JSON file with a full or partial `FleetConfig`.
    #[arg(long, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for `allocations.csv`, `completions.csv` and `metrics.json`.
    #[arg(long, env = "FLEET_OUTPUT_DIR", default_value = "output")]
    pub output: PathBuf,

    /// Vehicle `i` (0-based roster order) gets its bridge on `base_port + i`.
    #[arg(long, env = "FLEET_BASE_PORT", default_value_t = 8001)]
    pub base_port: u16,

    /// Stop issuing tasks after this many rounds.
    #[arg(long, env = "FLEET_MAX_TASKS")]
    pub max_tasks: Option<u64>,

    /// Pause rounds while this many assignments are outstanding.
    #[arg(long, env = "FLEET_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    #[arg(long, env = "FLEET_ROUND_INTERVAL_MS")]
    pub round_interval_ms: Option<u64>,

    #[arg(long, env = "FLEET_RESPONSE_TIMEOUT_MS")]
    pub response_timeout_ms: Option<u64>,

    /// Routing objective: distance, carbon, cost, time, or priority 1-4.
    #[arg(long, env = "FLEET_CRITERION")]
    pub criterion: Option<Criterion>,

    #[arg(long, env = "FLEET_SEED")]
    pub seed: Option<u64>,

    /// Simulated vehicle telemetry period.
    #[arg(long, env = "FLEET_STEP_MS", default_value_t = 250)]
    pub step_ms: u64,

    /// Emit logs as JSON lines.
    #[arg(long, env = "FLEET_LOG_JSON")]
    pub json_logs: bool,
}

impl Cli {
    /// Resolve the layered configuration and validate it.
    pub fn fleet_config(&self) -> anyhow::Result<FleetConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => FleetConfig::default(),
        };

        let c = &mut config.coordinator;
        if let Some(n) = self.max_tasks {
            c.max_tasks = Some(n);
        }
        if let Some(n) = self.max_in_flight {
            c.max_in_flight = Some(n);
        }
        if let Some(ms) = self.round_interval_ms {
            c.round_interval_ms = ms;
        }
        if let Some(ms) = self.response_timeout_ms {
            c.response_timeout_ms = ms;
        }
        if let Some(seed) = self.seed {
            c.seed = seed;
        }
        if let Some(criterion) = self.criterion {
            config.agent.criterion = criterion;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms.max(1))
    }

    /// Bridge address for the vehicle at roster position `index`.
    pub fn bridge_addr(&self, index: usize) -> anyhow::Result<SocketAddr> {
        let port = u16::try_from(index)
            .ok()
            .and_then(|i| self.base_port.checked_add(i))
            .with_context(|| format!("no port left for vehicle #{index} above {}", self.base_port))?;
        Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }
}
