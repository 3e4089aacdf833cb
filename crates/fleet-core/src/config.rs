//! Runtime configuration for the coordinator, agents, and bridges.
//!
//! Durations are stored as integer milliseconds so config files stay plain
//! numbers; accessor methods convert to `Duration`.  Every section has a
//! `Default` carrying the reference deployment's values, and with the `serde`
//! feature a config file may supply any subset of fields.

use std::time::Duration;

use crate::{CoreError, CoreResult, Criterion, DEFAULT_WEIGHT_SALT};

// ── CoordinatorConfig ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoordinatorConfig {
    /// Time between round-start attempts.
    pub round_interval_ms: u64,

    /// How long a round waits for proposals before evaluating what it has.
    pub response_timeout_ms: u64,

    /// Total tasks to issue before draining.  `None` runs forever.
    pub max_tasks: Option<u64>,

    /// Active assignments at which new rounds pause.  `None` disables the cap.
    pub max_in_flight: Option<usize>,

    /// Seed for destination selection.
    pub seed: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            round_interval_ms:   10_000,
            response_timeout_ms: 10_000,
            max_tasks:           Some(30),
            max_in_flight:       None,
            seed:                42,
        }
    }
}

impl CoordinatorConfig {
    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

// ── AgentConfig ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AgentConfig {
    /// Objective used when pricing CFPs and planning assigned paths.
    pub criterion: Criterion,

    /// NodeUpdate period while executing.
    pub status_interval_ms: u64,

    /// Bound on the wait for a bridge `taskAck` after sending a hop.
    pub hop_ack_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            criterion:          Criterion::Time,
            status_interval_ms: 5_000,
            hop_ack_timeout_ms: 10_000,
        }
    }
}

impl AgentConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn hop_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.hop_ack_timeout_ms)
    }
}

// ── BridgeConfig ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BridgeConfig {
    /// Telemetry silence longer than this raises the staleness flag.
    pub staleness_threshold_ms: u64,

    /// Bound on the bus round trip from a published hop to its arrival report.
    pub hop_timeout_ms: u64,

    /// How often the bridge checks staleness and sweeps expired requests.
    pub watchdog_interval_ms: u64,

    /// Outbound frames buffered per control-session client before the client
    /// is considered unresponsive and pruned.
    pub client_queue: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_ms: 15_000,
            hop_timeout_ms:         120_000,
            watchdog_interval_ms:   1_000,
            client_queue:           64,
        }
    }
}

impl BridgeConfig {
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }

    pub fn hop_timeout(&self) -> Duration {
        Duration::from_millis(self.hop_timeout_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}

// ── FleetConfig ───────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// Typically loaded from a JSON file by the application crate, overridden by
/// CLI flags, validated once, then split into sections for each actor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FleetConfig {
    pub coordinator: CoordinatorConfig,
    pub agent:       AgentConfig,
    pub bridge:      BridgeConfig,

    /// Salt for edge carbon/cost factors.  Every process in a deployment must
    /// use the same value.
    pub weight_salt: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            agent:       AgentConfig::default(),
            bridge:      BridgeConfig::default(),
            weight_salt: DEFAULT_WEIGHT_SALT,
        }
    }
}

impl FleetConfig {
    /// Reject values that would turn a timeout into a busy loop or an
    /// immediate failure.
    pub fn validate(&self) -> CoreResult<()> {
        let nonzero = [
            ("coordinator.round_interval_ms",   self.coordinator.round_interval_ms),
            ("coordinator.response_timeout_ms", self.coordinator.response_timeout_ms),
            ("agent.status_interval_ms",        self.agent.status_interval_ms),
            ("agent.hop_ack_timeout_ms",        self.agent.hop_ack_timeout_ms),
            ("bridge.staleness_threshold_ms",   self.bridge.staleness_threshold_ms),
            ("bridge.hop_timeout_ms",           self.bridge.hop_timeout_ms),
            ("bridge.watchdog_interval_ms",     self.bridge.watchdog_interval_ms),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(CoreError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.bridge.client_queue == 0 {
            return Err(CoreError::Config("bridge.client_queue must be greater than zero".into()));
        }
        if self.coordinator.max_in_flight == Some(0) {
            return Err(CoreError::Config("coordinator.max_in_flight must be at least 1".into()));
        }
        Ok(())
    }
}
