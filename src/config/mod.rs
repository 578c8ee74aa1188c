mod load;
mod save;

pub use load::load_config;
pub use save::save_config;

use crate::batcher::formulas::OracleMode;
use crate::batcher::network::PlayerStats;
use crate::batcher::ram::ScriptCosts;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "batcher.ron";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("spacer_ms must be positive")]
    ZeroSpacer,
    #[error("steal_fraction must be inside (0, 1), got {0}")]
    StealFraction(f64),
    #[error("home_reserve_gb must be finite and non-negative, got {0}")]
    HomeReserve(f64),
    #[error("{script} RAM cost must be positive, got {cost}")]
    ScriptCost { script: &'static str, cost: f64 },
    #[error("log file path is empty")]
    EmptyLogFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatcherConfig {
    #[serde(default)]
    pub batcher: BatcherSettings,
    #[serde(default)]
    pub scripts: ScriptCosts,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub logging: LogSettings,
}

impl BatcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let batcher = &self.batcher;
        if batcher.spacer_ms == 0 {
            return Err(ConfigError::ZeroSpacer);
        }
        if !(batcher.steal_fraction > 0.0 && batcher.steal_fraction < 1.0) {
            return Err(ConfigError::StealFraction(batcher.steal_fraction));
        }
        if !batcher.home_reserve_gb.is_finite() || batcher.home_reserve_gb < 0.0 {
            return Err(ConfigError::HomeReserve(batcher.home_reserve_gb));
        }
        for (script, cost) in [
            ("hack", self.scripts.hack_ram),
            ("grow", self.scripts.grow_ram),
            ("weaken", self.scripts.weaken_ram),
        ] {
            if !(cost.is_finite() && cost > 0.0) {
                return Err(ConfigError::ScriptCost { script, cost });
            }
        }
        if self.logging.file.trim().is_empty() {
            return Err(ConfigError::EmptyLogFile);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherSettings {
    pub home: String,
    pub spacer_ms: u64,
    pub steal_fraction: f64,
    /// Exploit batches between ground-truth resyncs; 0 never resyncs.
    pub resync_every_batches: u64,
    pub home_reserve_gb: f64,
    pub idle_interval_ms: u64,
    pub oracle: OracleMode,
}

impl Default for BatcherSettings {
    fn default() -> Self {
        Self {
            home: "home".to_string(),
            spacer_ms: 20,
            steal_fraction: 0.1,
            resync_every_batches: 50,
            home_reserve_gb: 8.0,
            idle_interval_ms: 1_000,
            oracle: OracleMode::Precise,
        }
    }
}

impl BatcherSettings {
    pub fn spacer(&self) -> Duration {
        Duration::from_millis(self.spacer_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub seed: u64,
    pub servers: usize,
    pub home_ram: f64,
    pub player: PlayerStats,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            servers: 40,
            home_ram: 1_024.0,
            player: PlayerStats {
                hacking_skill: 250.0,
                port_openers: 2,
                ..PlayerStats::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// A bare level or a full `EnvFilter` directive string.
    pub level: String,
    pub json: bool,
    pub file: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: "batcher.log".to_string(),
        }
    }
}
