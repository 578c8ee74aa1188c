use crate::batcher::batch::Operation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player-side inputs of every formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub hacking_skill: f64,
    pub money_mult: f64,
    pub grow_mult: f64,
    pub chance_mult: f64,
    pub speed_mult: f64,
    pub port_openers: u8,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            hacking_skill: 100.0,
            money_mult: 1.0,
            grow_mult: 1.0,
            chance_mult: 1.0,
            speed_mult: 1.0,
            port_openers: 0,
        }
    }
}

/// Ground-truth view of one server at the moment it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub hostname: String,
    pub money_available: f64,
    pub money_max: f64,
    pub security_level: f64,
    pub min_security: f64,
    pub required_hacking_skill: f64,
    pub server_growth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostDescriptor {
    pub hostname: String,
    pub max_ram: f64,
    pub used_ram: f64,
    pub has_root_access: bool,
}

impl HostDescriptor {
    pub fn free_ram(&self) -> f64 {
        (self.max_ram - self.used_ram).max(0.0)
    }
}

/// Everything the control loop needs from the world it runs in.
///
/// `run_worker` must not block: the worker sleeps for `delay` on its own and
/// the controller never learns when it finishes.
pub trait Network {
    fn discover_hosts(&self) -> Vec<HostDescriptor>;

    fn ensure_root_access(&self, host: &str) -> bool;

    fn run_worker(
        &self,
        operation: Operation,
        host: &str,
        threads: u64,
        target: &str,
        delay: Duration,
    );

    fn snapshot(&self, host: &str) -> Option<ServerSnapshot>;

    fn player(&self) -> PlayerStats;

    fn most_profitable_target(&self) -> Option<String>;
}
