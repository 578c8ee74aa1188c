use crate::batcher::batch::{Operation, Slot};
use crate::batcher::formulas::{FormulaOracle, MAX_SECURITY};
use crate::batcher::network::{Network, PlayerStats, ServerSnapshot};
use crate::batcher::threads::Threads;

/// Security closer than this to the floor counts as minimal.
pub const PREP_TOLERANCE: f64 = 1e-4;

/// Locally simulated state of the server being exploited.
///
/// Updated optimistically the moment work is dispatched, and re-read from the
/// network with [`Target::refresh`] when the controller knows nothing is in
/// flight. Money stays in `[0, money_max]`, security in `[min_security, 100]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    server: ServerSnapshot,
    player: PlayerStats,
}

impl Target {
    pub fn new(server: ServerSnapshot, player: PlayerStats) -> Self {
        let mut target = Self { server, player };
        target.set_money(target.server.money_available);
        target.set_security(target.server.security_level);
        target
    }

    pub fn from_network<N: Network + ?Sized>(network: &N, hostname: &str) -> Option<Self> {
        let server = network.snapshot(hostname)?;
        Some(Self::new(server, network.player()))
    }

    pub fn hostname(&self) -> &str {
        &self.server.hostname
    }

    pub fn server(&self) -> &ServerSnapshot {
        &self.server
    }

    pub fn player(&self) -> &PlayerStats {
        &self.player
    }

    pub fn money_available(&self) -> f64 {
        self.server.money_available
    }

    pub fn money_max(&self) -> f64 {
        self.server.money_max
    }

    pub fn security_level(&self) -> f64 {
        self.server.security_level
    }

    pub fn min_security(&self) -> f64 {
        self.server.min_security
    }

    pub fn required_hacking_skill(&self) -> f64 {
        self.server.required_hacking_skill
    }

    pub fn server_growth(&self) -> f64 {
        self.server.server_growth
    }

    pub fn is_prepped(&self) -> bool {
        self.money_is_prepped() && self.security_is_prepped()
    }

    pub fn money_is_prepped(&self) -> bool {
        self.server.money_available == self.server.money_max
    }

    pub fn security_is_prepped(&self) -> bool {
        (self.server.security_level - self.server.min_security).abs() < PREP_TOLERANCE
    }

    pub fn apply(&mut self, oracle: &dyn FormulaOracle, operation: Operation, threads: u64) {
        match operation {
            Operation::Hack => self.apply_hack(oracle, threads),
            Operation::Grow => self.apply_grow(oracle, threads),
            Operation::Weaken => self.apply_weaken(oracle, threads),
        }
    }

    /// Assumes every hack thread succeeds, the worst case for the grow that follows.
    pub fn apply_hack(&mut self, oracle: &dyn FormulaOracle, threads: u64) {
        if threads == 0 {
            return;
        }
        let stolen = (oracle.hack_percent(self) * threads as f64).clamp(0.0, 1.0);
        let money = self.server.money_available * (1.0 - stolen);
        let security = self.server.security_level + oracle.security_increase(Operation::Hack, threads);
        self.set_money(money);
        self.set_security(security);
    }

    pub fn apply_grow(&mut self, oracle: &dyn FormulaOracle, threads: u64) {
        if threads == 0 {
            return;
        }
        let money = oracle.grow_amount(self, threads);
        let security = self.server.security_level + oracle.security_increase(Operation::Grow, threads);
        self.set_money(money);
        self.set_security(security);
    }

    pub fn apply_weaken(&mut self, oracle: &dyn FormulaOracle, threads: u64) {
        if threads == 0 {
            return;
        }
        let security = self.server.security_level - oracle.weaken_effect() * threads as f64;
        self.set_security(security);
    }

    /// Applies all four slots in landing order.
    pub fn apply_batch(&mut self, oracle: &dyn FormulaOracle, threads: &Threads) {
        for slot in Slot::ALL {
            self.apply(oracle, slot.operation(), threads.get(slot));
        }
    }

    /// Re-reads server and player from the network. Returns `false` and keeps
    /// the local state if the host is gone.
    pub fn refresh<N: Network + ?Sized>(&mut self, network: &N) -> bool {
        match network.snapshot(&self.server.hostname) {
            Some(server) => {
                *self = Self::new(server, network.player());
                true
            }
            None => false,
        }
    }

    fn set_money(&mut self, money: f64) {
        let max = self.server.money_max.max(0.0);
        self.server.money_available = if money.is_finite() { money.clamp(0.0, max) } else { max };
    }

    fn set_security(&mut self, security: f64) {
        let floor = self.server.min_security.min(MAX_SECURITY);
        self.server.security_level = if security.is_finite() {
            security.clamp(floor, MAX_SECURITY)
        } else {
            MAX_SECURITY
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::formulas::{ApproximateFormulas, PreciseFormulas};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn snapshot(money: f64, security: f64) -> ServerSnapshot {
        ServerSnapshot {
            hostname: "phantasy".to_string(),
            money_available: money,
            money_max: 1_000_000.0,
            security_level: security,
            min_security: 10.0,
            required_hacking_skill: 100.0,
            server_growth: 50.0,
        }
    }

    #[test]
    fn construction_clamps_out_of_range_snapshots() {
        let target = Target::new(snapshot(5_000_000.0, 3.0), PlayerStats::default());
        assert_eq!(target.money_available(), 1_000_000.0);
        assert_eq!(target.security_level(), 10.0);
        assert!(target.is_prepped());
    }

    #[test]
    fn prepped_check_uses_security_tolerance() {
        let target = Target::new(snapshot(1_000_000.0, 10.00005), PlayerStats::default());
        assert!(target.security_is_prepped());
        let target = Target::new(snapshot(1_000_000.0, 10.001), PlayerStats::default());
        assert!(!target.security_is_prepped());
        assert!(target.money_is_prepped());
    }

    #[test]
    fn zero_thread_operations_keep_a_prepped_target_prepped() {
        let oracle = PreciseFormulas;
        let mut target = Target::new(snapshot(1_000_000.0, 10.0), PlayerStats::default());
        target.apply_hack(&oracle, 0);
        target.apply_grow(&oracle, 0);
        target.apply_weaken(&oracle, 0);
        target.apply_batch(&oracle, &Threads::default());
        assert!(target.is_prepped());
    }

    #[test]
    fn random_operation_sequences_stay_in_bounds() {
        let oracles: [&dyn FormulaOracle; 2] = [&PreciseFormulas, &ApproximateFormulas];
        let mut rng = StdRng::seed_from_u64(7);
        for oracle in oracles {
            let mut target = Target::new(snapshot(250_000.0, 35.0), PlayerStats::default());
            for _ in 0..2_000 {
                let threads = rng.gen_range(0..5_000);
                match rng.gen_range(0..3) {
                    0 => target.apply_hack(oracle, threads),
                    1 => target.apply_grow(oracle, threads),
                    _ => target.apply_weaken(oracle, threads),
                }
                assert!(target.money_available() >= 0.0);
                assert!(target.money_available() <= target.money_max());
                assert!(target.security_level() >= target.min_security());
                assert!(target.security_level() <= MAX_SECURITY);
            }
        }
    }

    #[test]
    fn hack_raises_security_and_lowers_money() {
        let oracle = PreciseFormulas;
        let mut target = Target::new(snapshot(1_000_000.0, 10.0), PlayerStats::default());
        target.apply_hack(&oracle, 10);
        assert!(target.money_available() < 1_000_000.0);
        assert!((target.security_level() - 10.02).abs() < 1e-9);
    }
}
