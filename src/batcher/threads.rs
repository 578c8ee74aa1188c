use crate::batcher::batch::{Operation, Slot};
use crate::batcher::formulas::FormulaOracle;
use crate::batcher::target::Target;
use serde::{Deserialize, Serialize};
use tracing::debug;

// Quotients like 0.3 / 0.1 land a hair under the integer they mean.
const FLOOR_SLACK: f64 = 1e-9;

/// Thread counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threads {
    pub hack: u64,
    pub grow: u64,
    pub weaken_for_hack: u64,
    pub weaken_for_grow: u64,
}

impl Threads {
    pub fn single(operation: Operation, threads: u64) -> Self {
        let mut planned = Self::default();
        match operation {
            Operation::Hack => planned.hack = threads,
            Operation::Grow => planned.grow = threads,
            Operation::Weaken => planned.weaken_for_grow = threads,
        }
        planned
    }

    pub fn get(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Hack => self.hack,
            Slot::WeakenForHack => self.weaken_for_hack,
            Slot::Grow => self.grow,
            Slot::WeakenForGrow => self.weaken_for_grow,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut u64 {
        match slot {
            Slot::Hack => &mut self.hack,
            Slot::WeakenForHack => &mut self.weaken_for_hack,
            Slot::Grow => &mut self.grow,
            Slot::WeakenForGrow => &mut self.weaken_for_grow,
        }
    }

    pub fn total(&self) -> u64 {
        self.hack + self.grow + self.weaken_for_hack + self.weaken_for_grow
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// True when no field exceeds the corresponding field of `other`.
    pub fn within(&self, other: &Threads) -> bool {
        Slot::ALL.iter().all(|&slot| self.get(slot) <= other.get(slot))
    }
}

/// The single corrective operation of a prep cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepStep {
    pub operation: Operation,
    pub threads: u64,
}

pub fn grow_threads_to_max(target: &Target, oracle: &dyn FormulaOracle) -> u64 {
    if target.money_is_prepped() {
        return 0;
    }
    let goal = target.money_max();
    let mut threads = ceil_threads(oracle.grow_threads(target, goal), "grow to max");
    if threads > 0 && oracle.grow_amount(target, threads) < goal {
        threads += 1;
    }
    threads
}

pub fn weaken_threads_to_min(target: &Target, oracle: &dyn FormulaOracle) -> u64 {
    let gap = target.security_level() - target.min_security();
    if target.security_is_prepped() || gap <= 0.0 {
        return 0;
    }
    covering_weaken_threads(gap, oracle.weaken_effect(), "weaken to min")
}

/// Floors so a batch never steals more than planned.
pub fn hack_threads_for_steal(
    target: &Target,
    oracle: &dyn FormulaOracle,
    steal_fraction: f64,
) -> u64 {
    if steal_fraction <= 0.0 || target.money_available() <= 0.0 {
        return 0;
    }
    let per_thread = oracle.hack_percent(target);
    if per_thread <= 0.0 {
        debug!(target = target.hostname(), "hack effect is zero, planning no hack threads");
        return 0;
    }
    floor_threads(steal_fraction.min(1.0) / per_thread, "hack for steal")
}

/// Weaken threads that cancel the security added by `threads` of `operation`.
/// Rounds up: a short weaken lets security creep from batch to batch.
pub fn compensating_weaken_threads(
    oracle: &dyn FormulaOracle,
    threads: u64,
    operation: Operation,
) -> u64 {
    let increase = oracle.security_increase(operation, threads);
    if increase <= 0.0 {
        return 0;
    }
    covering_weaken_threads(increase, oracle.weaken_effect(), "compensating weaken")
}

/// Grow while money is short, otherwise weaken. `None` once prepped.
pub fn plan_prep(target: &Target, oracle: &dyn FormulaOracle) -> Option<PrepStep> {
    if !target.money_is_prepped() {
        let threads = grow_threads_to_max(target, oracle);
        if threads > 0 {
            return Some(PrepStep {
                operation: Operation::Grow,
                threads,
            });
        }
    }
    if !target.security_is_prepped() {
        let threads = weaken_threads_to_min(target, oracle);
        if threads > 0 {
            return Some(PrepStep {
                operation: Operation::Weaken,
                threads,
            });
        }
    }
    None
}

/// Sizes a full batch against a prepped target. Grow is sized on a copy of
/// the target that has already absorbed the hack and its weaken, which is
/// the state it will land on.
pub fn plan_exploit(target: &Target, oracle: &dyn FormulaOracle, steal_fraction: f64) -> Threads {
    let hack = hack_threads_for_steal(target, oracle, steal_fraction);
    let weaken_for_hack = compensating_weaken_threads(oracle, hack, Operation::Hack);

    let mut projected = target.clone();
    projected.apply_hack(oracle, hack);
    projected.apply_weaken(oracle, weaken_for_hack);

    let grow = grow_threads_to_max(&projected, oracle);
    let weaken_for_grow = compensating_weaken_threads(oracle, grow, Operation::Grow);

    Threads {
        hack,
        grow,
        weaken_for_hack,
        weaken_for_grow,
    }
}

fn covering_weaken_threads(security: f64, per_thread: f64, context: &'static str) -> u64 {
    if per_thread <= 0.0 {
        debug!(context, "weaken effect is zero, planning no weaken threads");
        return 0;
    }
    let mut threads = ceil_threads(security / per_thread, context);
    if threads > 0 && (threads as f64) * per_thread < security {
        threads += 1;
    }
    threads
}

fn floor_threads(raw: f64, context: &'static str) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        if raw != 0.0 {
            debug!(context, raw, "degenerate thread count clamped to zero");
        }
        return 0;
    }
    (raw + FLOOR_SLACK).floor() as u64
}

fn ceil_threads(raw: f64, context: &'static str) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        if raw != 0.0 {
            debug!(context, raw, "degenerate thread count clamped to zero");
        }
        return 0;
    }
    raw.ceil() as u64
}
