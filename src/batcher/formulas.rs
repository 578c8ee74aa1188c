use crate::batcher::batch::Operation;
use crate::batcher::target::Target;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const HACK_SECURITY_PER_THREAD: f64 = 0.002;
pub const GROW_SECURITY_PER_THREAD: f64 = 0.004;
pub const WEAKEN_SECURITY_PER_THREAD: f64 = 0.05;
pub const MAX_SECURITY: f64 = 100.0;

const GROW_TIME_FACTOR: f64 = 3.2;
const WEAKEN_TIME_FACTOR: f64 = 4.0;
const BASE_GROWTH_RATE: f64 = 1.03;
const MAX_GROWTH_RATE: f64 = 1.0035;
const HACK_BALANCE_FACTOR: f64 = 240.0;

/// Which formula set the planner trusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleMode {
    Precise,
    Approximate,
}

impl OracleMode {
    pub fn label(self) -> &'static str {
        match self {
            OracleMode::Precise => "precise",
            OracleMode::Approximate => "approximate",
        }
    }
}

pub fn oracle_for(mode: OracleMode) -> Box<dyn FormulaOracle> {
    match mode {
        OracleMode::Precise => Box::new(PreciseFormulas),
        OracleMode::Approximate => Box::new(ApproximateFormulas),
    }
}

/// Effect sizes and durations of the three operations against a target
/// snapshot. Everything here is a pure function of the snapshot.
pub trait FormulaOracle: Send + Sync {
    fn mode(&self) -> OracleMode;

    fn hack_time(&self, target: &Target) -> Duration {
        secs_to_duration(hack_time_secs(target))
    }

    fn grow_time(&self, target: &Target) -> Duration {
        secs_to_duration(hack_time_secs(target) * GROW_TIME_FACTOR)
    }

    fn weaken_time(&self, target: &Target) -> Duration {
        secs_to_duration(hack_time_secs(target) * WEAKEN_TIME_FACTOR)
    }

    fn hack_chance(&self, target: &Target) -> f64 {
        hack_chance(target)
    }

    /// Fraction of available money one hack thread steals.
    fn hack_percent(&self, target: &Target) -> f64 {
        hack_percent(target)
    }

    /// Money on the target after `threads` grow threads land.
    fn grow_amount(&self, target: &Target, threads: u64) -> f64;

    /// Raw (unrounded) grow threads needed to lift money to `goal`.
    fn grow_threads(&self, target: &Target, goal: f64) -> f64;

    fn weaken_effect(&self) -> f64 {
        WEAKEN_SECURITY_PER_THREAD
    }

    fn security_increase(&self, operation: Operation, threads: u64) -> f64 {
        let per_thread = match operation {
            Operation::Hack => HACK_SECURITY_PER_THREAD,
            Operation::Grow => GROW_SECURITY_PER_THREAD,
            Operation::Weaken => 0.0,
        };
        per_thread * threads as f64
    }
}

/// Full game formulas, including the additive per-thread term of grow.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreciseFormulas;

impl FormulaOracle for PreciseFormulas {
    fn mode(&self) -> OracleMode {
        OracleMode::Precise
    }

    fn grow_amount(&self, target: &Target, threads: u64) -> f64 {
        let grown = (target.money_available() + threads as f64) * grow_multiplier(target, threads);
        grown.clamp(0.0, target.money_max())
    }

    fn grow_threads(&self, target: &Target, goal: f64) -> f64 {
        let goal = goal.min(target.money_max());
        if target.money_available() >= goal {
            return 0.0;
        }
        let estimate = closed_form_grow_threads(target, goal);
        if !estimate.is_finite() {
            return estimate;
        }

        let mut high = estimate.ceil().max(1.0) as u64 + 1;
        if self.grow_amount(target, high) < goal {
            return high as f64;
        }
        let mut low = 0u64;
        while low + 1 < high {
            let mid = low + (high - low) / 2;
            if self.grow_amount(target, mid) >= goal {
                high = mid;
            } else {
                low = mid;
            }
        }
        high as f64
    }
}

/// Closed-form fallback used before the formula unlock: ignores the additive
/// grow term and sizes threads with a logarithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateFormulas;

impl FormulaOracle for ApproximateFormulas {
    fn mode(&self) -> OracleMode {
        OracleMode::Approximate
    }

    fn grow_amount(&self, target: &Target, threads: u64) -> f64 {
        if threads == 0 {
            return target.money_available();
        }
        let grown = target.money_available().max(1.0) * grow_multiplier(target, threads);
        grown.clamp(0.0, target.money_max())
    }

    fn grow_threads(&self, target: &Target, goal: f64) -> f64 {
        let goal = goal.min(target.money_max());
        if target.money_available() >= goal {
            return 0.0;
        }
        closed_form_grow_threads(target, goal)
    }
}

fn hack_time_secs(target: &Target) -> f64 {
    let player = target.player();
    let difficulty_mult = target.required_hacking_skill() * target.security_level();
    let skill_factor = (2.5 * difficulty_mult + 500.0) / (player.hacking_skill + 50.0).max(1.0);
    5.0 * skill_factor / player.speed_mult.max(0.01)
}

fn hack_chance(target: &Target) -> f64 {
    let player = target.player();
    let skill_mult = 1.75 * player.hacking_skill;
    if skill_mult <= 0.0 {
        return 0.0;
    }
    let skill_chance = (skill_mult - target.required_hacking_skill()) / skill_mult;
    let difficulty_mult = (MAX_SECURITY - target.security_level()) / MAX_SECURITY;
    (skill_chance * difficulty_mult * player.chance_mult).clamp(0.0, 1.0)
}

fn hack_percent(target: &Target) -> f64 {
    let player = target.player();
    if player.hacking_skill <= 0.0 {
        return 0.0;
    }
    let difficulty_mult = (MAX_SECURITY - target.security_level()) / MAX_SECURITY;
    let skill_mult =
        (player.hacking_skill - (target.required_hacking_skill() - 1.0)) / player.hacking_skill;
    (difficulty_mult * skill_mult * player.money_mult / HACK_BALANCE_FACTOR).clamp(0.0, 1.0)
}

fn adjusted_growth_rate(security: f64) -> f64 {
    if security <= 0.0 {
        return MAX_GROWTH_RATE;
    }
    (1.0 + (BASE_GROWTH_RATE - 1.0) / security).min(MAX_GROWTH_RATE)
}

/// Money multiplier contributed by a single grow thread.
pub fn per_thread_growth(target: &Target) -> f64 {
    let exponent = target.server_growth() / 100.0 * target.player().grow_mult;
    adjusted_growth_rate(target.security_level()).powf(exponent)
}

fn grow_multiplier(target: &Target, threads: u64) -> f64 {
    per_thread_growth(target).powf(threads as f64)
}

fn closed_form_grow_threads(target: &Target, goal: f64) -> f64 {
    let multiplier = goal / target.money_available().max(1.0);
    let rate = per_thread_growth(target);
    if multiplier <= 1.0 {
        return 0.0;
    }
    if rate <= 1.0 {
        return f64::INFINITY;
    }
    multiplier.ln() / rate.ln()
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
