use crate::batcher::batch::Slot;
use crate::batcher::formulas::FormulaOracle;
use crate::batcher::target::Target;
use std::time::Duration;

/// Intrinsic run time of each operation at the current target state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    pub hack: Duration,
    pub grow: Duration,
    pub weaken: Duration,
}

impl Timings {
    pub fn from_oracle(target: &Target, oracle: &dyn FormulaOracle) -> Self {
        Self {
            hack: oracle.hack_time(target),
            grow: oracle.grow_time(target),
            weaken: oracle.weaken_time(target),
        }
    }

    pub fn duration(&self, slot: Slot) -> Duration {
        match slot {
            Slot::Hack => self.hack,
            Slot::Grow => self.grow,
            Slot::WeakenForHack | Slot::WeakenForGrow => self.weaken,
        }
    }
}

/// Start offsets of a batch, relative to the moment it is dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delays {
    pub hack: Duration,
    pub grow: Duration,
    pub weaken_for_hack: Duration,
    pub weaken_for_grow: Duration,
    pub timings: Timings,
}

impl Delays {
    pub fn get(&self, slot: Slot) -> Duration {
        match slot {
            Slot::Hack => self.hack,
            Slot::WeakenForHack => self.weaken_for_hack,
            Slot::Grow => self.grow,
            Slot::WeakenForGrow => self.weaken_for_grow,
        }
    }

    /// When `slot` completes, measured from dispatch.
    pub fn landing(&self, slot: Slot) -> Duration {
        self.get(slot) + self.timings.duration(slot)
    }

    /// Completion of the whole batch.
    pub fn completion(&self) -> Duration {
        Slot::ALL
            .iter()
            .map(|&slot| self.landing(slot))
            .max()
            .unwrap_or_default()
    }

    /// Time between the first and the last landing.
    pub fn landing_span(&self) -> Duration {
        let first = Slot::ALL
            .iter()
            .map(|&slot| self.landing(slot))
            .min()
            .unwrap_or_default();
        self.completion().saturating_sub(first)
    }
}

pub fn plan_delays(target: &Target, oracle: &dyn FormulaOracle, spacer: Duration) -> Delays {
    delays_for(Timings::from_oracle(target, oracle), spacer)
}

/// Anchors the first weaken at offset zero and lands the batch as
///
/// ```text
///  H:     =        weaken - hack - spacer
/// W1: ======       0
///  G:    ====      weaken - grow + spacer
/// W2:   ======     2 * spacer
/// ```
///
/// one spacer apart. The anchor moves later when an operation outlasts
/// weaken, so no offset goes negative.
pub fn delays_for(timings: Timings, spacer: Duration) -> Delays {
    let anchor = timings
        .weaken
        .max(timings.hack + spacer)
        .max(timings.grow.saturating_sub(spacer));

    let hack_lands = anchor - spacer;
    let grow_lands = anchor + spacer;
    let weaken_for_grow_lands = anchor + spacer * 2;

    Delays {
        hack: hack_lands.saturating_sub(timings.hack),
        weaken_for_hack: anchor.saturating_sub(timings.weaken),
        grow: grow_lands.saturating_sub(timings.grow),
        weaken_for_grow: weaken_for_grow_lands.saturating_sub(timings.weaken),
        timings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::formulas::PreciseFormulas;
    use crate::batcher::network::{PlayerStats, ServerSnapshot};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn assert_landing_order(delays: &Delays, spacer: Duration) {
        let landings: Vec<Duration> = Slot::ALL.iter().map(|&slot| delays.landing(slot)).collect();
        for pair in landings.windows(2) {
            assert!(pair[1] >= pair[0] + spacer, "landings {landings:?}");
        }
    }

    #[test]
    fn representative_durations_match_the_offset_table() {
        let timings = Timings {
            hack: ms(1_000),
            grow: ms(3_200),
            weaken: ms(4_000),
        };
        let delays = delays_for(timings, ms(20));
        assert_eq!(delays.weaken_for_hack, ms(0));
        assert_eq!(delays.hack, ms(2_980));
        assert_eq!(delays.grow, ms(820));
        assert_eq!(delays.weaken_for_grow, ms(40));
        assert_landing_order(&delays, ms(20));
        assert_eq!(delays.completion(), ms(4_040));
        assert_eq!(delays.landing_span(), ms(60));
    }

    #[test]
    fn each_landing_is_one_spacer_after_the_previous() {
        let timings = Timings {
            hack: ms(1_000),
            grow: ms(3_200),
            weaken: ms(4_000),
        };
        for spacer in [1, 20, 50, 100, 250] {
            let delays = delays_for(timings, ms(spacer));
            assert_landing_order(&delays, ms(spacer));
            assert_eq!(delays.landing(Slot::Hack), ms(4_000 - spacer));
            assert_eq!(delays.landing(Slot::WeakenForGrow), ms(4_000 + 2 * spacer));
        }
    }

    #[test]
    fn odd_durations_never_produce_negative_offsets() {
        let timings = Timings {
            hack: ms(5_000),
            grow: ms(9_000),
            weaken: ms(4_000),
        };
        let delays = delays_for(timings, ms(20));
        assert_landing_order(&delays, ms(20));
        assert!(Slot::ALL.iter().any(|&slot| delays.get(slot) == Duration::ZERO));
    }

    #[test]
    fn spacer_larger_than_the_hack_gap_moves_the_anchor() {
        let timings = Timings {
            hack: ms(3_990),
            grow: ms(3_995),
            weaken: ms(4_000),
        };
        let delays = delays_for(timings, ms(100));
        assert_landing_order(&delays, ms(100));
        assert_eq!(delays.hack, Duration::ZERO);
    }

    #[test]
    fn oracle_timings_feed_the_plan() {
        let target = Target::new(
            ServerSnapshot {
                hostname: "n00dles".to_string(),
                money_available: 70_000.0,
                money_max: 70_000.0,
                security_level: 1.0,
                min_security: 1.0,
                required_hacking_skill: 1.0,
                server_growth: 3_000.0,
            },
            PlayerStats::default(),
        );
        let delays = plan_delays(&target, &PreciseFormulas, ms(50));
        assert_eq!(delays.weaken_for_hack, Duration::ZERO);
        assert_landing_order(&delays, ms(50));
    }
}
