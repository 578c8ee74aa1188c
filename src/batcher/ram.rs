use crate::batcher::batch::{Operation, Placement, Slot};
use crate::batcher::network::HostDescriptor;
use crate::batcher::threads::Threads;
use serde::{Deserialize, Serialize};

const FIT_SLACK: f64 = 1e-9;

/// Per-thread RAM cost (GB) of each worker script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptCosts {
    pub hack_ram: f64,
    pub grow_ram: f64,
    pub weaken_ram: f64,
}

impl Default for ScriptCosts {
    fn default() -> Self {
        Self {
            hack_ram: 1.70,
            grow_ram: 1.75,
            weaken_ram: 1.75,
        }
    }
}

impl ScriptCosts {
    pub fn cost(&self, operation: Operation) -> f64 {
        match operation {
            Operation::Hack => self.hack_ram,
            Operation::Grow => self.grow_ram,
            Operation::Weaken => self.weaken_ram,
        }
    }

    pub fn cheapest(&self) -> f64 {
        self.hack_ram.min(self.grow_ram).min(self.weaken_ram)
    }
}

/// Check-then-act view of the shared RAM pool. Nothing is reserved; two
/// controllers reading the same hosts can both decide a batch fits.
#[derive(Debug, Clone)]
pub struct RamBudget {
    costs: ScriptCosts,
    home: String,
    home_reserve: f64,
}

impl RamBudget {
    pub fn new(costs: ScriptCosts, home: impl Into<String>, home_reserve: f64) -> Self {
        Self {
            costs,
            home: home.into(),
            home_reserve: home_reserve.max(0.0),
        }
    }

    pub fn costs(&self) -> &ScriptCosts {
        &self.costs
    }

    /// Free RAM on `host` rounded down to whole weaken threads.
    pub fn usable_ram(&self, host: &HostDescriptor) -> f64 {
        if !host.has_root_access || host.max_ram <= 0.0 || self.costs.weaken_ram <= 0.0 {
            return 0.0;
        }
        let mut free = host.free_ram();
        if host.hostname == self.home {
            free = (free - self.home_reserve).max(0.0);
        }
        let whole = (free / self.costs.weaken_ram + FIT_SLACK).floor();
        whole * self.costs.weaken_ram
    }

    pub fn available_ram(&self, hosts: &[HostDescriptor]) -> f64 {
        hosts.iter().map(|host| self.usable_ram(host)).sum()
    }

    pub fn batch_cost(&self, threads: &Threads) -> f64 {
        Slot::ALL
            .iter()
            .map(|&slot| threads.get(slot) as f64 * self.costs.cost(slot.operation()))
            .sum()
    }

    pub fn fits(&self, threads: &Threads, hosts: &[HostDescriptor]) -> bool {
        self.batch_cost(threads) <= self.available_ram(hosts) + FIT_SLACK
    }

    /// Scales every slot by `available / cost`. Weaken rounds up and
    /// hack/grow round down; any overshoot left by the weaken ceilings is
    /// trimmed from hack, then grow, and only then from weaken.
    ///
    /// `None` when not even one thread of the cheapest script fits.
    pub fn shrink_to_fit(&self, threads: &Threads, hosts: &[HostDescriptor]) -> Option<Threads> {
        let available = self.available_ram(hosts);
        if available + FIT_SLACK < self.costs.cheapest() || threads.is_empty() {
            return None;
        }
        let cost = self.batch_cost(threads);
        if cost <= available + FIT_SLACK {
            return Some(*threads);
        }

        let ratio = available / cost;
        let scale_down = |count: u64| ((count as f64 * ratio + FIT_SLACK).floor() as u64).min(count);
        let scale_up = |count: u64| ((count as f64 * ratio).ceil() as u64).min(count);
        let mut scaled = Threads {
            hack: scale_down(threads.hack),
            grow: scale_down(threads.grow),
            weaken_for_hack: scale_up(threads.weaken_for_hack),
            weaken_for_grow: scale_up(threads.weaken_for_grow),
        };

        const TRIM_ORDER: [Slot; 4] = [Slot::Hack, Slot::Grow, Slot::WeakenForGrow, Slot::WeakenForHack];
        while self.batch_cost(&scaled) > available + FIT_SLACK {
            match TRIM_ORDER.iter().find(|&&slot| scaled.get(slot) > 0) {
                Some(&slot) => *scaled.get_mut(slot) -= 1,
                None => break,
            }
        }

        if scaled.is_empty() {
            None
        } else {
            Some(scaled)
        }
    }

    /// Splits each slot's threads across hosts, first fit in host order.
    /// `None` when fragmentation leaves any thread without a host; nothing
    /// should be dispatched in that case.
    pub fn place(&self, threads: &Threads, hosts: &[HostDescriptor]) -> Option<Vec<Placement>> {
        let mut ledger: Vec<(&str, f64)> = hosts
            .iter()
            .map(|host| (host.hostname.as_str(), self.usable_ram(host)))
            .filter(|(_, free)| *free > 0.0)
            .collect();

        let mut placements = Vec::new();
        for slot in Slot::ALL {
            let mut remaining = threads.get(slot);
            let cost = self.costs.cost(slot.operation());
            if remaining == 0 {
                continue;
            }
            if cost <= 0.0 {
                return None;
            }
            for (host, free) in ledger.iter_mut() {
                if remaining == 0 {
                    break;
                }
                let capacity = (*free / cost + FIT_SLACK).floor() as u64;
                let share = capacity.min(remaining);
                if share == 0 {
                    continue;
                }
                *free = (*free - share as f64 * cost).max(0.0);
                remaining -= share;
                placements.push(Placement {
                    slot,
                    host: (*host).to_string(),
                    threads: share,
                });
            }
            if remaining > 0 {
                return None;
            }
        }
        Some(placements)
    }
}
