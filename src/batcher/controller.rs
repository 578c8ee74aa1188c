use crate::batcher::batch::{Batch, Operation, Placement, Slot};
use crate::batcher::delays::{Delays, plan_delays};
use crate::batcher::formulas::{FormulaOracle, OracleMode};
use crate::batcher::network::{HostDescriptor, Network};
use crate::batcher::ram::RamBudget;
use crate::batcher::target::Target;
use crate::batcher::threads::{Threads, plan_exploit, plan_prep};
use crate::config::BatcherSettings;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const MAX_MESSAGES: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Preparing,
    Exploiting,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Preparing => "preparing",
            Mode::Exploiting => "exploiting",
        }
    }
}

/// Why a cycle dispatched nothing. The loop logs it and tries again later.
#[derive(Debug, Error, PartialEq)]
pub enum CycleSkip {
    #[error("no profitable target")]
    NoTarget,
    #[error("no usable hosts")]
    NoHosts,
    #[error("need {needed:.2} GB but only {available:.2} GB is free")]
    InsufficientCapacity { needed: f64, available: f64 },
    #[error("free RAM is too fragmented to place {threads} threads")]
    Unplaceable { threads: u64 },
    #[error("planned work does nothing")]
    EmptyBatch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub batches: u64,
    pub prep_operations: u64,
    pub skipped_cycles: u64,
    pub target_switches: u64,
    pub resyncs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetView {
    pub hostname: String,
    pub money_available: f64,
    pub money_max: f64,
    pub security_level: f64,
    pub min_security: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostView {
    pub hostname: String,
    pub max_ram: f64,
    pub used_ram: f64,
    pub usable_ram: f64,
    pub rooted: bool,
}

/// What the dashboard sees after every step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub mode: Mode,
    pub oracle: Option<OracleMode>,
    pub target: Option<TargetView>,
    pub stats: ControllerStats,
    pub last_batch: Option<Batch>,
    pub available_ram: f64,
    pub hosts: Vec<HostView>,
    pub messages: Vec<String>,
}

/// Owns one target and keeps it prepped and exploited.
pub struct Controller<N: Network> {
    network: N,
    oracle: Box<dyn FormulaOracle>,
    budget: RamBudget,
    settings: BatcherSettings,
    target: Option<Target>,
    mode: Mode,
    prep_end: Option<Instant>,
    last_landing: Option<Instant>,
    batches_since_resync: u64,
    next_batch_id: u64,
    last_batch: Option<Batch>,
    hosts: Vec<HostDescriptor>,
    stats: ControllerStats,
    messages: VecDeque<String>,
}

impl<N: Network> Controller<N> {
    pub fn new(
        network: N,
        oracle: Box<dyn FormulaOracle>,
        budget: RamBudget,
        settings: BatcherSettings,
    ) -> Self {
        Self {
            network,
            oracle,
            budget,
            settings,
            target: None,
            mode: Mode::Preparing,
            prep_end: None,
            last_landing: None,
            batches_since_resync: 0,
            next_batch_id: 0,
            last_batch: None,
            hosts: Vec::new(),
            stats: ControllerStats::default(),
            messages: VecDeque::with_capacity(MAX_MESSAGES),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Runs forever; the process owning the task is the only way out.
    pub async fn run(mut self, reports: watch::Sender<Report>) {
        info!(
            oracle = self.oracle.mode().label(),
            spacer_ms = self.settings.spacer_ms,
            steal = self.settings.steal_fraction,
            "batch controller started"
        );
        loop {
            let pause = self.step();
            reports.send_replace(self.report());
            tokio::time::sleep(pause).await;
        }
    }

    /// One control-loop iteration. Returns how long to sleep before the next.
    pub fn step(&mut self) -> Duration {
        let now = Instant::now();
        self.hosts = self.discover_usable_hosts();

        if let Err(skip) = self.ensure_target() {
            self.record_skip(&skip);
            return self.settings.idle_interval();
        }

        let outcome = match self.mode {
            Mode::Preparing => self.prepare(now),
            Mode::Exploiting => self.exploit(now),
        };
        match outcome {
            Ok(pause) => pause,
            Err(skip) => {
                self.record_skip(&skip);
                match (&skip, self.mode) {
                    (CycleSkip::InsufficientCapacity { .. }, Mode::Exploiting)
                    | (CycleSkip::Unplaceable { .. }, Mode::Exploiting) => self.settings.spacer() * 4,
                    _ => self.settings.idle_interval(),
                }
            }
        }
    }

    pub fn report(&self) -> Report {
        Report {
            mode: self.mode,
            oracle: Some(self.oracle.mode()),
            target: self.target.as_ref().map(|target| TargetView {
                hostname: target.hostname().to_string(),
                money_available: target.money_available(),
                money_max: target.money_max(),
                security_level: target.security_level(),
                min_security: target.min_security(),
            }),
            stats: self.stats,
            last_batch: self.last_batch.clone(),
            available_ram: self.budget.available_ram(&self.hosts),
            hosts: self
                .hosts
                .iter()
                .map(|host| HostView {
                    hostname: host.hostname.clone(),
                    max_ram: host.max_ram,
                    used_ram: host.used_ram,
                    usable_ram: self.budget.usable_ram(host),
                    rooted: host.has_root_access,
                })
                .collect(),
            messages: self.messages.iter().cloned().collect(),
        }
    }

    fn discover_usable_hosts(&mut self) -> Vec<HostDescriptor> {
        let mut hosts = self.network.discover_hosts();
        for host in hosts.iter_mut() {
            if host.has_root_access {
                continue;
            }
            if self.network.ensure_root_access(&host.hostname) {
                host.has_root_access = true;
                info!(host = %host.hostname, ram = host.max_ram, "gained root access");
                self.push_message(format!("Rooted {} ({} GB)", host.hostname, host.max_ram));
            }
        }
        hosts
    }

    fn ensure_target(&mut self) -> Result<(), CycleSkip> {
        let best = self
            .network
            .most_profitable_target()
            .ok_or(CycleSkip::NoTarget)?;
        if self.target.as_ref().is_some_and(|current| current.hostname() == best) {
            return Ok(());
        }

        let fresh = Target::from_network(&self.network, &best).ok_or(CycleSkip::NoTarget)?;
        let message = match self.target.as_ref() {
            Some(previous) => {
                self.stats.target_switches += 1;
                info!(from = previous.hostname(), to = %best, "switching target");
                format!("Target switched {} -> {best}", previous.hostname())
            }
            None => {
                info!(target = %best, "selected target");
                format!("Targeting {best}")
            }
        };
        self.push_message(message);
        self.target = Some(fresh);
        self.mode = Mode::Preparing;
        self.prep_end = None;
        self.last_landing = None;
        self.batches_since_resync = 0;
        Ok(())
    }

    fn prepare(&mut self, now: Instant) -> Result<Duration, CycleSkip> {
        if let Some(end) = self.prep_end {
            if now < end {
                return Ok(end - now);
            }
        }
        self.prep_end = None;

        let Some(target) = self.target.as_mut() else {
            return Err(CycleSkip::NoTarget);
        };
        // Nothing of ours is in flight any more, so ground truth is exact.
        target.refresh(&self.network);
        if target.is_prepped() {
            let hostname = target.hostname().to_string();
            self.mode = Mode::Exploiting;
            info!(target = %hostname, "target prepped, exploiting");
            self.push_message(format!("{hostname} prepped"));
            return Ok(Duration::ZERO);
        }

        let oracle = self.oracle.as_ref();
        let step = plan_prep(target, oracle).ok_or(CycleSkip::EmptyBatch)?;
        let planned = Threads::single(step.operation, step.threads);
        let threads = fit_threads(&self.budget, &planned, &self.hosts)?;
        let placements = self
            .budget
            .place(&threads, &self.hosts)
            .ok_or(CycleSkip::Unplaceable {
                threads: threads.total(),
            })?;

        let duration = match step.operation {
            Operation::Hack => oracle.hack_time(target),
            Operation::Grow => oracle.grow_time(target),
            Operation::Weaken => oracle.weaken_time(target),
        };
        dispatch(&self.network, target.hostname(), &placements, |_| Duration::ZERO);
        let dispatched = threads.total();
        target.apply(oracle, step.operation, dispatched);

        let done = now + duration + self.settings.spacer();
        let end = self.prep_end.map_or(done, |end| end.max(done));
        self.prep_end = Some(end);
        self.stats.prep_operations += 1;

        let hostname = target.hostname().to_string();
        debug!(
            target = %hostname,
            operation = %step.operation,
            threads = dispatched,
            planned = step.threads,
            secs = duration.as_secs_f64(),
            "dispatched prep operation"
        );
        self.push_message(format!(
            "Prep {} x{dispatched} on {hostname} ({:.1}s)",
            step.operation,
            duration.as_secs_f64()
        ));
        Ok(end - now)
    }

    fn exploit(&mut self, now: Instant) -> Result<Duration, CycleSkip> {
        let resync_due = self.settings.resync_every_batches > 0
            && self.batches_since_resync >= self.settings.resync_every_batches;
        let Some(target) = self.target.as_mut() else {
            return Err(CycleSkip::NoTarget);
        };
        if resync_due || !target.is_prepped() {
            let reason = if resync_due { "resync" } else { "drifted" };
            let hostname = target.hostname().to_string();
            self.mode = Mode::Preparing;
            self.prep_end = self.last_landing;
            self.batches_since_resync = 0;
            if resync_due {
                self.stats.resyncs += 1;
            }
            info!(target = %hostname, reason, "draining in-flight batches before re-prep");
            return Ok(Duration::ZERO);
        }

        let oracle = self.oracle.as_ref();
        let steal = self.settings.steal_fraction;
        let spacer = self.settings.spacer();
        let planned = plan_exploit(target, oracle, steal);
        if planned.hack == 0 {
            return Err(CycleSkip::EmptyBatch);
        }
        let delays = plan_delays(target, oracle, spacer);
        let threads = fit_threads(&self.budget, &planned, &self.hosts)?;
        if threads.hack == 0 {
            return Err(CycleSkip::EmptyBatch);
        }
        let placements = self
            .budget
            .place(&threads, &self.hosts)
            .ok_or(CycleSkip::Unplaceable {
                threads: threads.total(),
            })?;

        dispatch(&self.network, target.hostname(), &placements, |slot| delays.get(slot));
        target.apply_batch(oracle, &threads);

        let batch = Batch {
            id: self.next_batch_id,
            target: target.hostname().to_string(),
            threads,
            delays,
        };
        self.next_batch_id += 1;
        self.last_landing = Some(now + delays.completion());
        self.batches_since_resync += 1;
        self.stats.batches += 1;

        if threads != planned {
            debug!(batch = batch.id, ?planned, ?threads, "batch shrunk to fit RAM");
        }
        debug!(
            batch = batch.id,
            target = %batch.target,
            hack = threads.hack,
            grow = threads.grow,
            weaken_for_hack = threads.weaken_for_hack,
            weaken_for_grow = threads.weaken_for_grow,
            "dispatched batch"
        );
        let pause = exploit_interval(&delays, spacer);
        self.last_batch = Some(batch);
        Ok(pause)
    }

    fn record_skip(&mut self, skip: &CycleSkip) {
        self.stats.skipped_cycles += 1;
        warn!(mode = self.mode.label(), "cycle skipped: {skip}");
        if !matches!(skip, CycleSkip::InsufficientCapacity { .. }) {
            self.push_message(format!("Skipped: {skip}"));
        }
    }

    fn push_message(&mut self, message: String) {
        if self.messages.len() >= MAX_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }
}

/// Gap between consecutive batches: the landing window plus one spacer so
/// the next batch's first landing trails this batch's last.
pub fn exploit_interval(delays: &Delays, spacer: Duration) -> Duration {
    delays.landing_span() + spacer
}

fn fit_threads(
    budget: &RamBudget,
    planned: &Threads,
    hosts: &[HostDescriptor],
) -> Result<Threads, CycleSkip> {
    if hosts.iter().all(|host| budget.usable_ram(host) <= 0.0) {
        return Err(CycleSkip::NoHosts);
    }
    if budget.fits(planned, hosts) {
        return Ok(*planned);
    }
    budget
        .shrink_to_fit(planned, hosts)
        .ok_or_else(|| CycleSkip::InsufficientCapacity {
            needed: budget.batch_cost(planned),
            available: budget.available_ram(hosts),
        })
}

fn dispatch<N: Network + ?Sized>(
    network: &N,
    target: &str,
    placements: &[Placement],
    delay_for: impl Fn(Slot) -> Duration,
) {
    for placement in placements {
        network.run_worker(
            placement.slot.operation(),
            &placement.host,
            placement.threads,
            target,
            delay_for(placement.slot),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::formulas::PreciseFormulas;
    use crate::batcher::network::{PlayerStats, ServerSnapshot};
    use crate::batcher::ram::ScriptCosts;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Launch {
        operation: Operation,
        host: String,
        threads: u64,
        target: String,
        delay: Duration,
    }

    struct FakeNetwork {
        hosts: RefCell<Vec<HostDescriptor>>,
        servers: RefCell<Vec<ServerSnapshot>>,
        best: RefCell<Option<String>>,
        launches: RefCell<Vec<Launch>>,
    }

    impl FakeNetwork {
        fn new(ram: f64, servers: Vec<ServerSnapshot>) -> Self {
            let best = servers.first().map(|server| server.hostname.clone());
            Self {
                hosts: RefCell::new(vec![
                    HostDescriptor {
                        hostname: "home".to_string(),
                        max_ram: ram,
                        used_ram: 0.0,
                        has_root_access: true,
                    },
                    HostDescriptor {
                        hostname: "CSEC".to_string(),
                        max_ram: 0.0,
                        used_ram: 0.0,
                        has_root_access: false,
                    },
                ]),
                servers: RefCell::new(servers),
                best: RefCell::new(best),
                launches: RefCell::new(Vec::new()),
            }
        }

        fn set_server(&self, snapshot: ServerSnapshot) {
            let mut servers = self.servers.borrow_mut();
            servers.retain(|server| server.hostname != snapshot.hostname);
            servers.push(snapshot);
        }

        fn take_launches(&self) -> Vec<Launch> {
            std::mem::take(&mut *self.launches.borrow_mut())
        }
    }

    impl Network for FakeNetwork {
        fn discover_hosts(&self) -> Vec<HostDescriptor> {
            self.hosts.borrow().clone()
        }

        fn ensure_root_access(&self, _host: &str) -> bool {
            false
        }

        fn run_worker(
            &self,
            operation: Operation,
            host: &str,
            threads: u64,
            target: &str,
            delay: Duration,
        ) {
            self.launches.borrow_mut().push(Launch {
                operation,
                host: host.to_string(),
                threads,
                target: target.to_string(),
                delay,
            });
        }

        fn snapshot(&self, host: &str) -> Option<ServerSnapshot> {
            self.servers
                .borrow()
                .iter()
                .find(|server| server.hostname == host)
                .cloned()
        }

        fn player(&self) -> PlayerStats {
            PlayerStats::default()
        }

        fn most_profitable_target(&self) -> Option<String> {
            self.best.borrow().clone()
        }
    }

    fn server(name: &str, money: f64, security: f64) -> ServerSnapshot {
        ServerSnapshot {
            hostname: name.to_string(),
            money_available: money,
            money_max: 1_000_000.0,
            security_level: security,
            min_security: 10.0,
            required_hacking_skill: 20.0,
            server_growth: 40.0,
        }
    }

    fn settings() -> BatcherSettings {
        BatcherSettings {
            spacer_ms: 20,
            steal_fraction: 0.1,
            resync_every_batches: 0,
            ..BatcherSettings::default()
        }
    }

    fn controller(network: FakeNetwork, settings: BatcherSettings) -> Controller<FakeNetwork> {
        Controller::new(
            network,
            Box::new(PreciseFormulas),
            RamBudget::new(ScriptCosts::default(), "home", 0.0),
            settings,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn prep_dispatches_one_grow_and_waits_for_it() {
        let network = FakeNetwork::new(1_000_000.0, vec![server("phantasy", 250_000.0, 35.0)]);
        let mut controller = controller(network, settings());

        let pause = controller.step();
        assert_eq!(controller.mode(), Mode::Preparing);
        let launches = controller.network().take_launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].operation, Operation::Grow);
        assert_eq!(launches[0].delay, Duration::ZERO);
        assert_eq!(launches[0].target, "phantasy");
        assert!(controller.target().is_some_and(|t| t.money_is_prepped()));
        assert!(pause > Duration::from_millis(20));

        // Still inside the watermark: nothing new goes out.
        tokio::time::advance(pause / 2).await;
        controller.step();
        assert!(controller.network().take_launches().is_empty());
        assert_eq!(controller.stats().prep_operations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn prepped_target_switches_to_full_batches() {
        let network = FakeNetwork::new(1_000_000.0, vec![server("phantasy", 1_000_000.0, 10.0)]);
        let mut controller = controller(network, settings());

        assert_eq!(controller.step(), Duration::ZERO);
        assert_eq!(controller.mode(), Mode::Exploiting);

        let pause = controller.step();
        assert_eq!(pause, Duration::from_millis(80));
        let launches = controller.network().take_launches();
        let operations: Vec<Operation> = launches.iter().map(|l| l.operation).collect();
        assert_eq!(
            operations,
            vec![Operation::Hack, Operation::Weaken, Operation::Grow, Operation::Weaken]
        );
        assert_eq!(launches[1].delay, Duration::ZERO);
        assert_eq!(launches[3].delay, Duration::from_millis(40));
        assert!(launches[0].delay > launches[2].delay);
        assert!(controller.target().is_some_and(|t| t.is_prepped()));
        assert_eq!(controller.stats().batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_ram_skips_the_cycle_without_dispatching() {
        let network = FakeNetwork::new(1.0, vec![server("phantasy", 250_000.0, 35.0)]);
        let mut controller = controller(network, settings());

        let pause = controller.step();
        assert_eq!(pause, controller.settings.idle_interval());
        assert!(controller.network().take_launches().is_empty());
        assert_eq!(controller.stats().skipped_cycles, 1);
        assert_eq!(controller.stats().prep_operations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scarce_ram_shrinks_the_batch() {
        let network = FakeNetwork::new(40.0, vec![server("phantasy", 1_000_000.0, 10.0)]);
        let mut controller = controller(network, settings());
        controller.step();
        controller.step();

        let batch = controller.report().last_batch.unwrap();
        let budget = RamBudget::new(ScriptCosts::default(), "home", 0.0);
        assert!(budget.batch_cost(&batch.threads) <= 40.0);
        let launched: u64 = controller.network().take_launches().iter().map(|l| l.threads).sum();
        assert_eq!(launched, batch.threads.total());
    }

    #[tokio::test(start_paused = true)]
    async fn a_better_target_resets_to_preparing() {
        let network = FakeNetwork::new(1_000_000.0, vec![server("phantasy", 1_000_000.0, 10.0)]);
        let mut controller = controller(network, settings());
        controller.step();
        controller.step();
        assert_eq!(controller.mode(), Mode::Exploiting);

        controller.network().set_server(server("the-hub", 10_000.0, 20.0));
        *controller.network().best.borrow_mut() = Some("the-hub".to_string());
        controller.network().take_launches();
        controller.step();

        assert_eq!(controller.mode(), Mode::Preparing);
        assert_eq!(controller.stats().target_switches, 1);
        assert_eq!(controller.target().map(|t| t.hostname()), Some("the-hub"));
        let launches = controller.network().take_launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].target, "the-hub");
    }

    #[tokio::test(start_paused = true)]
    async fn resync_drains_then_refreshes_from_ground_truth() {
        let network = FakeNetwork::new(1_000_000.0, vec![server("phantasy", 1_000_000.0, 10.0)]);
        let mut controller = controller(
            network,
            BatcherSettings {
                resync_every_batches: 2,
                ..settings()
            },
        );
        controller.step();
        let mut slept = Duration::ZERO;
        for _ in 0..2 {
            let pause = controller.step();
            tokio::time::advance(pause).await;
            slept += pause;
        }
        assert_eq!(controller.stats().batches, 2);

        assert_eq!(controller.step(), Duration::ZERO);
        assert_eq!(controller.mode(), Mode::Preparing);
        assert_eq!(controller.stats().resyncs, 1);

        // Waits for the last batch to land before touching ground truth.
        let wait = controller.step();
        assert!(wait > Duration::ZERO);
        controller.network().take_launches();
        tokio::time::advance(wait).await;

        controller.network().set_server(server("phantasy", 900_000.0, 10.0));
        controller.step();
        assert_eq!(controller.mode(), Mode::Preparing);
        let launches = controller.network().take_launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].operation, Operation::Grow);
        assert!(slept > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn no_target_idles() {
        let network = FakeNetwork::new(1_000_000.0, Vec::new());
        let mut controller = controller(network, settings());
        assert_eq!(controller.step(), controller.settings.idle_interval());
        assert_eq!(controller.report().target, None);
        assert_eq!(controller.stats().skipped_cycles, 1);
    }

    #[test]
    fn exploit_interval_clears_the_landing_window() {
        let delays = crate::batcher::delays::delays_for(
            crate::batcher::delays::Timings {
                hack: Duration::from_millis(1_000),
                grow: Duration::from_millis(3_200),
                weaken: Duration::from_millis(4_000),
            },
            Duration::from_millis(20),
        );
        let interval = exploit_interval(&delays, Duration::from_millis(20));
        assert_eq!(interval, Duration::from_millis(80));
        // The next batch's first landing trails this batch's last one.
        assert!(delays.landing(Slot::Hack) + interval > delays.landing(Slot::WeakenForGrow));
    }

    #[test]
    fn two_spacer_cadence_lands_the_next_hack_on_this_grow() {
        let spacer = Duration::from_millis(20);
        let delays = crate::batcher::delays::delays_for(
            crate::batcher::delays::Timings {
                hack: Duration::from_millis(1_000),
                grow: Duration::from_millis(3_200),
                weaken: Duration::from_millis(4_000),
            },
            spacer,
        );
        let next_hack = spacer * 2 + delays.landing(Slot::Hack);
        assert_eq!(next_hack, delays.landing(Slot::Grow));
        assert!(next_hack < delays.landing(Slot::WeakenForGrow));

        let next_hack = exploit_interval(&delays, spacer) + delays.landing(Slot::Hack);
        for slot in Slot::ALL {
            assert!(next_hack > delays.landing(slot), "{slot:?}");
        }
    }
}
