use crate::batcher::batch::Operation;
use crate::batcher::formulas::{FormulaOracle, PreciseFormulas};
use crate::batcher::network::{HostDescriptor, Network, PlayerStats, ServerSnapshot};
use crate::batcher::ram::ScriptCosts;
use crate::batcher::target::Target;
use crate::config::NetworkSettings;
use crate::sim::hosts::{SimServer, generate_network};
use crate::sim::profit;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Running totals of what the simulated workers actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimLedger {
    pub workers_launched: u64,
    pub workers_rejected: u64,
    pub workers_finished: u64,
    pub hacks_succeeded: u64,
    pub hacks_failed: u64,
    pub money_stolen: f64,
}

#[derive(Debug, Clone)]
struct PendingWorker {
    operation: Operation,
    host: usize,
    target: usize,
    threads: u64,
    ram: f64,
    lands_at: Instant,
}

#[derive(Debug)]
struct World {
    servers: Vec<SimServer>,
    player: PlayerStats,
    costs: ScriptCosts,
    pending: VecDeque<PendingWorker>,
    ledger: SimLedger,
    rng: StdRng,
}

impl World {
    fn index_of(&self, hostname: &str) -> Option<usize> {
        self.servers.iter().position(|server| server.hostname == hostname)
    }

    /// Lands every worker whose finish time has passed, earliest first.
    fn settle(&mut self, now: Instant) {
        while self.pending.front().is_some_and(|worker| worker.lands_at <= now) {
            if let Some(worker) = self.pending.pop_front() {
                self.land(worker);
            }
        }
    }

    fn land(&mut self, worker: PendingWorker) {
        let host = &mut self.servers[worker.host];
        host.used_ram = (host.used_ram - worker.ram).max(0.0);
        self.ledger.workers_finished += 1;

        let oracle = PreciseFormulas;
        let server = &self.servers[worker.target];
        let mut target = Target::new(server.snapshot(), self.player);
        match worker.operation {
            Operation::Hack => {
                let chance = oracle.hack_chance(&target).clamp(0.0, 1.0);
                if !self.rng.gen_bool(chance) {
                    self.ledger.hacks_failed += 1;
                    return;
                }
                let before = target.money_available();
                target.apply_hack(&oracle, worker.threads);
                self.ledger.hacks_succeeded += 1;
                self.ledger.money_stolen += before - target.money_available();
            }
            operation => target.apply(&oracle, operation, worker.threads),
        }

        let server = &mut self.servers[worker.target];
        server.money_available = target.money_available();
        server.security_level = target.security_level();
    }

    fn enqueue(&mut self, worker: PendingWorker) {
        let at = self
            .pending
            .iter()
            .position(|queued| queued.lands_at > worker.lands_at)
            .unwrap_or(self.pending.len());
        self.pending.insert(at, worker);
    }
}

/// An in-process stand-in for the game: a generated host graph whose workers
/// run on the tokio clock. Cloning shares the same world.
#[derive(Debug, Clone)]
pub struct SimNetwork {
    world: Arc<Mutex<World>>,
}

impl SimNetwork {
    pub fn generate(settings: &NetworkSettings, costs: ScriptCosts) -> Self {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let servers = generate_network(settings, &mut rng);
        Self::from_servers(servers, settings.player, costs, rng)
    }

    pub fn from_servers(
        servers: Vec<SimServer>,
        player: PlayerStats,
        costs: ScriptCosts,
        rng: StdRng,
    ) -> Self {
        Self {
            world: Arc::new(Mutex::new(World {
                servers,
                player,
                costs,
                pending: VecDeque::new(),
                ledger: SimLedger::default(),
                rng,
            })),
        }
    }

    pub fn ledger(&self) -> SimLedger {
        self.lock().ledger
    }

    pub fn in_flight(&self) -> usize {
        let mut world = self.lock();
        world.settle(Instant::now());
        world.pending.len()
    }

    pub fn server(&self, hostname: &str) -> Option<SimServer> {
        let mut world = self.lock();
        world.settle(Instant::now());
        let index = world.index_of(hostname)?;
        Some(world.servers[index].clone())
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Network for SimNetwork {
    fn discover_hosts(&self) -> Vec<HostDescriptor> {
        let mut world = self.lock();
        world.settle(Instant::now());

        let mut hosts = Vec::new();
        if world.servers.is_empty() {
            return hosts;
        }
        let mut seen = vec![false; world.servers.len()];
        seen[0] = true;
        let mut queue = VecDeque::from([0usize]);
        while let Some(index) = queue.pop_front() {
            let server = &world.servers[index];
            hosts.push(server.descriptor());
            for &next in &server.links {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        hosts
    }

    fn ensure_root_access(&self, host: &str) -> bool {
        let mut world = self.lock();
        let openers = world.player.port_openers;
        let Some(index) = world.index_of(host) else {
            return false;
        };
        let server = &mut world.servers[index];
        if !server.has_root_access && openers >= server.ports_required {
            server.has_root_access = true;
        }
        server.has_root_access
    }

    fn run_worker(&self, operation: Operation, host: &str, threads: u64, target: &str, delay: Duration) {
        let now = Instant::now();
        let mut world = self.lock();
        world.settle(now);

        let (Some(host_index), Some(target_index)) = (world.index_of(host), world.index_of(target))
        else {
            warn!(%operation, host, target, "worker refers to an unknown server");
            world.ledger.workers_rejected += 1;
            return;
        };
        let ram = world.costs.cost(operation) * threads as f64;
        let runner = &world.servers[host_index];
        if threads == 0 || !runner.has_root_access || runner.free_ram() + 1e-9 < ram {
            warn!(
                %operation,
                host,
                threads,
                free = runner.free_ram(),
                needed = ram,
                "worker could not start"
            );
            world.ledger.workers_rejected += 1;
            return;
        }

        let state = Target::new(world.servers[target_index].snapshot(), world.player);
        let oracle = PreciseFormulas;
        let duration = match operation {
            Operation::Hack => oracle.hack_time(&state),
            Operation::Grow => oracle.grow_time(&state),
            Operation::Weaken => oracle.weaken_time(&state),
        };

        world.servers[host_index].used_ram += ram;
        world.ledger.workers_launched += 1;
        world.enqueue(PendingWorker {
            operation,
            host: host_index,
            target: target_index,
            threads,
            ram,
            lands_at: now + delay + duration,
        });
        debug!(%operation, host, target, threads, "worker started");
    }

    fn snapshot(&self, host: &str) -> Option<ServerSnapshot> {
        let mut world = self.lock();
        world.settle(Instant::now());
        let index = world.index_of(host)?;
        Some(world.servers[index].snapshot())
    }

    fn player(&self) -> PlayerStats {
        self.lock().player
    }

    fn most_profitable_target(&self) -> Option<String> {
        let world = self.lock();
        profit::most_profitable(&world.servers, &world.player).map(|server| server.hostname.clone())
    }
}
