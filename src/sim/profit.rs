use crate::batcher::formulas::{FormulaOracle, PreciseFormulas};
use crate::batcher::network::PlayerStats;
use crate::batcher::target::Target;
use crate::sim::hosts::SimServer;

/// Money per second of weaken time at minimum security, discounted by the
/// chance a hack lands. Zero for anything we cannot or should not hack.
pub fn profit_weight(server: &SimServer, player: &PlayerStats) -> f64 {
    if !server.has_root_access
        || server.money_max <= 0.0
        || server.required_hacking_skill > player.hacking_skill
    {
        return 0.0;
    }
    let mut snapshot = server.snapshot();
    snapshot.security_level = snapshot.min_security;
    snapshot.money_available = snapshot.money_max;
    let prepped = Target::new(snapshot, *player);

    let oracle = PreciseFormulas;
    let weaken_secs = oracle.weaken_time(&prepped).as_secs_f64();
    if weaken_secs <= 0.0 {
        return 0.0;
    }
    server.money_max / weaken_secs * oracle.hack_chance(&prepped)
}

pub fn most_profitable<'a>(servers: &'a [SimServer], player: &PlayerStats) -> Option<&'a SimServer> {
    servers
        .iter()
        .map(|server| (server, profit_weight(server, player)))
        .filter(|(_, weight)| *weight > 0.0)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(server, _)| server)
}
