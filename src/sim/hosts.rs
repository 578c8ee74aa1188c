use crate::batcher::network::{HostDescriptor, ServerSnapshot};
use crate::config::NetworkSettings;
use rand::Rng;

pub const HOME: &str = "home";

const SERVER_NAMES: [&str; 24] = [
    "n00dles",
    "foodnstuff",
    "sigma-cosmetics",
    "joesguns",
    "hong-fang-tea",
    "harakiri-sushi",
    "iron-gym",
    "nectar-net",
    "zer0",
    "max-hardware",
    "CSEC",
    "neo-net",
    "silver-helix",
    "phantasy",
    "omega-net",
    "the-hub",
    "netlink",
    "johnson-ortho",
    "crush-fitness",
    "computek",
    "rothman-uni",
    "catalyst",
    "summit-uni",
    "syscore",
];

/// Ground-truth state of one machine on the simulated network.
#[derive(Debug, Clone, PartialEq)]
pub struct SimServer {
    pub hostname: String,
    pub max_ram: f64,
    pub used_ram: f64,
    pub has_root_access: bool,
    pub ports_required: u8,
    pub money_available: f64,
    pub money_max: f64,
    pub security_level: f64,
    pub min_security: f64,
    pub required_hacking_skill: f64,
    pub server_growth: f64,
    pub links: Vec<usize>,
}

impl SimServer {
    pub fn home(max_ram: f64) -> Self {
        Self {
            hostname: HOME.to_string(),
            max_ram,
            used_ram: 0.0,
            has_root_access: true,
            ports_required: 0,
            money_available: 0.0,
            money_max: 0.0,
            security_level: 1.0,
            min_security: 1.0,
            required_hacking_skill: 1.0,
            server_growth: 1.0,
            links: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            hostname: self.hostname.clone(),
            money_available: self.money_available,
            money_max: self.money_max,
            security_level: self.security_level,
            min_security: self.min_security,
            required_hacking_skill: self.required_hacking_skill,
            server_growth: self.server_growth,
        }
    }

    pub fn descriptor(&self) -> HostDescriptor {
        HostDescriptor {
            hostname: self.hostname.clone(),
            max_ram: self.max_ram,
            used_ram: self.used_ram,
            has_root_access: self.has_root_access,
        }
    }

    pub fn free_ram(&self) -> f64 {
        (self.max_ram - self.used_ram).max(0.0)
    }
}

fn server_name(index: usize) -> String {
    let base = SERVER_NAMES[index % SERVER_NAMES.len()];
    match index / SERVER_NAMES.len() {
        0 => base.to_string(),
        generation => format!("{base}-{generation}"),
    }
}

/// Servers get harder and richer the later they are generated.
pub fn generate_server(index: usize, count: usize, rng: &mut impl Rng) -> SimServer {
    let tier = index as f64 / count.max(1) as f64;

    let required_hacking_skill = (rng.gen_range(1..=10) as f64 + tier * 400.0).round();
    let ports_required = ((required_hacking_skill / 80.0) as u8).min(5);
    let min_security = (rng.gen_range(1.0..8.0) + tier * 25.0).round().max(1.0);
    let security_level = (min_security * rng.gen_range(1.5..3.0)).min(100.0);

    let money_max = if rng.gen_bool(0.1) {
        0.0
    } else {
        (rng.gen_range(20_000.0..120_000.0) * (1.0 + tier * 60.0)).round()
    };
    let money_available = (money_max * rng.gen_range(0.05..0.4)).round();

    let max_ram = if rng.gen_bool(0.3) {
        0.0
    } else {
        2f64.powi(rng.gen_range(2..=7))
    };

    SimServer {
        hostname: server_name(index),
        max_ram,
        used_ram: 0.0,
        has_root_access: false,
        ports_required,
        money_available,
        money_max,
        security_level,
        min_security,
        required_hacking_skill,
        server_growth: rng.gen_range(10..=80) as f64,
        links: Vec::new(),
    }
}

/// `home` at index 0 and `settings.servers` machines hung off it as a random tree.
pub fn generate_network(settings: &NetworkSettings, rng: &mut impl Rng) -> Vec<SimServer> {
    let mut servers = Vec::with_capacity(settings.servers + 1);
    servers.push(SimServer::home(settings.home_ram));
    for index in 0..settings.servers {
        let mut server = generate_server(index, settings.servers, rng);
        let child = servers.len();
        let parent = rng.gen_range(0..child);
        server.links.push(parent);
        servers[parent].links.push(child);
        servers.push(server);
    }
    servers
}
