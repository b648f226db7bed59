use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rand::Rng;

use crate::api::network_dto::{NetworkDto, NodeDto};
use crate::domain::net::probe::NodeProbe;
use crate::domain::node::access::GateTool;
use crate::domain::schedule::entry::OperationKind;
use crate::domain::utils::id::NodeName;
use crate::error::{Error, Result};

/// How much the base operation duration grows per defense unit above the
/// minimum. Durations shrink as a target gets weakened.
const DURATION_PER_DEFENSE: f64 = 0.03;

/// Relative jitter applied to every duration estimate, so run times
/// fluctuate over time the way the real environment's do.
const DURATION_JITTER: f64 = 0.03;

#[derive(Debug, Clone)]
struct SimNode {
    capacity: i64,
    used: i64,
    defense: f64,
    min_defense: f64,
    money: f64,
    max_money: f64,
    required_gates: u8,
    open_gates: HashSet<GateTool>,
    unlocked: bool,
    base_duration_ms: i64,
    growth_per_thread: f64,
    hack_fraction: f64,
}

/// In-memory stand-in for the live node network.
///
/// Implements the probe side of the environment boundary and the operation
/// effects the workers apply: weaken lowers defense toward the minimum,
/// grow multiplies money (and bumps defense), hack steals a fraction of
/// money (and bumps defense).
#[derive(Debug)]
pub struct SimNetwork {
    nodes: Mutex<HashMap<NodeName, SimNode>>,
    adjacency: HashMap<NodeName, Vec<NodeName>>,
    tools: Vec<GateTool>,
    origin: NodeName,
}

impl SimNetwork {
    pub fn from_dto(dto: NetworkDto) -> Result<Self> {
        let mut nodes = HashMap::new();
        let mut adjacency: HashMap<NodeName, Vec<NodeName>> = HashMap::new();

        for node_dto in &dto.nodes {
            let name = NodeName::new(&node_dto.id);

            if nodes.contains_key(&name) {
                return Err(Error::ModelConstructionError(format!("Duplicate node id '{}' in network fixture.", node_dto.id)));
            }

            nodes.insert(name.clone(), SimNode::from_dto(node_dto));
            adjacency.entry(name).or_default();
        }

        // Links are undirected: register both directions, keeping fixture
        // order for deterministic scans.
        for node_dto in &dto.nodes {
            let name = NodeName::new(&node_dto.id);
            for neighbor in &node_dto.neighbors {
                let neighbor = NodeName::new(neighbor);
                if !nodes.contains_key(&neighbor) {
                    return Err(Error::ModelConstructionError(format!("Node '{}' references unknown neighbor '{}'.", node_dto.id, neighbor)));
                }

                link(&mut adjacency, &name, &neighbor);
                link(&mut adjacency, &neighbor, &name);
            }
        }

        let origin = NodeName::new(&dto.origin);
        if !nodes.contains_key(&origin) {
            return Err(Error::ModelConstructionError(format!("Origin node '{}' is not part of the fixture.", dto.origin)));
        }

        let tools = dto.gate_tools.iter().filter_map(|raw| parse_tool(raw)).collect();

        Ok(SimNetwork { nodes: Mutex::new(nodes), adjacency, tools, origin })
    }

    pub fn origin(&self) -> &NodeName {
        &self.origin
    }

    fn with_node<T>(&self, name: &NodeName, default: T, f: impl FnOnce(&SimNode) -> T) -> T {
        let nodes = self.nodes.lock().expect("sim mutex poisoned");
        match nodes.get(name) {
            Some(node) => f(node),
            None => {
                log::error!("Probe read on unknown node '{}'.", name);
                default
            }
        }
    }

    fn with_node_mut<T>(&self, name: &NodeName, default: T, f: impl FnOnce(&mut SimNode) -> T) -> T {
        let mut nodes = self.nodes.lock().expect("sim mutex poisoned");
        match nodes.get_mut(name) {
            Some(node) => f(node),
            None => {
                log::error!("Probe write on unknown node '{}'.", name);
                default
            }
        }
    }

    /// Claims worker capacity on `host`. Fails when the pool shrank below
    /// the requested amount since the caller last looked.
    pub fn reserve(&self, host: &NodeName, cost: i64) -> bool {
        self.with_node_mut(host, false, |node| {
            if node.used + cost > node.capacity {
                return false;
            }
            node.used += cost;
            true
        })
    }

    pub fn release(&self, host: &NodeName, cost: i64) {
        self.with_node_mut(host, (), |node| {
            node.used = (node.used - cost).max(0);
        });
    }

    /// Applies one completed operation's effect. Returns `false` when the
    /// target has vanished, which the worker reports as a failure.
    pub fn apply(&self, kind: OperationKind, target: &NodeName, threads: u32) -> bool {
        self.with_node_mut(target, false, |node| {
            match kind {
                OperationKind::Weaken => {
                    node.defense = (node.defense - threads as f64 * 0.05).max(node.min_defense);
                }
                OperationKind::Grow => {
                    node.money = (node.money * node.growth_per_thread.powi(threads as i32)).min(node.max_money);
                    node.defense += threads as f64 * 0.004;
                }
                OperationKind::Hack => {
                    let stolen = node.money * (node.hack_fraction * threads as f64).min(1.0);
                    node.money = (node.money - stolen).max(0.0);
                    node.defense += threads as f64 * 0.002;
                }
            }
            true
        })
    }
}

fn link(adjacency: &mut HashMap<NodeName, Vec<NodeName>>, from: &NodeName, to: &NodeName) {
    let edges = adjacency.entry(from.clone()).or_default();
    if !edges.contains(to) {
        edges.push(to.clone());
    }
}

fn parse_tool(raw: &str) -> Option<GateTool> {
    match raw.to_lowercase().as_str() {
        "ssh" => Some(GateTool::Ssh),
        "ftp" => Some(GateTool::Ftp),
        "smtp" => Some(GateTool::Smtp),
        "http" => Some(GateTool::Http),
        "sql" => Some(GateTool::Sql),
        other => {
            log::warn!("Unknown gate tool '{}' in fixture. Skipping.", other);
            None
        }
    }
}

impl SimNode {
    fn from_dto(dto: &NodeDto) -> Self {
        SimNode {
            capacity: dto.capacity,
            used: dto.used,
            defense: dto.defense,
            min_defense: dto.min_defense,
            money: dto.money,
            max_money: dto.max_money,
            required_gates: dto.required_gates,
            open_gates: HashSet::new(),
            unlocked: dto.unlocked,
            base_duration_ms: dto.base_duration_ms,
            growth_per_thread: dto.growth_per_thread,
            hack_fraction: dto.hack_fraction,
        }
    }
}

impl NodeProbe for SimNetwork {
    fn neighbors(&self, node: &NodeName) -> Vec<NodeName> {
        self.adjacency.get(node).cloned().unwrap_or_default()
    }

    fn capacity(&self, node: &NodeName) -> i64 {
        self.with_node(node, 0, |n| n.capacity)
    }

    fn used(&self, node: &NodeName) -> i64 {
        self.with_node(node, 0, |n| n.used)
    }

    fn defense(&self, node: &NodeName) -> f64 {
        self.with_node(node, 0.0, |n| n.defense)
    }

    fn min_defense(&self, node: &NodeName) -> f64 {
        self.with_node(node, 0.0, |n| n.min_defense)
    }

    fn money(&self, node: &NodeName) -> f64 {
        self.with_node(node, 0.0, |n| n.money)
    }

    fn max_money(&self, node: &NodeName) -> f64 {
        self.with_node(node, 0.0, |n| n.max_money)
    }

    fn required_gates(&self, node: &NodeName) -> u8 {
        self.with_node(node, 0, |n| n.required_gates)
    }

    fn open_gates(&self, node: &NodeName) -> u8 {
        self.with_node(node, 0, |n| n.open_gates.len() as u8)
    }

    fn is_unlocked(&self, node: &NodeName) -> bool {
        self.with_node(node, false, |n| n.unlocked)
    }

    fn available_gate_tools(&self) -> Vec<GateTool> {
        self.tools.clone()
    }

    fn open_gate(&self, node: &NodeName, tool: GateTool) -> bool {
        self.with_node_mut(node, false, |n| n.open_gates.insert(tool))
    }

    fn unlock(&self, node: &NodeName) -> bool {
        self.with_node_mut(node, false, |n| {
            if n.open_gates.len() as u8 >= n.required_gates {
                n.unlocked = true;
            }
            n.unlocked
        })
    }

    fn base_duration_ms(&self, node: &NodeName) -> i64 {
        self.with_node(node, 0, |n| {
            let scaled = n.base_duration_ms as f64 * (1.0 + DURATION_PER_DEFENSE * (n.defense - n.min_defense));
            let jitter = rand::rng().random_range(1.0 - DURATION_JITTER..=1.0 + DURATION_JITTER);
            (scaled * jitter).round() as i64
        })
    }

    fn growth_threads(&self, node: &NodeName, multiplier: f64) -> u32 {
        self.with_node(node, 0, |n| {
            if multiplier <= 1.0 || n.growth_per_thread <= 1.0 {
                return 0;
            }
            (multiplier.ln() / n.growth_per_thread.ln()).ceil() as u32
        })
    }

    fn hack_fraction_per_thread(&self, node: &NodeName) -> f64 {
        self.with_node(node, 0.0, |n| n.hack_fraction)
    }

    fn worker_cost(&self, kind: OperationKind) -> i64 {
        // Tenths of a capacity unit per thread, hack scripts being slightly
        // lighter than the other two.
        match kind {
            OperationKind::Hack => 17,
            OperationKind::Weaken | OperationKind::Grow => 18,
        }
    }
}
