#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use mesh_harvester::domain::dispatch::launcher::{LaunchRequest, WorkerLauncher};
use mesh_harvester::domain::net::probe::NodeProbe;
use mesh_harvester::domain::node::access::GateTool;
use mesh_harvester::domain::schedule::entry::OperationKind;
use mesh_harvester::domain::utils::id::{NodeName, WorkerPid};

pub fn name(raw: &str) -> NodeName {
    NodeName::new(raw)
}

/// One node of the fake mesh. Defaults describe an already-unlocked target
/// with room for workers; tests override what they care about.
#[derive(Debug, Clone)]
pub struct FakeNode {
    pub capacity: i64,
    pub used: i64,
    pub defense: f64,
    pub min_defense: f64,
    pub money: f64,
    pub max_money: f64,
    pub required_gates: u8,
    pub open_gates: u8,
    pub unlocked: bool,
    pub base_duration_ms: i64,
}

impl Default for FakeNode {
    fn default() -> Self {
        FakeNode {
            capacity: 10_000,
            used: 0,
            defense: 5.0,
            min_defense: 5.0,
            money: 1_000.0,
            max_money: 1_000.0,
            required_gates: 0,
            open_gates: 0,
            unlocked: true,
            base_duration_ms: 1_000,
        }
    }
}

/// Deterministic in-memory probe: fixed durations (no jitter), explicit
/// undirected edges, and a call counter for the gate-opening primitives.
#[derive(Debug, Default)]
pub struct FakeMesh {
    pub nodes: Mutex<HashMap<NodeName, FakeNode>>,
    pub edges: HashMap<NodeName, Vec<NodeName>>,
    pub tools: Vec<GateTool>,
    pub growth_per_thread: f64,
    pub hack_fraction: f64,
    pub open_gate_calls: Mutex<u32>,
}

impl FakeMesh {
    pub fn new() -> Self {
        FakeMesh {
            nodes: Mutex::new(HashMap::new()),
            edges: HashMap::new(),
            tools: vec![GateTool::Ssh, GateTool::Ftp],
            growth_per_thread: 1.05,
            hack_fraction: 0.002,
            open_gate_calls: Mutex::new(0),
        }
    }

    pub fn add(&mut self, raw: &str, node: FakeNode) {
        self.nodes.lock().unwrap().insert(name(raw), node);
        self.edges.entry(name(raw)).or_default();
    }

    pub fn connect(&mut self, a: &str, b: &str) {
        self.edges.entry(name(a)).or_default().push(name(b));
        self.edges.entry(name(b)).or_default().push(name(a));
    }

    pub fn set<F: FnOnce(&mut FakeNode)>(&self, raw: &str, f: F) {
        let mut nodes = self.nodes.lock().unwrap();
        f(nodes.get_mut(&name(raw)).expect("unknown fake node"));
    }

    pub fn get(&self, raw: &str) -> FakeNode {
        self.nodes.lock().unwrap().get(&name(raw)).expect("unknown fake node").clone()
    }

    fn read<T, F: FnOnce(&FakeNode) -> T>(&self, node: &NodeName, default: T, f: F) -> T {
        self.nodes.lock().unwrap().get(node).map_or(default, f)
    }
}

impl NodeProbe for FakeMesh {
    fn neighbors(&self, node: &NodeName) -> Vec<NodeName> {
        self.edges.get(node).cloned().unwrap_or_default()
    }

    fn capacity(&self, node: &NodeName) -> i64 {
        self.read(node, 0, |n| n.capacity)
    }

    fn used(&self, node: &NodeName) -> i64 {
        self.read(node, 0, |n| n.used)
    }

    fn defense(&self, node: &NodeName) -> f64 {
        self.read(node, 0.0, |n| n.defense)
    }

    fn min_defense(&self, node: &NodeName) -> f64 {
        self.read(node, 0.0, |n| n.min_defense)
    }

    fn money(&self, node: &NodeName) -> f64 {
        self.read(node, 0.0, |n| n.money)
    }

    fn max_money(&self, node: &NodeName) -> f64 {
        self.read(node, 0.0, |n| n.max_money)
    }

    fn required_gates(&self, node: &NodeName) -> u8 {
        self.read(node, 0, |n| n.required_gates)
    }

    fn open_gates(&self, node: &NodeName) -> u8 {
        self.read(node, 0, |n| n.open_gates)
    }

    fn is_unlocked(&self, node: &NodeName) -> bool {
        self.read(node, false, |n| n.unlocked)
    }

    fn available_gate_tools(&self) -> Vec<GateTool> {
        self.tools.clone()
    }

    fn open_gate(&self, node: &NodeName, _tool: GateTool) -> bool {
        *self.open_gate_calls.lock().unwrap() += 1;
        let mut nodes = self.nodes.lock().unwrap();
        nodes.get_mut(node).is_some_and(|n| {
            if n.open_gates < n.required_gates {
                n.open_gates += 1;
                true
            } else {
                false
            }
        })
    }

    fn unlock(&self, node: &NodeName) -> bool {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.get_mut(node).is_some_and(|n| {
            if n.open_gates >= n.required_gates {
                n.unlocked = true;
            }
            n.unlocked
        })
    }

    fn base_duration_ms(&self, node: &NodeName) -> i64 {
        self.read(node, 0, |n| n.base_duration_ms)
    }

    fn growth_threads(&self, _node: &NodeName, multiplier: f64) -> u32 {
        if multiplier <= 1.0 {
            return 0;
        }
        (multiplier.ln() / self.growth_per_thread.ln()).ceil() as u32
    }

    fn hack_fraction_per_thread(&self, _node: &NodeName) -> f64 {
        self.hack_fraction
    }

    fn worker_cost(&self, _kind: OperationKind) -> i64 {
        1
    }
}

/// Launcher that records every request instead of running anything.
/// Hands out sequential pids, or the failure sentinel while `fail` is set.
#[derive(Debug)]
pub struct RecordingLauncher {
    pub requests: Mutex<Vec<LaunchRequest>>,
    pub fail: AtomicBool,
    next_pid: AtomicU32,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        RecordingLauncher { requests: Mutex::new(Vec::new()), fail: AtomicBool::new(false), next_pid: AtomicU32::new(1) }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerLauncher for RecordingLauncher {
    fn launch(&self, request: LaunchRequest) -> WorkerPid {
        self.requests.lock().unwrap().push(request);

        if self.fail.load(Ordering::Relaxed) {
            WorkerPid::FAILED
        } else {
            WorkerPid(self.next_pid.fetch_add(1, Ordering::Relaxed))
        }
    }
}
