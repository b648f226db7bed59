use std::sync::Arc;

use crate::domain::node::access::GateTool;
use crate::domain::schedule::entry::OperationKind;
use crate::domain::utils::id::NodeName;

/// Read-only point-in-time attribute source for remote nodes, plus the two
/// action primitives (open a gate, unlock) and the estimation functions the
/// planner needs.
///
/// This is the boundary to the environment the harvester runs against. The
/// in-repo implementation is `sim::SimNetwork`; everything above it only
/// ever sees `Arc<dyn NodeProbe>`.
pub trait NodeProbe: std::fmt::Debug + Send + Sync {
    /// Adjacent node names. The underlying topology is an undirected graph
    /// whose only cycles are the immediate parent edges.
    fn neighbors(&self, node: &NodeName) -> Vec<NodeName>;

    fn capacity(&self, node: &NodeName) -> i64;
    fn used(&self, node: &NodeName) -> i64;

    fn defense(&self, node: &NodeName) -> f64;
    fn min_defense(&self, node: &NodeName) -> f64;

    fn money(&self, node: &NodeName) -> f64;
    fn max_money(&self, node: &NodeName) -> f64;

    fn required_gates(&self, node: &NodeName) -> u8;
    fn open_gates(&self, node: &NodeName) -> u8;
    fn is_unlocked(&self, node: &NodeName) -> bool;

    /// Gate tools currently held. May grow over time as tooling is acquired
    /// (tool acquisition itself is outside the core).
    fn available_gate_tools(&self) -> Vec<GateTool>;

    /// Opens one gate on `node`. Returns `false` when the tool had no effect
    /// (already open, or the node does not expose that gate).
    fn open_gate(&self, node: &NodeName, tool: GateTool) -> bool;

    /// Unlocks `node` for command execution once enough gates are open.
    fn unlock(&self, node: &NodeName) -> bool;

    /// Current base operation duration `D` for this node. Weaken runs `4*D`,
    /// grow `3.2*D`, hack `D`. Drops as the node's defense level drops, and
    /// fluctuates over time.
    fn base_duration_ms(&self, node: &NodeName) -> i64;

    /// Threads needed to multiply the node's money by `multiplier`.
    fn growth_threads(&self, node: &NodeName, multiplier: f64) -> u32;

    /// Fraction of current money one hack thread extracts.
    fn hack_fraction_per_thread(&self, node: &NodeName) -> f64;

    /// Capacity cost of one worker thread of the given kind.
    fn worker_cost(&self, kind: OperationKind) -> i64;
}

pub type SharedProbe = Arc<dyn NodeProbe>;
