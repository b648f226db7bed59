use serde::{Deserialize, Serialize};

use crate::domain::utils::id::NodeName;

/// Point-in-time state of one remote compute node, captured during a scan.
///
/// A snapshot is never mutated after construction, with the single exception
/// of the unlock attempt performed while the scan walks the tree (see
/// `access::attempt_unlock`). Each scan builds an entirely new tree; no node
/// is shared with a previous scan's result, so readers of an old tree are
/// never affected by a new one being built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: NodeName,

    /// Total worker capacity of the node.
    pub capacity: i64,
    /// Capacity already claimed by running workers.
    pub used: i64,

    /// Current defense level. Rises passively from grow and hack operations.
    pub defense: f64,
    /// Floor the defense level can be weakened down to.
    pub min_defense: f64,

    /// Currently extractable value.
    pub money: f64,
    /// Upper bound on extractable value.
    pub max_money: f64,

    /// Access gates that must be opened before the node can be unlocked.
    pub required_gates: u8,
    /// Gates opened so far.
    pub open_gates: u8,
    /// Whether commands can be executed on the node.
    pub unlocked: bool,

    /// Child nodes discovered through this node. The parent back-edge is
    /// only used to stop re-traversal and is not stored here.
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Builds a snapshot from raw attribute reads, enforcing the construction
    /// invariants `used <= capacity` and `open_gates <= required_gates`.
    /// Violations are clamped and logged; a probe reporting them is out of
    /// sync, not a reason to abort the scan.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: NodeName,
        capacity: i64,
        used: i64,
        defense: f64,
        min_defense: f64,
        money: f64,
        max_money: f64,
        required_gates: u8,
        open_gates: u8,
        unlocked: bool,
    ) -> Self {
        let used = if used > capacity {
            log::warn!("Node '{}' reports used capacity {} above total {}. Clamping.", name, used, capacity);
            capacity
        } else {
            used
        };

        let open_gates = if open_gates > required_gates {
            log::warn!("Node '{}' reports {} open gates of {} required. Clamping.", name, open_gates, required_gates);
            required_gates
        } else {
            open_gates
        };

        NodeSnapshot {
            name,
            capacity,
            used,
            defense,
            min_defense,
            money,
            max_money,
            required_gates,
            open_gates,
            unlocked,
            children: Vec::new(),
        }
    }

    /// Capacity still available for new workers.
    pub fn free(&self) -> i64 {
        self.capacity - self.used
    }

    /// Profitability proxy: `floor(max_money / min_defense)`.
    ///
    /// Undefined (`None`) when the node is locked or its minimum defense is
    /// zero; such nodes are filtered out by the target selector.
    pub fn score(&self) -> Option<i64> {
        if !self.unlocked || self.min_defense <= 0.0 {
            return None;
        }

        Some((self.max_money / self.min_defense).floor() as i64)
    }

    /// Pre-order flattening of the tree rooted at this node. Discovery order
    /// is the tie-breaker for target ranking, so the order here is part of
    /// the selector's determinism contract.
    pub fn flatten(&self) -> Vec<&NodeSnapshot> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a NodeSnapshot>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }

    /// Looks a node up by name anywhere in this tree.
    pub fn find(&self, name: &NodeName) -> Option<&NodeSnapshot> {
        if &self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}
