use crate::domain::node::snapshot::NodeSnapshot;
use crate::domain::utils::id::NodeName;

/// Result of one selection pass.
#[derive(Debug, Clone)]
pub struct TargetUpdate {
    /// Ranked attack-worthy targets, best first.
    pub targets: Vec<NodeSnapshot>,
    /// Whether the set *or order* of names differs from the previous pass.
    /// Downstream replanning keys off this, so an unchanged ranking must
    /// not trigger it.
    pub changed: bool,
}

/// Flattens a snapshot tree into the ranked candidate set.
///
/// Retains only unlocked nodes with a defined positive score, sorts them
/// descending by score and truncates to `max_targets`. The sort is stable,
/// so score ties keep their discovery (pre-order) position: two passes over
/// an unchanged tree return an identical ordering.
#[derive(Debug)]
pub struct TargetSelector {
    max_targets: usize,
    previous: Vec<NodeName>,
}

impl TargetSelector {
    pub fn new(max_targets: usize) -> Self {
        TargetSelector { max_targets, previous: Vec::new() }
    }

    pub fn select(&mut self, tree: &NodeSnapshot) -> TargetUpdate {
        let mut ranked: Vec<&NodeSnapshot> =
            tree.flatten().into_iter().filter(|node| node.unlocked && node.score().is_some_and(|s| s > 0)).collect();

        // Stable sort keeps pre-order position as the tie-breaker.
        ranked.sort_by(|a, b| b.score().cmp(&a.score()));
        ranked.truncate(self.max_targets);

        let names: Vec<NodeName> = ranked.iter().map(|node| node.name.clone()).collect();
        let changed = names != self.previous;

        if changed {
            log::info!("Targets update: {:?}", names.iter().map(|n| n.as_str()).collect::<Vec<_>>());
            self.previous = names;
        }

        TargetUpdate { targets: ranked.into_iter().cloned().collect(), changed }
    }
}
