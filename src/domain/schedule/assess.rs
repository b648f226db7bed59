use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::config::HarvestConfig;
use crate::domain::node::snapshot::NodeSnapshot;

/// The one action the planner should take for a target right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessedAction {
    Weaken,
    Grow,
    Hack,
}

impl fmt::Display for AssessedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessedAction::Weaken => write!(f, "WEAKEN"),
            AssessedAction::Grow => write!(f, "GROW"),
            AssessedAction::Hack => write!(f, "HACK"),
        }
    }
}

/// Pure decision over a target's current snapshot.
///
/// The check order is a deliberate priority: defense is corrected before
/// yield, and yield before extraction, because an over-defended or
/// under-funded target invalidates any extraction estimate.
pub fn assess(target: &NodeSnapshot, cfg: &HarvestConfig) -> AssessedAction {
    // Check defense
    if target.defense > target.min_defense + cfg.security_margin {
        return AssessedAction::Weaken;
    }

    // Check money
    if target.money < target.max_money * cfg.grow_threshold {
        return AssessedAction::Grow;
    }

    // Everything else is in order, extract
    AssessedAction::Hack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::utils::id::NodeName;

    fn snapshot(defense: f64, min_defense: f64, money: f64, max_money: f64) -> NodeSnapshot {
        NodeSnapshot::new(NodeName::new("n1"), 100, 0, defense, min_defense, money, max_money, 0, 0, true)
    }

    #[test]
    fn defense_overrides_everything() {
        let cfg = HarvestConfig::default();
        // Money state says "grow", defense state must still win.
        let node = snapshot(10.0, 5.0, 0.0, 1000.0);
        assert_eq!(assess(&node, &cfg), AssessedAction::Weaken);
    }

    #[test]
    fn grow_when_primed_but_poor() {
        let cfg = HarvestConfig::default();
        let node = snapshot(5.0, 5.0, 400.0, 1000.0);
        assert_eq!(assess(&node, &cfg), AssessedAction::Grow);
    }

    #[test]
    fn hack_when_primed_and_funded() {
        let cfg = HarvestConfig::default();
        let node = snapshot(5.0, 5.0, 900.0, 1000.0);
        assert_eq!(assess(&node, &cfg), AssessedAction::Hack);
    }

    #[test]
    fn defense_exactly_at_margin_is_not_weakened() {
        let cfg = HarvestConfig::default();
        // defense == min + margin is still acceptable
        let node = snapshot(7.0, 5.0, 900.0, 1000.0);
        assert_eq!(assess(&node, &cfg), AssessedAction::Hack);
    }
}
