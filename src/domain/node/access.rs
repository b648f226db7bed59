use serde::{Deserialize, Serialize};

use crate::domain::net::probe::NodeProbe;
use crate::domain::node::snapshot::NodeSnapshot;

/// The access-gate tools a harvester may hold. Each opens one kind of gate
/// on a node; a node is unlockable once at least `required_gates` of its
/// gates are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateTool {
    Ssh,
    Ftp,
    Smtp,
    Http,
    Sql,
}

impl GateTool {
    pub const ALL: [GateTool; 5] = [GateTool::Ssh, GateTool::Ftp, GateTool::Smtp, GateTool::Http, GateTool::Sql];
}

/// Best-effort unlock of a node during a scan.
///
/// Invokes every available gate tool, then unlocks the node if enough gates
/// are open, and re-reads the stored flags from the probe. Idempotent:
/// calling it on an already-unlocked node is a no-op returning the existing
/// state.
///
/// Holding fewer tools than the node requires gates is not an error, it is
/// expected steady state. The node simply stays locked and the selector
/// filters it out.
pub fn attempt_unlock(probe: &dyn NodeProbe, node: &mut NodeSnapshot) -> bool {
    if node.unlocked {
        return true;
    }

    let tools = probe.available_gate_tools();

    if (node.required_gates as usize) > tools.len() {
        log::debug!(
            "Node '{}' requires {} gates but only {} tools are available. Staying locked.",
            node.name,
            node.required_gates,
            tools.len()
        );
        return false;
    }

    // Always open every gate we have a tool for, unless they are all open.
    if node.open_gates < GateTool::ALL.len() as u8 {
        for tool in tools {
            probe.open_gate(&node.name, tool);
        }
    }

    node.open_gates = probe.open_gates(&node.name);

    if node.open_gates >= node.required_gates {
        probe.unlock(&node.name);
    }

    // Re-read rather than assume: the probe owns the truth about access.
    node.unlocked = probe.is_unlocked(&node.name);

    if node.unlocked {
        log::info!("Unlocked node '{}' ({} gates open).", node.name, node.open_gates);
    }

    node.unlocked
}
