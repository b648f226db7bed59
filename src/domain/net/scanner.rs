use crate::domain::net::probe::NodeProbe;
use crate::domain::node::access::attempt_unlock;
use crate::domain::node::snapshot::NodeSnapshot;
use crate::domain::utils::id::NodeName;

/// Depth-first walk of the node network starting at `root`, producing a
/// complete, structurally independent snapshot tree.
///
/// Cycle safety comes from excluding the immediate parent edge rather than a
/// visited-set: the topology is an undirected graph with no other cycles.
/// Every visited node gets its attributes captured and a best-effort unlock
/// attempt before its children are scanned.
///
/// Cheap enough to sit in the coordinator's tick loop; the caller's tick
/// interval bounds the scan rate.
pub fn scan(probe: &dyn NodeProbe, root: &NodeName) -> NodeSnapshot {
    scan_from(probe, root, None)
}

fn scan_from(probe: &dyn NodeProbe, name: &NodeName, parent: Option<&NodeName>) -> NodeSnapshot {
    let mut node = capture(probe, name);

    // Open gates and unlock while we are here; the snapshot stores the
    // re-read access flags.
    attempt_unlock(probe, &mut node);

    for child in probe.neighbors(name) {
        // Stop it from infinite recursion
        if Some(&child) == parent {
            continue;
        }

        node.children.push(scan_from(probe, &child, Some(name)));
    }

    node
}

fn capture(probe: &dyn NodeProbe, name: &NodeName) -> NodeSnapshot {
    NodeSnapshot::new(
        name.clone(),
        probe.capacity(name),
        probe.used(name),
        probe.defense(name),
        probe.min_defense(name),
        probe.money(name),
        probe.max_money(name),
        probe.required_gates(name),
        probe.open_gates(name),
        probe.is_unlocked(name),
    )
}
