mod common;

use common::{FakeMesh, FakeNode, name};
use mesh_harvester::domain::net::scanner::scan;

fn linked_mesh() -> FakeMesh {
    let mut mesh = FakeMesh::new();
    mesh.add("relay", FakeNode::default());
    mesh.add("alpha", FakeNode { defense: 8.0, min_defense: 4.0, ..FakeNode::default() });
    mesh.add("beta", FakeNode::default());
    mesh.add("alpha-leaf", FakeNode::default());
    mesh.connect("relay", "alpha");
    mesh.connect("relay", "beta");
    mesh.connect("alpha", "alpha-leaf");
    mesh
}

#[test]
fn scan_visits_every_reachable_node_exactly_once() {
    let mesh = linked_mesh();

    let tree = scan(&mesh, &name("relay"));
    let flat = tree.flatten();

    assert_eq!(flat.len(), 4, "every node should appear despite the undirected back-edges");

    let mut names: Vec<&str> = flat.iter().map(|n| n.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 4, "no node may be captured twice");

    let alpha = tree.find(&name("alpha")).expect("alpha must be in the tree");
    assert_eq!(alpha.children.len(), 1);
    assert_eq!(alpha.children[0].name, name("alpha-leaf"));
}

#[test]
fn snapshot_tree_is_independent_of_later_mesh_changes() {
    let mesh = linked_mesh();

    let first = scan(&mesh, &name("relay"));
    mesh.set("alpha", |n| n.defense = 99.0);
    let second = scan(&mesh, &name("relay"));

    let old = first.find(&name("alpha")).expect("alpha in first tree");
    let new = second.find(&name("alpha")).expect("alpha in second tree");

    assert_eq!(old.defense, 8.0, "the first tree must keep its captured state");
    assert_eq!(new.defense, 99.0);
}

#[test]
fn scan_unlocks_nodes_the_tools_can_open() {
    let mut mesh = FakeMesh::new();
    mesh.add("relay", FakeNode::default());
    mesh.add("gated", FakeNode { required_gates: 2, unlocked: false, ..FakeNode::default() });
    mesh.connect("relay", "gated");

    let tree = scan(&mesh, &name("relay"));

    let gated = tree.find(&name("gated")).expect("gated in tree");
    assert!(gated.unlocked, "two required gates with two tools must unlock");
    assert_eq!(gated.open_gates, 2);
    assert!(mesh.get("gated").unlocked, "the unlock must be visible on the mesh too");
}

#[test]
fn node_requiring_more_gates_than_tools_stays_locked() {
    let mut mesh = FakeMesh::new();
    mesh.add("relay", FakeNode::default());
    mesh.add("fortress", FakeNode { required_gates: 5, unlocked: false, ..FakeNode::default() });
    mesh.connect("relay", "fortress");

    let tree = scan(&mesh, &name("relay"));

    let fortress = tree.find(&name("fortress")).expect("fortress in tree");
    assert!(!fortress.unlocked);
    assert_eq!(*mesh.open_gate_calls.lock().unwrap(), 0, "a hopeless node must not be probed gate by gate");
}

#[test]
fn unlock_attempt_is_idempotent_across_scans() {
    let mut mesh = FakeMesh::new();
    mesh.add("relay", FakeNode::default());
    mesh.add("gated", FakeNode { required_gates: 1, unlocked: false, ..FakeNode::default() });
    mesh.connect("relay", "gated");

    scan(&mesh, &name("relay"));
    let calls_after_first = *mesh.open_gate_calls.lock().unwrap();
    assert!(calls_after_first > 0);

    scan(&mesh, &name("relay"));
    let calls_after_second = *mesh.open_gate_calls.lock().unwrap();

    assert_eq!(calls_after_first, calls_after_second, "an unlocked node must not be re-opened on later scans");
}
