//! Tests for the dependency graph

use param_resolver::parameters::{DependencyGraph, Expression, GraphError};

/// Graph built the way the resolver builds it: one edge per expression variable
fn graph_from(name: &str, rules: &[(&str, &str)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new(name);
    for (key, expression) in rules {
        let parsed = Expression::parse(expression).unwrap();
        for dependency in parsed.variables() {
            graph.add_dependency(key, &dependency);
        }
    }
    for (key, _) in rules {
        graph.add_key(key);
    }
    graph
}

/// Every edge (a depends on b) has b ordered before a
fn assert_topologically_valid(graph: &DependencyGraph) {
    for key in graph.keys() {
        let own = graph.topological_index(key).unwrap();
        for dependency in graph.get_dependencies(key) {
            let dep = graph.topological_index(&dependency).unwrap();
            assert!(dep < own, "{} must precede {}", dependency, key);
        }
    }
}

#[test]
fn test_order_respects_every_edge() {
    let mut graph = graph_from(
        "value",
        &[
            ("wall_thickness", "wall_line_width * wall_line_count"),
            ("wall_line_width", "line_width"),
            ("line_width", "machine_nozzle_size"),
            ("infill_line_width", "line_width"),
            ("skin_line_width", "max(line_width, infill_line_width)"),
            ("wall_line_count", "3"),
        ],
    );

    let order = graph.compute_topological_order().unwrap().to_vec();
    assert_eq!(order.len(), graph.node_count());
    assert_topologically_valid(&graph);
    // Both keys without dependencies are released in the first pass
    assert!(order[..2].contains(&"machine_nozzle_size".to_string()));
    assert!(order[..2].contains(&"wall_line_count".to_string()));
}

#[test]
fn test_order_is_deterministic() {
    let rules = [("c", "a + b"), ("b", "a"), ("d", "a")];
    let mut first = graph_from("value", &rules);
    let mut second = graph_from("value", &rules);

    assert_eq!(
        first.compute_topological_order().unwrap(),
        second.compute_topological_order().unwrap()
    );
}

#[test]
fn test_cycle_leaves_graph_unorderable() {
    let mut graph = graph_from(
        "value",
        &[("a", "b + 1"), ("b", "a * 2"), ("c", "5"), ("d", "a")],
    );

    let err = graph.compute_topological_order().unwrap_err();
    let GraphError::CycleDetected { graph: name, unresolved } = err;
    assert_eq!(name, "value");
    assert!(unresolved.contains(&"a".to_string()));
    assert!(unresolved.contains(&"b".to_string()));
    // Downstream of the cycle cannot be ordered either
    assert!(unresolved.contains(&"d".to_string()));
    assert!(!unresolved.contains(&"c".to_string()));

    for key in ["a", "b", "c", "d"] {
        assert_eq!(graph.topological_index(key), None);
    }
    assert!(graph.topological_order().is_none());
}

#[test]
fn test_isolated_keys_get_a_position() {
    let mut graph = graph_from("constraint", &[("a", "1"), ("b", "2")]);
    assert_eq!(graph.edge_count(), 0);

    graph.compute_topological_order().unwrap();
    assert_eq!(graph.topological_index("a"), Some(0));
    assert_eq!(graph.topological_index("b"), Some(1));
}

#[test]
fn test_affects_closure_visits_each_key_once() {
    let graph = graph_from(
        "value",
        &[("b", "a"), ("c", "a + b"), ("d", "c * b"), ("e", "x")],
    );

    let affected = graph.transitive_affects(["a"]);
    let keys: Vec<&str> = affected.iter().map(String::as_str).collect();
    assert_eq!(keys.len(), 4);
    assert_eq!(keys[0], "a");
    assert!(keys.contains(&"d"));
    assert!(!keys.contains(&"e"));
}

#[test]
fn test_sorted_affected_set() {
    let mut graph = graph_from("value", &[("b", "a"), ("c", "b"), ("d", "a")]);
    graph.compute_topological_order().unwrap();

    let mut affected: Vec<String> = graph.transitive_affects(["a"]).into_iter().collect();
    graph.sort_by_order(&mut affected);

    for pair in affected.windows(2) {
        assert!(graph.topological_index(&pair[0]) < graph.topological_index(&pair[1]));
    }
}
