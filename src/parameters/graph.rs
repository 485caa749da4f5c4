//! Dependency graph between parameters
//!
//! An edge `(a, b)` means "a's expression reads b". Both directions are stored:
//! `dependencies[a]` holds what `a` reads and `affects[b]` holds what reads `b`.
//! The graph computes a deterministic topological order with Kahn's algorithm,
//! or records that no order exists when the expressions form a cycle.

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Errors that can occur when ordering a graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Dependency cycle in {graph} graph among: {}", unresolved.join(", "))]
    CycleDetected {
        graph: String,
        unresolved: Vec<String>,
    },
}

/// Directed dependency graph over parameter keys
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    name: String,
    dependencies: IndexMap<String, IndexSet<String>>,
    affects: IndexMap<String, IndexSet<String>>,
    order: Option<Vec<String>>,
    positions: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Create an empty graph; `name` is used in diagnostics
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: IndexMap::new(),
            affects: IndexMap::new(),
            order: None,
            positions: HashMap::new(),
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ensure `key` exists as a node
    pub fn add_key(&mut self, key: &str) {
        if !self.dependencies.contains_key(key) {
            self.dependencies.insert(key.to_string(), IndexSet::new());
            self.affects.insert(key.to_string(), IndexSet::new());
        }
    }

    /// Record that `from` depends on `to`
    ///
    /// Both maps are updated together; adding an existing edge is a no-op.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        self.add_key(from);
        self.add_key(to);

        if let Some(deps) = self.dependencies.get_mut(from) {
            deps.insert(to.to_string());
        }
        if let Some(readers) = self.affects.get_mut(to) {
            readers.insert(from.to_string());
        }
    }

    /// Keys that `key` reads
    pub fn get_dependencies(&self, key: &str) -> Vec<String> {
        self.dependencies
            .get(key)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys that read `key`
    pub fn get_affects(&self, key: &str) -> Vec<String> {
        self.affects
            .get(key)
            .map(|readers| readers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check whether `key` is a node
    pub fn contains(&self, key: &str) -> bool {
        self.dependencies.contains_key(key)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(IndexSet::len).sum()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Nodes in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.dependencies.keys()
    }

    /// Compute the topological order with Kahn's algorithm
    ///
    /// Each pass emits every node whose dependencies have all been emitted, in
    /// insertion order, then releases the nodes they affect. If some nodes can
    /// never be emitted the graph has a cycle: the order becomes unavailable and
    /// the unresolved nodes are returned in the error.
    pub fn compute_topological_order(&mut self) -> Result<&[String], GraphError> {
        self.order = None;
        self.positions.clear();

        let mut remaining: IndexMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(key, deps)| (key.as_str(), deps.len()))
            .collect();
        let mut result: Vec<String> = Vec::with_capacity(remaining.len());

        loop {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, &count)| count == 0)
                .map(|(&key, _)| key)
                .collect();

            if ready.is_empty() {
                break;
            }

            for key in ready {
                remaining.shift_remove(key);
                result.push(key.to_string());

                if let Some(readers) = self.affects.get(key) {
                    for reader in readers {
                        if let Some(count) = remaining.get_mut(reader.as_str()) {
                            *count = count.saturating_sub(1);
                        }
                    }
                }
            }
        }

        if !remaining.is_empty() {
            return Err(GraphError::CycleDetected {
                graph: self.name.clone(),
                unresolved: remaining.keys().map(|k| k.to_string()).collect(),
            });
        }

        self.positions = result
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i))
            .collect();
        Ok(self.order.insert(result))
    }

    /// The computed order, `None` if not computed or the graph has a cycle
    pub fn topological_order(&self) -> Option<&[String]> {
        self.order.as_deref()
    }

    /// Whether a valid order is available
    pub fn is_orderable(&self) -> bool {
        self.order.is_some()
    }

    /// Position of `key` in the topological order
    ///
    /// `None` when no order is available or the key is not a node.
    pub fn topological_index(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Every key transitively affected by `roots`, roots included
    ///
    /// Breadth-first over the affects relation; keys are returned in discovery
    /// order and each key is expanded at most once.
    pub fn transitive_affects<'a, I>(&self, roots: I) -> IndexSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut visited: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for root in roots {
            if visited.insert(root.to_string()) {
                queue.push_back(root.to_string());
            }
        }

        while let Some(current) = queue.pop_front() {
            if let Some(readers) = self.affects.get(&current) {
                for reader in readers {
                    if visited.insert(reader.clone()) {
                        queue.push_back(reader.clone());
                    }
                }
            }
        }

        visited
    }

    /// Order `keys` by topological index, stable for ties
    ///
    /// Keys without an index sort first as if their index were -1, keeping their
    /// relative order.
    pub fn sort_by_order(&self, keys: &mut [String]) {
        keys.sort_by_key(|key| {
            self.topological_index(key)
                .map(|i| i as isize)
                .unwrap_or(-1)
        });
    }
}
