// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic, string-keyed directed acyclic graph with Kahn's-algorithm topological sort and
//! depth-batched parallel grouping.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

#[cfg(feature = "profiling")]
use tracing::warn;

use crate::error::{EcsError, Result};

struct Node<T> {
    id: String,
    data: Option<T>,
}

/// A string-keyed DAG: nodes carry caller-supplied data plus forward adjacency; edges are
/// "before" constraints (`add_edge(a, b)` means `a` must run before `b`).
pub struct DagScheduler<T = ()> {
    nodes: Vec<Node<T>>,
    node_index: FxHashMap<String, usize>,
    /// Adjacency: `edges[i]` is the set of node indices that `i` must precede.
    edges: Vec<FxHashSet<usize>>,
}

impl<T> DagScheduler<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            node_index: FxHashMap::default(),
            edges: Vec::new(),
        }
    }

    /// Adds a node carrying `data`. Replaces an already-present node's data in place (warns).
    pub fn add_node(&mut self, id: &str, data: T) {
        if let Some(&idx) = self.node_index.get(id) {
            #[cfg(feature = "profiling")]
            warn!(node = id, "replacing existing node");
            self.nodes[idx].data = Some(data);
            return;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node { id: id.to_string(), data: Some(data) });
        self.edges.push(FxHashSet::default());
        self.node_index.insert(id.to_string(), idx);
    }

    /// Adds a "before" edge: `before` must run before `after`. Both endpoints must already exist;
    /// if either is absent, state is left unmodified and `false` is returned.
    pub fn add_edge(&mut self, before: &str, after: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.node_index.get(before), self.node_index.get(after))
        else {
            #[cfg(feature = "profiling")]
            warn!(before, after, "add_edge: endpoint does not exist");
            return false;
        };
        self.edges[from].insert(to);
        true
    }

    /// Borrows a node's data, if it exists.
    pub fn data(&self, id: &str) -> Option<&T> {
        let &idx = self.node_index.get(id)?;
        self.nodes[idx].data.as_ref()
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) {
        let Some(&idx) = self.node_index.get(id) else {
            return;
        };
        self.node_index.remove(id);
        self.nodes[idx].id.clear();
        self.nodes[idx].data = None;
        self.edges[idx].clear();
        for edges in &mut self.edges {
            edges.remove(&idx);
        }
    }

    fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&i| !self.nodes[i].id.is_empty())
    }

    fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.nodes.len()];
        for i in self.live_indices() {
            for &j in &self.edges[i] {
                degrees[j] += 1;
            }
        }
        degrees
    }

    /// Kahn's algorithm: returns node ids in a valid topological order, or a cycle-detected
    /// error carrying the ids that could not be ordered.
    pub fn topo_sort(&self) -> Result<Vec<String>> {
        let mut degrees = self.in_degrees();
        let mut queue: VecDeque<usize> = self
            .live_indices()
            .filter(|&i| degrees[i] == 0)
            .collect();
        let mut order = Vec::new();
        while let Some(i) = queue.pop_front() {
            order.push(self.nodes[i].id.clone());
            for &j in &self.edges[i] {
                degrees[j] -= 1;
                if degrees[j] == 0 {
                    queue.push_back(j);
                }
            }
        }
        let live_count = self.live_indices().count();
        if order.len() != live_count {
            let remaining: Vec<String> = self
                .live_indices()
                .filter(|&i| degrees[i] > 0)
                .map(|i| self.nodes[i].id.clone())
                .collect();
            return Err(EcsError::CycleDetected(remaining));
        }
        Ok(order)
    }

    /// Returns the cyclic path if the graph (as currently built) contains a cycle, `None` if it
    /// is acyclic.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        match self.topo_sort() {
            Err(EcsError::CycleDetected(path)) => Some(path),
            _ => None,
        }
    }

    /// Groups nodes into batches by dependency depth: batch 0 has no predecessors, batch 1's
    /// members depend only on batch 0, and so on. Nodes within a batch have no edges between
    /// them and may run in parallel.
    pub fn parallel_batches(&self) -> Result<Vec<Vec<String>>> {
        let mut degrees = self.in_degrees();
        let mut remaining: FxHashSet<usize> = self.live_indices().collect();
        let mut batches = Vec::new();
        while !remaining.is_empty() {
            let ready: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| degrees[i] == 0)
                .collect();
            if ready.is_empty() {
                let remaining_ids = remaining.iter().map(|&i| self.nodes[i].id.clone()).collect();
                return Err(EcsError::CycleDetected(remaining_ids));
            }
            for &i in &ready {
                remaining.remove(&i);
                for &j in &self.edges[i] {
                    degrees[j] -= 1;
                }
            }
            let mut batch: Vec<String> =
                ready.into_iter().map(|i| self.nodes[i].id.clone()).collect();
            batch.sort();
            batches.push(batch);
        }
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_sort_respects_edges() {
        let mut dag = DagScheduler::new();
        dag.add_node("a", ());
        dag.add_node("b", ());
        dag.add_node("c", ());
        assert!(dag.add_edge("a", "b"));
        assert!(dag.add_edge("b", "c"));
        let order = dag.topo_sort().unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn add_edge_rejects_nonexistent_endpoints_without_mutating_state() {
        let mut dag: DagScheduler = DagScheduler::new();
        dag.add_node("a", ());
        assert!(!dag.add_edge("a", "ghost"));
        assert!(!dag.add_edge("ghost", "a"));
        assert_eq!(dag.topo_sort().unwrap(), vec!["a"]);
    }

    #[test]
    fn cycle_is_detected() {
        let mut dag = DagScheduler::new();
        dag.add_node("a", ());
        dag.add_node("b", ());
        dag.add_edge("a", "b");
        dag.add_edge("b", "a");
        assert_eq!(dag.detect_cycle(), Some(vec!["a".to_string(), "b".to_string()]));
        assert!(dag.topo_sort().is_err());
    }

    #[test]
    fn parallel_batches_groups_independent_nodes() {
        let mut dag = DagScheduler::new();
        dag.add_node("a", ());
        dag.add_node("b", ());
        dag.add_node("c", ());
        dag.add_edge("a", "c");
        dag.add_edge("b", "c");
        let batches = dag.parallel_batches().unwrap();
        assert_eq!(batches[0], vec!["a".to_string(), "b".to_string()]);
        assert_eq!(batches[1], vec!["c".to_string()]);
    }

    #[test]
    fn remove_node_drops_its_edges() {
        let mut dag = DagScheduler::new();
        dag.add_node("a", ());
        dag.add_node("b", ());
        dag.add_edge("a", "b");
        dag.remove_node("a");
        let order = dag.topo_sort().unwrap();
        assert_eq!(order, vec!["b"]);
    }

    #[test]
    fn add_node_replaces_existing_data() {
        let mut dag = DagScheduler::new();
        dag.add_node("a", 1);
        dag.add_node("a", 2);
        assert_eq!(dag.data("a"), Some(&2));
    }
}
