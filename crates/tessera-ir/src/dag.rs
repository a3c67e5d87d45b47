//! Sequence-numbered dependency DAG.
//!
//! Both the braid scheduler and the tile simulator execute against the same
//! dependency structure: nodes are sequence numbers into a master
//! gate/instruction vector, and an edge `a → b` means `b` may only start
//! once `a` has fully retired. The master vector owns the instructions; the
//! DAG stores only sequence numbers, so deleting an instruction never
//! involves reference cycles.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Dependency DAG keyed by sequence number.
#[derive(Debug, Clone, Default)]
pub struct DepDag {
    graph: DiGraph<u32, ()>,
    nodes: FxHashMap<u32, NodeIndex>,
}

impl DepDag {
    /// Build the dependency DAG for an ordered instruction stream.
    ///
    /// For each operand of each instruction, an edge is drawn to the *next*
    /// instruction in program order that uses the same operand. Duplicate
    /// edges (two-operand instructions sharing both operands with the same
    /// successor) are elided.
    pub fn build<Q, Ops, I>(items: I) -> Self
    where
        Q: Hash + Eq,
        Ops: IntoIterator<Item = Q>,
        I: IntoIterator<Item = (u32, Ops)>,
    {
        let mut dag = Self::default();
        let mut last_user: FxHashMap<Q, NodeIndex> = FxHashMap::default();

        for (seq, operands) in items {
            let node = dag.graph.add_node(seq);
            dag.nodes.insert(seq, node);
            for q in operands {
                if let Some(&prev) = last_user.get(&q) {
                    if prev != node {
                        dag.graph.update_edge(prev, node, ());
                    }
                }
                last_user.insert(q, node);
            }
        }
        dag
    }

    /// Add an explicit dependency edge (used for the teleport fan-in edges).
    ///
    /// Unknown sequence numbers are ignored; duplicate edges are elided.
    pub fn add_edge(&mut self, from: u32, to: u32) {
        if let (Some(&a), Some(&b)) = (self.nodes.get(&from), self.nodes.get(&to)) {
            self.graph.update_edge(a, b, ());
        }
    }

    /// Check whether a sequence number is present.
    #[inline]
    pub fn contains(&self, seq: u32) -> bool {
        self.nodes.contains_key(&seq)
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the DAG has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of remaining dependency edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Remaining in-degree of a sequence number (0 if unknown).
    pub fn in_degree(&self, seq: u32) -> usize {
        self.nodes
            .get(&seq)
            .map_or(0, |&n| self.graph.edges_directed(n, Direction::Incoming).count())
    }

    /// Remaining out-degree of a sequence number (0 if unknown).
    pub fn out_degree(&self, seq: u32) -> usize {
        self.nodes
            .get(&seq)
            .map_or(0, |&n| self.graph.edges_directed(n, Direction::Outgoing).count())
    }

    /// Successor sequence numbers, ascending.
    pub fn successors(&self, seq: u32) -> Vec<u32> {
        let Some(&n) = self.nodes.get(&seq) else {
            return vec![];
        };
        let mut out: Vec<u32> = self
            .graph
            .neighbors_directed(n, Direction::Outgoing)
            .map(|m| self.graph[m])
            .collect();
        out.sort_unstable();
        out
    }

    /// Sequence numbers with no pending predecessors, in insertion order.
    pub fn ready_seqs(&self) -> Vec<u32> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .edges_directed(n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| self.graph[n])
            .collect()
    }

    /// Retire a node: remove its outgoing edges and return the successors
    /// whose in-degree thereby dropped to zero, ascending by sequence.
    pub fn complete(&mut self, seq: u32) -> Vec<u32> {
        let Some(&n) = self.nodes.get(&seq) else {
            return vec![];
        };
        let succs: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(n, Direction::Outgoing)
            .collect();
        // Collect edge ids first; removing while iterating invalidates the walker.
        let edges: Vec<_> = self
            .graph
            .edges_directed(n, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for e in edges {
            self.graph.remove_edge(e);
        }
        let mut ready: Vec<u32> = succs
            .into_iter()
            .filter(|&m| {
                self.graph
                    .edges_directed(m, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|m| self.graph[m])
            .collect();
        ready.sort_unstable();
        ready
    }

    /// Longest path through the DAG with a per-node latency, i.e. the
    /// completion time of an unbounded-width schedule.
    pub fn critical_path(&self, latency: impl Fn(u32) -> u64) -> u64 {
        let order = petgraph::algo::toposort(&self.graph, None)
            .expect("dependency graph must be acyclic");
        let mut finish: FxHashMap<NodeIndex, u64> =
            FxHashMap::with_capacity_and_hasher(order.len(), Default::default());
        let mut max_finish = 0u64;
        for n in order {
            let ready_at = self
                .graph
                .edges_directed(n, Direction::Incoming)
                .map(|e| finish.get(&e.source()).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            let done = ready_at + latency(self.graph[n]);
            if done > max_finish {
                max_finish = done;
            }
            finish.insert(n, done);
        }
        max_finish
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dag_of(items: &[(u32, &[u32])]) -> DepDag {
        DepDag::build(items.iter().map(|&(s, qs)| (s, qs.iter().copied())))
    }

    #[test]
    fn test_chain_on_shared_qubit() {
        // Three gates all touching qubit 0: 1 -> 2 -> 3, no 1 -> 3 shortcut.
        let dag = dag_of(&[(1, &[0]), (2, &[0, 1]), (3, &[0])]);
        assert_eq!(dag.edge_count(), 2);
        assert_eq!(dag.successors(1), vec![2]);
        assert_eq!(dag.successors(2), vec![3]);
        assert_eq!(dag.ready_seqs(), vec![1]);
    }

    #[test]
    fn test_duplicate_edges_elided() {
        // Two CNOTs on the same qubit pair produce one edge, not two.
        let dag = dag_of(&[(1, &[0, 1]), (2, &[0, 1])]);
        assert_eq!(dag.edge_count(), 1);
    }

    #[test]
    fn test_independent_gates_all_ready() {
        let dag = dag_of(&[(1, &[0]), (2, &[1]), (3, &[2])]);
        assert_eq!(dag.edge_count(), 0);
        assert_eq!(dag.ready_seqs(), vec![1, 2, 3]);
    }

    #[test]
    fn test_complete_releases_children() {
        let mut dag = dag_of(&[(1, &[0]), (2, &[1]), (3, &[0, 1])]);
        assert_eq!(dag.ready_seqs(), vec![1, 2]);
        assert!(dag.complete(1).is_empty()); // 3 still waits on 2
        assert_eq!(dag.complete(2), vec![3]);
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn test_critical_path_weighted() {
        // 1 -> 2 -> 4 and 3 -> 4; latencies 5, 1, 2, 1.
        let mut dag = dag_of(&[(1, &[0]), (2, &[0]), (3, &[1]), (4, &[0, 1])]);
        let lat = |seq: u32| match seq {
            1 => 5,
            2 => 1,
            3 => 2,
            _ => 1,
        };
        assert_eq!(dag.critical_path(lat), 7);
        // Retiring nodes does not change history-free queries before edges drop.
        dag.complete(1);
        assert_eq!(dag.edge_count(), 2);
    }

    #[test]
    fn test_explicit_edge_dedup_and_unknown() {
        let mut dag = dag_of(&[(1, &[0]), (2, &[1])]);
        dag.add_edge(1, 2);
        dag.add_edge(1, 2);
        dag.add_edge(7, 2); // unknown source ignored
        assert_eq!(dag.edge_count(), 1);
        assert_eq!(dag.in_degree(2), 1);
        assert_eq!(dag.out_degree(1), 1);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Completing nodes as they become ready releases every node
            /// exactly once and drains every edge.
            #[test]
            fn prop_completion_drains_dag(
                ops in proptest::collection::vec((0u32..5, 0u32..5), 1..30)
            ) {
                let items: Vec<(u32, Vec<u32>)> = ops
                    .iter()
                    .enumerate()
                    .map(|(i, &(a, b))| {
                        let qs = if a == b { vec![a] } else { vec![a, b] };
                        (i as u32 + 1, qs)
                    })
                    .collect();
                let mut dag =
                    DepDag::build(items.iter().map(|(s, qs)| (*s, qs.iter().copied())));
                let mut ready = dag.ready_seqs();
                let mut completed = 0usize;
                while let Some(seq) = ready.pop() {
                    completed += 1;
                    ready.extend(dag.complete(seq));
                }
                prop_assert_eq!(completed, items.len());
                prop_assert_eq!(dag.edge_count(), 0);
            }
        }
    }
}
