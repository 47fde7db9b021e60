//! Minimal-depth topological layering of the step graph.
//!
//! The graph is modeled explicitly as a petgraph adjacency structure built
//! once per compilation. [`StepGraph::layers`] places every step in the
//! earliest layer consistent with its upstream dependencies, which maximizes
//! the parallelism declared to the consuming orchestrator. Within a layer,
//! steps keep the insertion order of their identifiers, so the flattened
//! sequence is deterministic across repeated compilations of an unchanged
//! graph.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::GraphError;

#[derive(Debug)]
pub struct StepGraph {
    graph: DiGraph<String, ()>,
}

impl StepGraph {
    /// Builds the adjacency structure from `(id, upstream ids)` pairs.
    ///
    /// Fails with [`GraphError::UnknownUpstream`] if a step references an
    /// upstream id that is not a node of the graph.
    pub fn new<N, P>(nodes: N) -> Result<Self, GraphError>
    where
        N: IntoIterator<Item = (String, P)>,
        P: IntoIterator<Item = String>,
    {
        let mut graph = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();
        let mut pending: Vec<(NodeIndex, Vec<String>)> = Vec::new();

        // Two phases, so upstream references may point at steps inserted
        // later.
        for (id, upstream) in nodes {
            let upstream = upstream.into_iter().collect();
            let index = graph.add_node(id.clone());
            indices.insert(id, index);
            pending.push((index, upstream));
        }

        for (index, upstream) in pending {
            let mut missing = Vec::new();
            for parent in upstream {
                match indices.get(&parent) {
                    Some(&parent) => {
                        graph.add_edge(parent, index, ());
                    }
                    None => missing.push(parent),
                }
            }
            if !missing.is_empty() {
                missing.sort();
                let mut available: Vec<String> = graph.node_weights().cloned().collect();
                available.sort();
                return Err(GraphError::UnknownUpstream {
                    step: graph[index].clone(),
                    missing,
                    available,
                });
            }
        }

        Ok(Self { graph })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Orders the steps into sequential layers of mutually independent steps.
    ///
    /// Every step appears in exactly one layer, strictly after all of its
    /// upstream steps, and in the earliest layer its dependencies permit.
    /// Fails with [`GraphError::Cycle`] if any steps remain unprocessable.
    pub fn layers(&self) -> Result<Vec<Vec<String>>, GraphError> {
        let node_count = self.graph.node_count();
        let mut indegree = vec![0usize; node_count];
        let mut placed = vec![false; node_count];

        for index in self.graph.node_indices() {
            indegree[index.index()] = self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .count();
        }

        let mut layers = Vec::new();
        let mut processed = 0;

        loop {
            // Scan in node-insertion order so ties within a layer resolve
            // deterministically.
            let ready: Vec<NodeIndex> = self
                .graph
                .node_indices()
                .filter(|index| !placed[index.index()] && indegree[index.index()] == 0)
                .collect();

            if ready.is_empty() {
                break;
            }

            for &index in &ready {
                placed[index.index()] = true;
                processed += 1;
                for child in self.graph.neighbors_directed(index, Direction::Outgoing) {
                    indegree[child.index()] -= 1;
                }
            }

            layers.push(ready.iter().map(|&index| self.graph[index].clone()).collect());
        }

        if processed < node_count {
            let mut remaining: Vec<String> = self
                .graph
                .node_indices()
                .filter(|index| !placed[index.index()])
                .map(|index| self.graph[index].clone())
                .collect();
            remaining.sort();
            return Err(GraphError::Cycle { remaining });
        }

        Ok(layers)
    }

    /// The layering flattened into a single execution-safe sequence.
    pub fn sorted(&self) -> Result<Vec<String>, GraphError> {
        Ok(self.layers()?.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[(&str, &[&str])]) -> Result<StepGraph, GraphError> {
        StepGraph::new(nodes.iter().map(|(id, upstream)| {
            (
                id.to_string(),
                upstream.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )
        }))
    }

    #[test]
    fn two_step_chain_yields_two_layers() {
        let layers = graph(&[("a", &[]), ("b", &["a"])]).unwrap().layers().unwrap();
        assert_eq!(layers, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn diamond_is_layered_at_minimal_depth() {
        let layers = graph(&[
            ("load", &[]),
            ("left", &["load"]),
            ("right", &["load"]),
            ("join", &["left", "right"]),
        ])
        .unwrap()
        .layers()
        .unwrap();

        assert_eq!(
            layers,
            vec![
                vec!["load".to_string()],
                vec!["left".to_string(), "right".to_string()],
                vec!["join".to_string()],
            ]
        );
    }

    #[test]
    fn independent_steps_keep_insertion_order() {
        let layers = graph(&[("z", &[]), ("a", &[]), ("m", &[])])
            .unwrap()
            .layers()
            .unwrap();
        assert_eq!(
            layers,
            vec![vec!["z".to_string(), "a".to_string(), "m".to_string()]]
        );
    }

    #[test]
    fn layers_respect_every_parent() {
        // `late` depends on both the root and a node one layer down, so it
        // must land in layer 2 even though one parent is in layer 0.
        let layers = graph(&[("root", &[]), ("mid", &["root"]), ("late", &["root", "mid"])])
            .unwrap()
            .layers()
            .unwrap();
        assert_eq!(
            layers,
            vec![
                vec!["root".to_string()],
                vec!["mid".to_string()],
                vec!["late".to_string()],
            ]
        );
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let graph = graph(&[
            ("d", &[]),
            ("b", &["d"]),
            ("c", &["d"]),
            ("a", &["b", "c"]),
        ])
        .unwrap();

        let first = graph.sorted().unwrap();
        let second = graph.sorted().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn cycles_are_detected() {
        let err = graph(&[("a", &["b"]), ("b", &["a"])])
            .unwrap()
            .layers()
            .unwrap_err();
        match err {
            GraphError::Cycle { remaining } => {
                assert_eq!(remaining, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn partial_cycles_still_fail() {
        // `head` is processable, the tail cycle is not.
        let err = graph(&[("head", &[]), ("x", &["head", "y"]), ("y", &["x"])])
            .unwrap()
            .layers()
            .unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn unknown_upstream_is_a_structural_error() {
        let err = graph(&[("a", &["ghost"])]).unwrap_err();
        match err {
            GraphError::UnknownUpstream { step, missing, .. } => {
                assert_eq!(step, "a");
                assert_eq!(missing, vec!["ghost".to_string()]);
            }
            other => panic!("expected unknown upstream error, got {other}"),
        }
    }

    #[test]
    fn empty_graph_has_no_layers() {
        let graph = graph(&[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.layers().unwrap().is_empty());
    }
}
