//! Generic DAG algorithms used by both the Task Graph Builder (C4) and the
//! Scheduler/Walker (C6): cycle detection and transitive closure over a
//! `petgraph::Graph<N, ()>`. Deliberately has no notion of tasks, packages,
//! or visitors — the walker's only variation point is the Visitor
//! capability (spec §9), not this module.

use std::fmt::Debug;

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
    visit::{Dfs, Reversed},
};

/// A cycle found in a graph that is expected to be acyclic, named by its
/// member nodes in SCC-discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<N> {
    pub nodes: Vec<N>,
}

impl<N: Debug> Cycle<N> {
    pub fn describe(&self) -> String {
        self.nodes
            .iter()
            .map(|n| format!("{n:?}"))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Returns every non-trivial strongly-connected component (a true cycle)
/// plus every node with a self-loop (also a cycle, but invisible to SCC
/// grouping on its own since `tarjan_scc` still reports singletons).
pub fn cycles<N: Clone>(graph: &DiGraph<N, ()>) -> Vec<Cycle<N>> {
    tarjan_scc(graph)
        .into_iter()
        .filter_map(|component| {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| graph.contains_edge(n, n));
            is_cycle.then(|| Cycle {
                nodes: component.into_iter().map(|n| graph[n].clone()).collect(),
            })
        })
        .collect()
}

/// Validates that `graph` is acyclic, returning the first cycle found.
pub fn validate_acyclic<N: Clone>(graph: &DiGraph<N, ()>) -> Result<(), Cycle<N>> {
    match cycles(graph).into_iter().next() {
        Some(cycle) => Err(cycle),
        None => Ok(()),
    }
}

/// Every node reachable from `start` by following edges forward, excluding
/// `start` itself.
pub fn transitive_closure_forward<N>(graph: &DiGraph<N, ()>, start: NodeIndex) -> Vec<NodeIndex> {
    let mut dfs = Dfs::new(graph, start);
    dfs.next(graph);
    let mut out = Vec::new();
    while let Some(n) = dfs.next(graph) {
        out.push(n);
    }
    out
}

/// Every node that can reach `start` by following edges forward (i.e. the
/// forward-closure of the reversed graph), excluding `start` itself.
pub fn transitive_closure_backward<N>(graph: &DiGraph<N, ()>, start: NodeIndex) -> Vec<NodeIndex> {
    let reversed = Reversed(graph);
    let mut dfs = Dfs::new(&reversed, start);
    dfs.next(&reversed);
    let mut out = Vec::new();
    while let Some(n) = dfs.next(&reversed) {
        out.push(n);
    }
    out
}
