//! Connectivity analytics
//!
//! Copies the primary part of a call graph into a `petgraph` digraph and
//! measures how tangled it is. Secondary nodes are left out so modules that
//! were only crawled do not dilute the numbers.

use petgraph::algo::{connected_components, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Direction as Flow;
use serde::Serialize;
use std::collections::HashMap;

use crate::graph::{CallGraph, Direction};
use crate::node::{NodeId, NodeIdx};

/// Measurements over the non-secondary call graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityReport {
    pub nodes: usize,
    pub edges: usize,
    pub mean_degree: f64,
    pub max_degree: usize,
    /// `degree_histogram[d]` is the number of nodes with degree `d`
    pub degree_histogram: Vec<usize>,
    pub density: f64,
    pub components: usize,
    pub is_connected: bool,
    pub isolated: usize,
    pub connected_pairs: usize,
    pub potential_pairs: usize,
    /// Strongly connected groups with more than one node or a self-loop
    pub cycle_groups: usize,
    pub largest_cycle_group: usize,
}

impl ConnectivityReport {
    /// Share of node pairs joined by some path, ignoring direction.
    pub fn coverage(&self) -> f64 {
        if self.potential_pairs == 0 {
            0.0
        } else {
            self.connected_pairs as f64 / self.potential_pairs as f64
        }
    }

    /// Label/value pairs for tabular display.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Functions", self.nodes.to_string()),
            ("Calls", self.edges.to_string()),
            ("Mean degree", format!("{:.2}", self.mean_degree)),
            ("Max degree", self.max_degree.to_string()),
            ("Degree histogram", format!("{:?}", self.degree_histogram)),
            ("Density", format!("{:.4}", self.density)),
            ("Components", self.components.to_string()),
            ("Is connected", self.is_connected.to_string()),
            ("Isolated", self.isolated.to_string()),
            (
                "Connected pairs",
                format!(
                    "{}/{} ({:.1}%)",
                    self.connected_pairs,
                    self.potential_pairs,
                    self.coverage() * 100.0
                ),
            ),
            ("Cycle groups", self.cycle_groups.to_string()),
            ("Largest cycle group", self.largest_cycle_group.to_string()),
        ]
    }
}

/// The primary nodes of `graph` as a petgraph digraph.
///
/// Edges point from caller to callee, or the other way when `direction` is
/// [`Direction::Dependencies`], matching how the listing reads.
pub fn to_petgraph(graph: &CallGraph, direction: Direction) -> DiGraph<NodeId, ()> {
    let mut out = DiGraph::new();
    let mut index: HashMap<NodeIdx, NodeIndex> = HashMap::new();
    for (idx, node) in graph.nodes().filter(|(_, n)| !n.is_secondary()) {
        index.insert(idx, out.add_node(node.id().clone()));
    }
    for (idx, node) in graph.nodes() {
        let Some(&from) = index.get(&idx) else { continue };
        for callee in node.dependencies() {
            if let Some(&to) = index.get(callee) {
                match direction {
                    Direction::Dependents => out.add_edge(from, to, ()),
                    Direction::Dependencies => out.add_edge(to, from, ()),
                };
            }
        }
    }
    out
}

pub fn analyze(graph: &CallGraph, direction: Direction) -> ConnectivityReport {
    let g = to_petgraph(graph, direction);
    let n = g.node_count();

    let degrees: Vec<usize> = g
        .node_indices()
        .map(|i| g.edges_directed(i, Flow::Outgoing).count() + g.edges_directed(i, Flow::Incoming).count())
        .collect();
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let mut degree_histogram = vec![0; if n == 0 { 0 } else { max_degree + 1 }];
    for &d in &degrees {
        degree_histogram[d] += 1;
    }

    let mut sets = UnionFind::new(n);
    for edge in g.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }
    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for i in 0..n {
        *sizes.entry(sets.find(i)).or_default() += 1;
    }
    let components = connected_components(&g);
    let connected_pairs = sizes.values().map(|s| s * s.saturating_sub(1) / 2).sum();

    let cycles: Vec<usize> = tarjan_scc(&g)
        .into_iter()
        .filter(|scc| scc.len() > 1 || g.contains_edge(scc[0], scc[0]))
        .map(|scc| scc.len())
        .collect();

    ConnectivityReport {
        nodes: n,
        edges: g.edge_count(),
        mean_degree: if n == 0 { 0.0 } else { degrees.iter().sum::<usize>() as f64 / n as f64 },
        max_degree,
        degree_histogram,
        density: if n < 2 { 0.0 } else { g.edge_count() as f64 / (n * (n - 1)) as f64 },
        components,
        is_connected: components == 1,
        isolated: degrees.iter().filter(|&&d| d == 0).count(),
        connected_pairs,
        potential_pairs: n * n.saturating_sub(1) / 2,
        cycle_groups: cycles.len(),
        largest_cycle_group: cycles.into_iter().max().unwrap_or(0),
    }
}
