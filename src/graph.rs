//! Call Graph - canonical node arena
//!
//! Nodes live in an arena addressed by [`NodeIdx`]; a map from identity triple
//! to index keeps exactly one canonical node per identity. Every component adds
//! nodes through [`CallGraph::add`] and holds on to the returned index.
//!
//! Edges are stored on both endpoints, so dependents and dependencies are each
//! enumerable without scanning the graph.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::node::{CallableNode, DeclRef, NodeId, NodeIdx};

/// Which side of a node's edges to look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Nodes that call this node
    #[default]
    Dependents,
    /// Nodes this node calls
    Dependencies,
}

impl Direction {
    pub fn from_inverse(inverse: bool) -> Self {
        if inverse { Direction::Dependencies } else { Direction::Dependents }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Dependents => "Dependents",
            Direction::Dependencies => "Dependencies",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CallGraph {
    nodes: Vec<CallableNode>,
    by_id: HashMap<NodeId, NodeIdx>,
    /// Insertion-ordered indices per callable name
    by_name: HashMap<String, Vec<NodeIdx>>,
    by_decl: HashMap<DeclRef, NodeIdx>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert `node` unless its identity is already present.
    ///
    /// Returns the canonical index either way. A later copy can promote a
    /// secondary node to primary and fill in a missing back-reference or path;
    /// its edge sets are ignored, use [`CallGraph::merge`] to carry edges.
    pub fn add(&mut self, node: CallableNode) -> NodeIdx {
        if let Some(&idx) = self.by_id.get(node.id()) {
            let canonical = &mut self.nodes[idx.index()];
            let had_decl = canonical.decl().is_some();
            canonical.absorb(&node);
            if let (false, Some(decl)) = (had_decl, canonical.decl()) {
                self.by_decl.insert(decl, idx);
            }
            return idx;
        }

        let idx = NodeIdx(self.nodes.len() as u32);
        self.by_id.insert(node.id().clone(), idx);
        self.by_name.entry(node.id().name.clone()).or_default().push(idx);
        if let Some(decl) = node.decl() {
            self.by_decl.insert(decl, idx);
        }
        let mut node = node;
        node.dependencies.clear();
        node.dependents.clear();
        self.nodes.push(node);
        idx
    }

    pub fn get(&self, idx: NodeIdx) -> &CallableNode {
        &self.nodes[idx.index()]
    }

    pub fn find(&self, id: &NodeId) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    /// Node declared by the given syntax node, if any.
    pub fn find_by_decl(&self, decl: DeclRef) -> Option<NodeIdx> {
        self.by_decl.get(&decl).copied()
    }

    /// Nodes with the given callable name, in insertion order.
    pub fn named(&self, name: &str) -> &[NodeIdx] {
        self.by_name.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &CallableNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeIdx(i as u32), n))
    }

    /// Record that `from` calls `to`. Returns false if the edge already existed.
    pub fn add_edge(&mut self, from: NodeIdx, to: NodeIdx) -> bool {
        let added = self.nodes[from.index()].dependencies.insert(to);
        self.nodes[to.index()].dependents.insert(from);
        added
    }

    pub fn edges(&self, idx: NodeIdx, direction: Direction) -> &BTreeSet<NodeIdx> {
        let node = self.get(idx);
        match direction {
            Direction::Dependents => node.dependents(),
            Direction::Dependencies => node.dependencies(),
        }
    }

    /// Dependents or dependencies of a node.
    pub fn query(&self, idx: NodeIdx, direction: Direction) -> impl Iterator<Item = &CallableNode> {
        self.edges(idx, direction).iter().map(|&i| self.get(i))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.dependencies.len()).sum()
    }

    /// Fold another graph into this one.
    ///
    /// Every node goes through [`CallGraph::add`], then each of the other
    /// graph's edges is re-recorded between the canonical indices. Merging the
    /// same graph twice is a no-op the second time.
    pub fn merge(&mut self, other: &CallGraph) -> Vec<NodeIdx> {
        let mapping: Vec<NodeIdx> = other.nodes.iter().map(|n| self.add(n.clone())).collect();
        for (from, node) in other.nodes.iter().enumerate() {
            for to in &node.dependencies {
                self.add_edge(mapping[from], mapping[to.index()]);
            }
        }
        mapping
    }

    /// Node list sorted by identity with each node's edges in `direction`,
    /// also sorted. With `hide_secondary`, edge-less secondary nodes are left out.
    pub fn render(&self, direction: Direction, hide_secondary: bool) -> Vec<RenderedNode> {
        let mut rendered: Vec<RenderedNode> = self
            .nodes()
            .filter(|(_, node)| !(hide_secondary && node.is_hidden()))
            .map(|(idx, node)| {
                let mut edges: Vec<NodeId> =
                    self.query(idx, direction).map(|n| n.id().clone()).collect();
                edges.sort();
                RenderedNode {
                    node: node.id().clone(),
                    secondary: node.is_secondary(),
                    path: node.path().cloned(),
                    edges,
                }
            })
            .collect();
        rendered.sort_by(|a, b| a.node.cmp(&b.node));
        rendered
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edge_count(),
            secondary: self.nodes.iter().filter(|n| n.is_secondary()).count(),
            hidden: self.nodes.iter().filter(|n| n.is_hidden()).count(),
            placeholders: self.nodes.iter().filter(|n| n.id().is_placeholder()).count(),
        }
    }
}

/// One line of rendered output: a node and its sorted edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNode {
    pub node: NodeId,
    pub secondary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub edges: Vec<NodeId>,
}

/// Statistics about a call graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub secondary: usize,
    pub hidden: usize,
    pub placeholders: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Call Graph Statistics:")?;
        writeln!(f, "  Functions: {} (secondary: {}, hidden: {})", self.nodes, self.secondary, self.hidden)?;
        writeln!(f, "  Placeholders: {}", self.placeholders)?;
        writeln!(f, "  Calls: {}", self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(unit: &str, scope: &str, name: &str) -> CallableNode {
        CallableNode::new(NodeId::new(unit, scope, name))
    }

    fn assert_symmetric(graph: &CallGraph) {
        for (idx, n) in graph.nodes() {
            for &dep in n.dependencies() {
                assert!(graph.get(dep).dependents().contains(&idx));
            }
            for &dep in n.dependents() {
                assert!(graph.get(dep).dependencies().contains(&idx));
            }
        }
    }

    #[test]
    fn test_add_returns_canonical_index() {
        let mut graph = CallGraph::new();
        let a = graph.add(node("m", "", "f"));
        let b = graph.add(node("m", "", "f").with_secondary(true));
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
        assert!(!graph.get(a).is_secondary());
    }

    #[test]
    fn test_primary_copy_promotes_secondary() {
        let mut graph = CallGraph::new();
        let a = graph.add(node("m", "", "f").with_secondary(true));
        assert!(graph.get(a).is_secondary());
        graph.add(node("m", "", "f"));
        assert!(!graph.get(a).is_secondary());
    }

    #[test]
    fn test_edges_are_symmetric() {
        let mut graph = CallGraph::new();
        let f = graph.add(node("m", "", "f"));
        let g = graph.add(node("m", "", "g"));
        assert!(graph.add_edge(f, g));
        assert!(!graph.add_edge(f, g));

        assert!(graph.get(f).dependencies().contains(&g));
        assert!(graph.get(g).dependents().contains(&f));
        assert_eq!(graph.query(g, Direction::Dependents).count(), 1);
        assert_eq!(graph.query(f, Direction::Dependencies).next().unwrap().id().name, "g");
        assert_eq!(graph.edge_count(), 1);
        assert_symmetric(&graph);
    }

    #[test]
    fn test_self_loop() {
        let mut graph = CallGraph::new();
        let r = graph.add(node("m", "", "recursive_function"));
        graph.add_edge(r, r);
        assert!(graph.get(r).dependencies().contains(&r));
        assert!(graph.get(r).dependents().contains(&r));
        assert_symmetric(&graph);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut partial = CallGraph::new();
        let f = partial.add(node("a", "", "f"));
        let g = partial.add(node("b", "", "g").with_secondary(true));
        partial.add_edge(f, g);

        let mut graph = CallGraph::new();
        graph.add(node("b", "", "g"));
        graph.merge(&partial);
        let once = graph.render(Direction::Dependencies, false);
        let edges_once = graph.edge_count();

        graph.merge(&partial);
        assert_eq!(graph.render(Direction::Dependencies, false), once);
        assert_eq!(graph.edge_count(), edges_once);
        assert_eq!(graph.len(), 2);
        assert_symmetric(&graph);
    }

    #[test]
    fn test_merge_lands_edges_on_canonical_node() {
        let mut graph = CallGraph::new();
        let existing = graph.add(node("b", "", "g"));

        let mut partial = CallGraph::new();
        let f = partial.add(node("a", "", "f"));
        let g = partial.add(node("b", "", "g"));
        partial.add_edge(f, g);

        let mapping = graph.merge(&partial);
        assert_eq!(mapping[g.index()], existing);
        assert_eq!(graph.get(existing).in_degree(), 1);
    }

    #[test]
    fn test_render_hides_edgeless_secondary() {
        let mut graph = CallGraph::new();
        let f = graph.add(node("a", "", "f"));
        let g = graph.add(node("b", "", "g").with_secondary(true));
        graph.add(node("b", "", "unused").with_secondary(true));

        let names: Vec<_> = graph
            .render(Direction::Dependents, true)
            .into_iter()
            .map(|r| r.node.name)
            .collect();
        assert_eq!(names, vec!["f"]);

        graph.add_edge(f, g);
        let names: Vec<_> = graph
            .render(Direction::Dependents, true)
            .into_iter()
            .map(|r| r.node.name)
            .collect();
        assert_eq!(names, vec!["f", "g"]);
        assert_eq!(graph.render(Direction::Dependents, false).len(), 3);
    }

    #[test]
    fn test_render_sorted_regardless_of_insertion_order() {
        let mut first = CallGraph::new();
        let mut second = CallGraph::new();
        let ids = [("b", "", "x"), ("a", "K", "y"), ("a", "", "z")];
        for (u, s, n) in ids {
            first.add(node(u, s, n));
        }
        for (u, s, n) in ids.iter().rev() {
            second.add(node(u, s, n));
        }
        assert_eq!(
            first.render(Direction::Dependents, true),
            second.render(Direction::Dependents, true)
        );
        assert_eq!(first.render(Direction::Dependents, true)[0].node, NodeId::new("a", "", "z"));
    }

    #[test]
    fn test_named_keeps_insertion_order() {
        let mut graph = CallGraph::new();
        let a = graph.add(node("m", "T1", "run"));
        graph.add(node("m", "", "other"));
        let b = graph.add(node("m", "T2", "run"));
        assert_eq!(graph.named("run"), &[a, b]);
        assert!(graph.named("missing").is_empty());
    }

    #[test]
    fn test_stats() {
        let mut graph = CallGraph::new();
        let f = graph.add(node("m", "", "f"));
        let p = graph.add(CallableNode::new(NodeId::unknown("mystery")));
        graph.add(node("n", "", "g").with_secondary(true));
        graph.add_edge(f, p);

        let stats = graph.stats();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.edges, 1);
        assert_eq!(stats.secondary, 1);
        assert_eq!(stats.hidden, 1);
        assert_eq!(stats.placeholders, 1);
    }
}
