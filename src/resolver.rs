//! Edge resolver
//!
//! Second pass over a requested unit, run once every unit has contributed its
//! declarations. Each call expression is matched to a declared node by callee
//! name; when several nodes share the name, the one whose unit or scope matches
//! the call's qualifying context wins. The match is a heuristic: ties keep the
//! first node registered and are reported as ambiguous.

use serde::Serialize;

use crate::builtins::Builtins;
use crate::graph::CallGraph;
use crate::node::{CallableNode, DeclRef, NodeId, NodeIdx, CONSTRUCTOR, TOP_LEVEL};
use crate::scanner::unit_name;
use crate::scope::ScopeContext;
use crate::syntax::{NodeKind, Receiver, SyntaxNode, SyntaxTree, TreeId};
use std::path::Path;

/// Outcome of matching one call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one declared node has the callee name
    Unique(NodeIdx),
    /// Several did, and only one matched the qualifying context
    Preferred(NodeIdx),
    /// Several candidates scored equally; `chosen` is the first registered
    Ambiguous { chosen: NodeIdx, candidates: Vec<NodeIdx> },
    /// Nothing declared matched, a placeholder stands in
    Placeholder(NodeIdx),
}

impl Resolution {
    pub fn target(&self) -> NodeIdx {
        match self {
            Resolution::Unique(idx)
            | Resolution::Preferred(idx)
            | Resolution::Placeholder(idx)
            | Resolution::Ambiguous { chosen: idx, .. } => *idx,
        }
    }
}

/// A call site the heuristic could not settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousCall {
    pub caller: NodeId,
    pub callee: String,
    pub candidates: Vec<NodeId>,
    pub chosen: NodeId,
}

/// What a resolve pass over one tree produced.
#[derive(Debug, Default, Clone)]
pub struct ResolveSummary {
    pub edges: usize,
    pub skipped_builtins: usize,
    pub ambiguous: Vec<AmbiguousCall>,
}

pub struct EdgeResolver<'b> {
    builtins: &'b Builtins,
    include_builtins: bool,
}

impl<'b> EdgeResolver<'b> {
    pub fn new(builtins: &'b Builtins, include_builtins: bool) -> Self {
        Self { builtins, include_builtins }
    }

    /// Declared nodes a call to `callee` could mean, in registration order.
    ///
    /// A type name used as a call means its constructor.
    pub fn candidates(&self, graph: &CallGraph, callee: &str) -> Vec<NodeIdx> {
        let mut found: Vec<NodeIdx> = graph
            .named(callee)
            .iter()
            .copied()
            .chain(
                graph
                    .named(CONSTRUCTOR)
                    .iter()
                    .copied()
                    .filter(|&idx| graph.get(idx).id().scope == callee),
            )
            .filter(|&idx| !graph.get(idx).id().is_placeholder())
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// Match `callee` against the graph using `context` to break ties.
    ///
    /// Inserts a placeholder when nothing matches. Built-in filtering is the
    /// caller's concern.
    pub fn resolve_call(&self, graph: &mut CallGraph, callee: &str, context: &str) -> Resolution {
        let candidates = self.candidates(graph, callee);
        match candidates.len() {
            0 => {
                let id = if self.builtins.contains(callee) {
                    NodeId::builtin(callee)
                } else {
                    NodeId::unknown(callee)
                };
                Resolution::Placeholder(graph.add(CallableNode::new(id)))
            }
            1 => Resolution::Unique(candidates[0]),
            _ => {
                let scores: Vec<bool> = candidates
                    .iter()
                    .map(|&idx| graph.get(idx).id().is_identifier(context))
                    .collect();
                let best = scores.iter().any(|&s| s);
                let winners: Vec<NodeIdx> = candidates
                    .iter()
                    .zip(&scores)
                    .filter(|(_, s)| **s == best)
                    .map(|(&idx, _)| idx)
                    .collect();
                if winners.len() == 1 {
                    Resolution::Preferred(winners[0])
                } else {
                    Resolution::Ambiguous { chosen: winners[0], candidates: winners }
                }
            }
        }
    }

    /// Walk `tree` and record an edge for every call site in it.
    pub fn resolve(&self, tree: &SyntaxTree, graph: &mut CallGraph) -> ResolveSummary {
        let mut pass = Pass {
            resolver: self,
            graph,
            unit: unit_name(tree.path()),
            path: tree.path(),
            tree: tree.id,
            summary: ResolveSummary::default(),
        };
        tracing::debug!(unit = %pass.unit, "resolving calls");
        pass.visit(&tree.root, ScopeContext::module());
        pass.summary
    }
}

struct Pass<'p, 'b> {
    resolver: &'p EdgeResolver<'b>,
    graph: &'p mut CallGraph,
    unit: String,
    path: &'p Path,
    tree: TreeId,
    summary: ResolveSummary,
}

impl Pass<'_, '_> {
    fn visit<'t>(&mut self, node: &'t SyntaxNode, ctx: ScopeContext<'t>) {
        if let NodeKind::Call { callee: Some(callee), receiver } = &node.kind {
            self.call(callee, receiver, ctx);
        }
        let inner = ctx.enter(node);
        for child in &node.children {
            self.visit(child, inner);
        }
    }

    fn call(&mut self, callee: &str, receiver: &Receiver, ctx: ScopeContext<'_>) {
        if self.resolver.builtins.contains(callee) && !self.resolver.include_builtins {
            self.summary.skipped_builtins += 1;
            return;
        }

        let caller = self.caller(ctx);
        let context = match receiver {
            Receiver::Named(name) => name.as_str(),
            Receiver::Unnamed => ctx.class_name(),
            Receiver::None => self.unit.as_str(),
        };
        let resolution = self.resolver.resolve_call(self.graph, callee, context);
        let target = resolution.target();

        if let Resolution::Ambiguous { chosen, candidates } = &resolution {
            let call = AmbiguousCall {
                caller: self.graph.get(caller).id().clone(),
                callee: callee.to_string(),
                candidates: candidates.iter().map(|&i| self.graph.get(i).id().clone()).collect(),
                chosen: self.graph.get(*chosen).id().clone(),
            };
            tracing::warn!(
                "Could not definitively resolve {} from {} ({} candidates), using {}",
                callee,
                call.caller,
                call.candidates.len(),
                call.chosen
            );
            self.summary.ambiguous.push(call);
        }

        tracing::debug!(
            caller = %self.graph.get(caller).id(),
            callee = %self.graph.get(target).id(),
            "edge"
        );
        if self.graph.add_edge(caller, target) {
            self.summary.edges += 1;
        }
    }

    /// Node the current call site belongs to.
    fn caller(&mut self, ctx: ScopeContext<'_>) -> NodeIdx {
        match ctx.function() {
            Some((name, id)) => {
                let decl = DeclRef { tree: self.tree, node: id };
                match self.graph.find_by_decl(decl) {
                    Some(idx) => idx,
                    None => self.graph.add(
                        CallableNode::new(NodeId::new(&self.unit, ctx.class_name(), name))
                            .with_decl(decl)
                            .with_path(self.path),
                    ),
                }
            }
            None => self.graph.add(
                CallableNode::new(NodeId::new(&self.unit, ctx.class_name(), TOP_LEVEL))
                    .with_path(self.path),
            ),
        }
    }
}
