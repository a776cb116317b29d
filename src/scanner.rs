//! Declaration scanner
//!
//! First pass over a unit: registers one node per declared callable. Classes
//! contribute an implicit constructor scoped to the class; functions, nested
//! or not, are keyed by the enclosing class (or empty) and carry a
//! back-reference to the syntax node that declared them.

use std::path::{Path, PathBuf};

use crate::graph::CallGraph;
use crate::node::{CallableNode, DeclRef, NodeId, CONSTRUCTOR};
use crate::scope::ScopeContext;
use crate::syntax::{NodeKind, SyntaxNode, SyntaxTree, TreeId};

/// Receives the imports a primary unit declares.
pub trait ImportHandler {
    /// `members` are the names of a `from module import ...` statement,
    /// empty for a plain `import module`.
    fn on_import(&mut self, module: &str, members: &[String], importing: &Path, graph: &mut CallGraph);
}

/// Module name a unit is known by: the file stem, or the package directory
/// for `__init__.py`.
pub fn unit_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if stem == "__init__" {
        if let Some(dir) = path.parent().and_then(|p| p.file_name()) {
            return dir.to_string_lossy().to_string();
        }
    }
    stem
}

pub struct DeclarationScanner<'a> {
    graph: &'a mut CallGraph,
    imports: Option<&'a mut dyn ImportHandler>,
    unit: String,
    tree: TreeId,
    path: PathBuf,
    secondary: bool,
    declared: usize,
}

impl<'a> DeclarationScanner<'a> {
    /// Scanner for a directly requested unit
    pub fn primary(graph: &'a mut CallGraph, tree: &SyntaxTree) -> Self {
        Self::new(graph, tree, false)
    }

    /// Scanner for a unit reached by following an import. Its own imports are not followed.
    pub fn secondary(graph: &'a mut CallGraph, tree: &SyntaxTree) -> Self {
        Self::new(graph, tree, true)
    }

    fn new(graph: &'a mut CallGraph, tree: &SyntaxTree, secondary: bool) -> Self {
        Self {
            graph,
            imports: None,
            unit: unit_name(tree.path()),
            tree: tree.id,
            path: tree.path().to_path_buf(),
            secondary,
            declared: 0,
        }
    }

    pub fn with_imports(mut self, handler: &'a mut dyn ImportHandler) -> Self {
        self.imports = Some(handler);
        self
    }

    /// Walk the tree and register its declarations. Returns how many were seen.
    pub fn scan(mut self, tree: &SyntaxTree) -> usize {
        tracing::debug!(unit = %self.unit, secondary = self.secondary, "scanning declarations");
        self.visit(&tree.root, ScopeContext::module());
        self.declared
    }

    fn visit<'t>(&mut self, node: &'t SyntaxNode, ctx: ScopeContext<'t>) {
        match &node.kind {
            NodeKind::Import { module, members } if !self.secondary => {
                if let Some(handler) = self.imports.as_deref_mut() {
                    handler.on_import(module, members, &self.path, self.graph);
                }
            }
            NodeKind::Type { name } => {
                self.declare(NodeId::new(&self.unit, name.as_str(), CONSTRUCTOR), None);
            }
            NodeKind::Callable { name } => {
                let decl = DeclRef { tree: self.tree, node: node.id };
                self.declare(NodeId::new(&self.unit, ctx.class_name(), name.as_str()), Some(decl));
            }
            _ => {}
        }

        let inner = ctx.enter(node);
        for child in &node.children {
            self.visit(child, inner);
        }
    }

    fn declare(&mut self, id: NodeId, decl: Option<DeclRef>) {
        let mut node = CallableNode::new(id)
            .with_secondary(self.secondary)
            .with_path(&self.path);
        if let Some(decl) = decl {
            node = node.with_decl(decl);
        }
        self.graph.add(node);
        self.declared += 1;
    }
}
