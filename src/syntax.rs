//! Language-neutral syntax tree consumed by the scanner and the resolver.
//!
//! Front-end adapters lower their parser's concrete tree into this shape,
//! keeping only the four kinds the call graph cares about. Everything else is
//! transparent: its relevant descendants hang off the nearest relevant ancestor.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TREE: AtomicU32 = AtomicU32::new(0);

/// Process-unique identifier of a parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub u32);

impl TreeId {
    pub fn next() -> Self {
        Self(NEXT_TREE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifier of a node, unique within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntaxId(pub u32);

/// Receiver of a call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// `f()`
    None,
    /// `obj.f()`
    Named(String),
    /// `make().f()`, `a.b.f()`, `xs[0].f()`
    Unnamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a unit
    Module,
    /// `import a.b` has no members; `from a.b import c, d` lists `c` and `d`.
    /// A bare relative `from . import c` has an empty module.
    Import { module: String, members: Vec<String> },
    /// Class-like declaration
    Type { name: String },
    /// Function-like declaration, nested or not
    Callable { name: String },
    /// Call expression. `callee` is `None` when the called expression has no static name.
    Call { callee: Option<String>, receiver: Receiver },
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub id: SyntaxId,
    pub kind: NodeKind,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &SyntaxNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// A parsed unit.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub id: TreeId,
    pub path: PathBuf,
    pub root: SyntaxNode,
}

impl SyntaxTree {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Assigns node ids while a tree is being built.
///
/// Used by adapters while lowering and by tests that describe trees by hand.
pub struct TreeBuilder {
    next: u32,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn node(&mut self, kind: NodeKind, children: Vec<SyntaxNode>) -> SyntaxNode {
        let id = SyntaxId(self.next);
        self.next += 1;
        SyntaxNode { id, kind, children }
    }

    pub fn import(&mut self, module: &str) -> SyntaxNode {
        self.import_from(module, &[])
    }

    pub fn import_from(&mut self, module: &str, members: &[&str]) -> SyntaxNode {
        let members = members.iter().map(|m| m.to_string()).collect();
        self.node(NodeKind::Import { module: module.to_string(), members }, Vec::new())
    }

    pub fn class(&mut self, name: &str, body: Vec<SyntaxNode>) -> SyntaxNode {
        self.node(NodeKind::Type { name: name.to_string() }, body)
    }

    pub fn function(&mut self, name: &str, body: Vec<SyntaxNode>) -> SyntaxNode {
        self.node(NodeKind::Callable { name: name.to_string() }, body)
    }

    pub fn call(&mut self, callee: &str) -> SyntaxNode {
        self.node(
            NodeKind::Call { callee: Some(callee.to_string()), receiver: Receiver::None },
            Vec::new(),
        )
    }

    pub fn method_call(&mut self, receiver: &str, callee: &str) -> SyntaxNode {
        self.node(
            NodeKind::Call {
                callee: Some(callee.to_string()),
                receiver: Receiver::Named(receiver.to_string()),
            },
            Vec::new(),
        )
    }

    pub fn finish(self, path: impl Into<PathBuf>, children: Vec<SyntaxNode>) -> SyntaxTree {
        SyntaxTree {
            id: TreeId::next(),
            path: path.into(),
            root: SyntaxNode { id: SyntaxId(0), kind: NodeKind::Module, children },
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
