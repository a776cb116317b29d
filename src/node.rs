//! Node identity model
//!
//! A callable is identified by the triple `(unit, scope, name)`:
//! - `unit`: the declaring module name (`tester1` for `tester1.py`)
//! - `scope`: the enclosing class name, empty at module level
//! - `name`: the function or method name
//!
//! Equality and hashing derive from the triple alone, so the same declaration
//! reached from two scan passes collapses into a single graph node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::syntax::{SyntaxId, TreeId};

/// Name given to the implicit constructor registered for every class.
pub const CONSTRUCTOR: &str = "__init__";

/// Name given to the caller of calls made outside any function body.
pub const TOP_LEVEL: &str = "__main__";

/// Unit and scope of placeholder nodes standing in for built-in callees.
pub const BUILTIN_UNIT: &str = "System";
pub const BUILTIN_SCOPE: &str = "Builtins";

/// Unit and scope of placeholder nodes standing in for unmatched callees.
pub const UNKNOWN_UNIT: &str = "Unknown";
pub const UNKNOWN_SCOPE: &str = "Unknown";

/// Identity triple of a callable.
///
/// Field order is the sort order used for rendering: unit, then scope, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub unit: String,
    pub scope: String,
    pub name: String,
}

impl NodeId {
    pub fn new(unit: impl Into<String>, scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Placeholder for a call to a built-in that no declaration shadows.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(BUILTIN_UNIT, BUILTIN_SCOPE, name)
    }

    /// Placeholder for a call that matched no declaration.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(UNKNOWN_UNIT, UNKNOWN_SCOPE, name)
    }

    /// True if `candidate` might be how source code refers to this node's home.
    ///
    /// Coarse on purpose: a class named like a module matches both.
    pub fn is_identifier(&self, candidate: &str) -> bool {
        self.unit == candidate || self.scope == candidate
    }

    pub fn is_placeholder(&self) -> bool {
        (self.unit == BUILTIN_UNIT && self.scope == BUILTIN_SCOPE)
            || (self.unit == UNKNOWN_UNIT && self.scope == UNKNOWN_SCOPE)
    }

    /// `scope.name` without the declaring unit.
    pub fn short(&self) -> String {
        format!("{}.{}", self.scope, self.name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.unit, self.scope, self.name)
    }
}

/// Index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Back-reference to the syntax node that declared a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub tree: TreeId,
    pub node: SyntaxId,
}

/// A function, method or implicit constructor in the call graph.
#[derive(Debug, Clone)]
pub struct CallableNode {
    id: NodeId,
    secondary: bool,
    decl: Option<DeclRef>,
    path: Option<PathBuf>,
    /// What this node calls
    pub(crate) dependencies: BTreeSet<NodeIdx>,
    /// What calls this node
    pub(crate) dependents: BTreeSet<NodeIdx>,
}

impl CallableNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            secondary: false,
            decl: None,
            path: None,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    /// Mark as discovered through import-following
    pub fn with_secondary(mut self, secondary: bool) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn with_decl(mut self, decl: DeclRef) -> Self {
        self.decl = Some(decl);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn is_secondary(&self) -> bool {
        self.secondary
    }

    pub fn decl(&self) -> Option<DeclRef> {
        self.decl
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn dependencies(&self) -> &BTreeSet<NodeIdx> {
        &self.dependencies
    }

    pub fn dependents(&self) -> &BTreeSet<NodeIdx> {
        &self.dependents
    }

    /// Secondary and edge-less. Derived on every call since a later edge un-hides the node.
    pub fn is_hidden(&self) -> bool {
        self.secondary && self.dependencies.is_empty() && self.dependents.is_empty()
    }

    pub fn in_degree(&self) -> usize {
        self.dependents.len()
    }

    pub fn out_degree(&self) -> usize {
        self.dependencies.len()
    }

    /// Fold attributes of a later copy with the same identity into this one.
    pub(crate) fn absorb(&mut self, other: &CallableNode) {
        if !other.secondary {
            self.secondary = false;
        }
        if self.decl.is_none() {
            self.decl = other.decl;
        }
        if self.path.is_none() {
            self.path = other.path.clone();
        }
    }
}

impl PartialEq for CallableNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CallableNode {}

impl std::hash::Hash for CallableNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
