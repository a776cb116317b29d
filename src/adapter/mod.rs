//! Language Adapter Framework
//!
//! Each language provides a Tree-sitter grammar and lowers its concrete tree
//! into the neutral [`crate::syntax::SyntaxTree`]. The graph engine never sees
//! language-specific syntax.

pub mod framework;
pub mod python;

pub use framework::{default_registry, AdapterRegistry, LanguageAdapter};
pub use python::PythonAdapter;
