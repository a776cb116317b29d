//! # Spaghetti - function-level call graphs for Python
//!
//! Builds a directed call graph for a body of Python source:
//! - Every declared function, method and implicit constructor becomes a node
//! - Imports are followed one hop so callees in sibling modules resolve
//! - Call expressions are matched to declarations with a best-effort heuristic
//! - The assembled graph answers dependents/dependencies queries and feeds
//!   connectivity analytics

pub mod node;
pub mod syntax;
pub mod adapter;
pub mod scope;
pub mod builtins;
pub mod graph;
pub mod scanner;
pub mod crawler;
pub mod resolver;
pub mod walk;
pub mod search;
pub mod analysis;
pub mod export;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use node::{CallableNode, NodeId, NodeIdx};
pub use graph::{CallGraph, Direction};
pub use search::{Search, SearchOptions};

use std::path::PathBuf;

/// Result type alias for Spaghetti operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Spaghetti operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read {}: {source}", path.display())]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed syntax in {}", path.display())]
    MalformedSyntax { path: PathBuf },

    #[error("Could not find {}", .0.display())]
    InvalidInputPath(PathBuf),

    #[error("Unresolved import: {0}")]
    UnresolvedImport(String),

    #[error("Import {module} at {} exposes no loadable source", path.display())]
    NoLoadableSource { module: String, path: PathBuf },

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
