//! Core adapter framework
//!
//! Defines the trait front-end parsers implement and the registry that picks
//! one by file extension.

use crate::syntax::SyntaxTree;
use crate::{Error, Result};
use std::path::Path;

/// Trait for language adapters
///
/// Each language adapter is responsible for:
/// 1. Identifying files it can parse
/// 2. Parsing source text with its grammar
/// 3. Lowering the concrete tree into a [`SyntaxTree`]
pub trait LanguageAdapter: Send + Sync {
    /// Get the language name (for display)
    fn language_name(&self) -> &str;

    /// Get file extensions this adapter handles
    fn file_extensions(&self) -> &[&str];

    /// Check if this adapter can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.file_extensions().contains(&ext)
        } else {
            false
        }
    }

    /// Parse source text into a syntax tree.
    ///
    /// Fails with [`Error::MalformedSyntax`] when the grammar reports errors.
    fn parse(&self, path: &Path, content: &str) -> Result<SyntaxTree>;
}

/// Registry of language adapters
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter
    pub fn register(&mut self, adapter: impl LanguageAdapter + 'static) {
        self.adapters.push(Box::new(adapter));
    }

    /// Find an adapter for a file
    pub fn find_adapter(&self, path: &Path) -> Option<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|a| a.can_handle(path))
            .map(|a| a.as_ref())
    }

    /// Extensions handled by any registered adapter
    pub fn extensions(&self) -> Vec<&str> {
        self.adapters
            .iter()
            .flat_map(|a| a.file_extensions().iter().copied())
            .collect()
    }

    /// Read and parse a unit from disk using the appropriate adapter
    pub fn load(&self, path: &Path) -> Result<SyntaxTree> {
        let adapter = self
            .find_adapter(path)
            .ok_or_else(|| Error::Adapter(format!("no adapter for {}", path.display())))?;
        let content = std::fs::read_to_string(path).map_err(|source| Error::UnreadableSource {
            path: path.to_path_buf(),
            source,
        })?;
        adapter.parse(path, &content)
    }
}

/// Create a default registry with all built-in adapters
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(super::python::PythonAdapter::new());
    registry
}
