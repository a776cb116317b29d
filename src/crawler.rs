//! Import crawler
//!
//! Follows the imports of directly requested units one hop deep. A module
//! reference is resolved to a source file by trying the bare dotted name, then
//! the same name prefixed with the importing file's enclosing directories,
//! innermost first, against every search root. Import statements do not say
//! which ancestor package they are relative to, so each plausible prefix is
//! tried in turn.
//!
//! Resolved modules are parsed and scanned as secondary units; nothing they
//! import is followed. Failures are recorded and never abort the scan.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use crate::adapter::AdapterRegistry;
use crate::graph::CallGraph;
use crate::scanner::{DeclarationScanner, ImportHandler};
use crate::search::Failure;
use crate::{Error, Result};

/// A module reference that resolved to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Dotted name that resolved, including any directory prefix
    pub name: String,
    pub path: PathBuf,
}

enum Probe {
    Source(PathBuf),
    NoSource(PathBuf),
    Missing,
}

/// Maps dotted module names to source files.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    search_paths: Vec<PathBuf>,
}

impl ModuleResolver {
    /// Resolver whose directory prefixes are taken relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            search_paths: Vec::new(),
        }
    }

    /// Additional roots tried after `root`, in order
    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }

    /// Dotted names to try for `module` imported from `importing`, in order,
    /// together with the root the prefixes are relative to.
    pub fn candidates(&self, module: &str, importing: &Path) -> (PathBuf, Vec<String>) {
        let dir = importing.parent().unwrap_or(Path::new(""));
        let (base, relative) = match dir.strip_prefix(&self.root) {
            Ok(rel) => (self.root.clone(), rel.to_path_buf()),
            Err(_) => {
                // outside the root: prefixes are taken from the filesystem root
                let fs_root = dir.ancestors().last().unwrap_or(Path::new("")).to_path_buf();
                let rel = dir.strip_prefix(&fs_root).unwrap_or(dir).to_path_buf();
                (fs_root, rel)
            }
        };

        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        let names = (0..=segments.len())
            .map(|taken| {
                let prefix = &segments[segments.len() - taken..];
                if prefix.is_empty() {
                    module.to_string()
                } else {
                    format!("{}.{}", prefix.join("."), module)
                }
            })
            .collect();
        (base, names)
    }

    /// Resolve `module` as imported from the file `importing`.
    ///
    /// Fails with [`Error::UnresolvedImport`] once every prefix and root is
    /// exhausted, or [`Error::NoLoadableSource`] when the target exists but
    /// has no Python source to read.
    pub fn resolve(&self, module: &str, importing: &Path) -> Result<ResolvedModule> {
        let (base, names) = self.candidates(module, importing);
        let mut roots = vec![base];
        for path in &self.search_paths {
            if !roots.contains(path) {
                roots.push(path.clone());
            }
        }

        for name in names {
            for root in &roots {
                tracing::debug!(module, candidate = %name, root = %root.display(), "trying import");
                match probe(root, &name) {
                    Probe::Source(path) => return Ok(ResolvedModule { name, path }),
                    Probe::NoSource(path) => {
                        return Err(Error::NoLoadableSource { module: module.to_string(), path });
                    }
                    Probe::Missing => {}
                }
            }
        }
        Err(Error::UnresolvedImport(module.to_string()))
    }
}

fn probe(root: &Path, dotted: &str) -> Probe {
    let mut target = root.to_path_buf();
    for part in dotted.split('.') {
        target.push(part);
    }

    let file = target.with_extension("py");
    if file.is_file() {
        return Probe::Source(file);
    }
    let package = target.join("__init__.py");
    if package.is_file() {
        return Probe::Source(package);
    }
    if target.is_dir() {
        return Probe::NoSource(target);
    }
    for ext in ["so", "pyd"] {
        let compiled = target.with_extension(ext);
        if compiled.is_file() {
            return Probe::NoSource(compiled);
        }
    }
    Probe::Missing
}

/// Import handler used while scanning one requested unit.
///
/// `visited` is shared across units so each module file is parsed at most
/// once; the value records whether it loaded.
pub struct ImportCrawler<'r> {
    registry: &'r AdapterRegistry,
    resolver: &'r ModuleResolver,
    visited: &'r mut HashMap<PathBuf, bool>,
    crawled: BTreeSet<String>,
    unresolved: BTreeSet<String>,
    failures: Vec<Failure>,
}

impl<'r> ImportCrawler<'r> {
    pub fn new(
        registry: &'r AdapterRegistry,
        resolver: &'r ModuleResolver,
        visited: &'r mut HashMap<PathBuf, bool>,
    ) -> Self {
        Self {
            registry,
            resolver,
            visited,
            crawled: BTreeSet::new(),
            unresolved: BTreeSet::new(),
            failures: Vec::new(),
        }
    }

    pub fn crawled(&self) -> &BTreeSet<String> {
        &self.crawled
    }

    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    /// Consume the crawler, returning crawled names, unresolved names and
    /// modules that resolved but could not be loaded.
    pub fn finish(self) -> (BTreeSet<String>, BTreeSet<String>, Vec<Failure>) {
        (self.crawled, self.unresolved, self.failures)
    }

    fn load_secondary(&mut self, module: &ResolvedModule, graph: &mut CallGraph) -> bool {
        if let Some(&loaded) = self.visited.get(&module.path) {
            return loaded;
        }
        let loaded = match self.registry.load(&module.path) {
            Ok(tree) => {
                DeclarationScanner::secondary(graph, &tree).scan(&tree);
                true
            }
            Err(e) => {
                tracing::warn!("Skipping import {}: {}", module.name, e);
                self.failures.push(Failure::new(&module.path, e.to_string()));
                false
            }
        };
        self.visited.insert(module.path.clone(), loaded);
        loaded
    }

    fn crawl(&mut self, resolved: ResolvedModule, written: &str, graph: &mut CallGraph) {
        if self.load_secondary(&resolved, graph) {
            tracing::debug!(module = written, path = %resolved.path.display(), "crawled import");
            self.crawled.insert(resolved.name);
        } else {
            self.unresolved.insert(written.to_string());
        }
    }
}

impl ImportHandler for ImportCrawler<'_> {
    /// A `from a.b import c` first tries `a.b.c` as a submodule and falls
    /// back to `a.b` when any member is not one. Members of a bare relative
    /// import that do not resolve are names, not modules, and are dropped.
    fn on_import(&mut self, module: &str, members: &[String], importing: &Path, graph: &mut CallGraph) {
        let mut whole = members.is_empty();
        for member in members {
            let dotted = if module.is_empty() {
                member.clone()
            } else {
                format!("{}.{}", module, member)
            };
            match self.resolver.resolve(&dotted, importing) {
                Ok(resolved) => self.crawl(resolved, &dotted, graph),
                Err(e) => {
                    tracing::debug!("{}", e);
                    whole = true;
                }
            }
        }
        if !whole || module.is_empty() {
            return;
        }
        match self.resolver.resolve(module, importing) {
            Ok(resolved) => self.crawl(resolved, module, graph),
            Err(e) => {
                tracing::debug!("{}", e);
                self.unresolved.insert(module.to_string());
            }
        }
    }
}
