//! Search orchestration
//!
//! Runs the two phases over every requested path:
//! 1. Declaration scan of each requested unit, following its imports one hop.
//!    Each unit is scanned into its own partial graph and merged.
//! 2. Edge resolution over each requested unit, once every declaration from
//!    phase 1 is in the graph.
//!
//! Nothing that goes wrong with a single path or unit stops the run; failures
//! are collected and reported alongside the graph.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::adapter::{default_registry, AdapterRegistry};
use crate::builtins::Builtins;
use crate::crawler::{ImportCrawler, ModuleResolver};
use crate::graph::{CallGraph, Direction, RenderedNode};
use crate::resolver::{AmbiguousCall, EdgeResolver};
use crate::scanner::DeclarationScanner;
use crate::syntax::SyntaxTree;
use crate::walk;
use crate::Error;

/// Library-side options for a search run.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Create placeholder nodes and edges for built-in callees
    pub include_builtins: bool,
    /// Names treated as built-in on top of the pinned table
    pub extra_builtins: Vec<String>,
    /// Root import prefixes are taken relative to. Defaults to the working directory.
    pub root: Option<PathBuf>,
    /// Extra roots searched for imported modules
    pub search_paths: Vec<PathBuf>,
    /// Gitignore-style patterns skipped while walking directories
    pub exclude: Vec<String>,
}

/// A path or unit that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

impl Failure {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}

/// Import outcome for one requested path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputReport {
    pub path: PathBuf,
    pub crawled_imports: BTreeSet<String>,
    pub unresolved_imports: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
struct UnitImports {
    crawled: BTreeSet<String>,
    unresolved: BTreeSet<String>,
}

pub struct Search {
    graph: CallGraph,
    searched_files: Vec<PathBuf>,
    searched_directories: Vec<PathBuf>,
    inputs: Vec<InputReport>,
    failures: Vec<Failure>,
    ambiguous_calls: Vec<AmbiguousCall>,
}

impl Search {
    /// Build the call graph for `paths`.
    pub fn run<P: AsRef<Path>>(paths: &[P], options: &SearchOptions) -> Self {
        Self::run_with(&default_registry(), paths, options)
    }

    /// Build the call graph for `paths` using the given front-ends.
    pub fn run_with<P: AsRef<Path>>(
        registry: &AdapterRegistry,
        paths: &[P],
        options: &SearchOptions,
    ) -> Self {
        let root = match &options.root {
            Some(root) => absolute(root),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let resolver = ModuleResolver::new(root)
            .with_search_paths(options.search_paths.iter().map(|p| absolute(p)));
        let builtins = Builtins::python().with_extra(options.extra_builtins.iter().cloned());

        let mut search = Self {
            graph: CallGraph::new(),
            searched_files: Vec::new(),
            searched_directories: Vec::new(),
            inputs: Vec::new(),
            failures: Vec::new(),
            ambiguous_calls: Vec::new(),
        };

        tracing::info!("Scanning declarations");
        let mut visited: HashMap<PathBuf, bool> = HashMap::new();
        let mut units: BTreeMap<PathBuf, UnitImports> = BTreeMap::new();
        let mut trees: Vec<SyntaxTree> = Vec::new();

        for given in paths {
            let given = given.as_ref();
            let Some(files) = search.expand(registry, given, &options.exclude) else {
                continue;
            };

            let mut report = InputReport { path: given.to_path_buf(), ..Default::default() };
            for file in files {
                if !units.contains_key(&file) {
                    let imports = search.scan_unit(registry, &resolver, &mut visited, &file, &mut trees);
                    units.insert(file.clone(), imports);
                }
                if let Some(imports) = units.get(&file) {
                    report.crawled_imports.extend(imports.crawled.iter().cloned());
                    report.unresolved_imports.extend(imports.unresolved.iter().cloned());
                }
            }
            search.inputs.push(report);
        }

        tracing::info!("Resolving calls in {} units", trees.len());
        let edges = EdgeResolver::new(&builtins, options.include_builtins);
        for tree in &trees {
            let summary = edges.resolve(tree, &mut search.graph);
            tracing::debug!(
                path = %tree.path().display(),
                edges = summary.edges,
                skipped_builtins = summary.skipped_builtins,
                "resolved"
            );
            search.ambiguous_calls.extend(summary.ambiguous);
        }

        search
    }

    /// Files to scan for a requested path, or `None` after recording a failure.
    fn expand(&mut self, registry: &AdapterRegistry, given: &Path, exclude: &[String]) -> Option<Vec<PathBuf>> {
        let path = absolute(given);
        if path.is_dir() {
            self.searched_directories.push(path.clone());
            return Some(walk::source_files(&path, &registry.extensions(), exclude));
        }

        let file = if registry.find_adapter(&path).is_some() {
            path
        } else {
            let mut name = path.into_os_string();
            name.push(".py");
            PathBuf::from(name)
        };
        if file.is_file() {
            Some(vec![file])
        } else {
            let err = Error::InvalidInputPath(given.to_path_buf());
            tracing::warn!("{}", err);
            self.failures.push(Failure::new(given, err.to_string()));
            None
        }
    }

    fn scan_unit(
        &mut self,
        registry: &AdapterRegistry,
        resolver: &ModuleResolver,
        visited: &mut HashMap<PathBuf, bool>,
        file: &Path,
        trees: &mut Vec<SyntaxTree>,
    ) -> UnitImports {
        self.searched_files.push(file.to_path_buf());
        let tree = match registry.load(file) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", file.display(), e);
                self.failures.push(Failure::new(file, e.to_string()));
                visited.insert(file.to_path_buf(), false);
                return UnitImports::default();
            }
        };

        let mut partial = CallGraph::new();
        let mut crawler = ImportCrawler::new(registry, resolver, visited);
        let declared = DeclarationScanner::primary(&mut partial, &tree)
            .with_imports(&mut crawler)
            .scan(&tree);
        let (crawled, unresolved, failures) = crawler.finish();
        tracing::debug!(path = %file.display(), declared, "scanned");

        self.graph.merge(&partial);
        self.failures.extend(failures);
        visited.insert(file.to_path_buf(), true);
        trees.push(tree);
        UnitImports { crawled, unresolved }
    }

    pub fn graph(&self) -> &CallGraph {
        &self.graph
    }

    /// Sorted, diff-stable view with hidden nodes left out.
    pub fn render(&self, direction: Direction) -> Vec<RenderedNode> {
        self.graph.render(direction, true)
    }

    pub fn searched_files(&self) -> &[PathBuf] {
        &self.searched_files
    }

    pub fn searched_directories(&self) -> &[PathBuf] {
        &self.searched_directories
    }

    /// Per requested path, in request order.
    pub fn inputs(&self) -> &[InputReport] {
        &self.inputs
    }

    /// Union of every input's crawled imports.
    pub fn crawled_imports(&self) -> BTreeSet<String> {
        self.inputs.iter().flat_map(|i| i.crawled_imports.iter().cloned()).collect()
    }

    /// Union of every input's unresolved imports.
    pub fn unresolved_imports(&self) -> BTreeSet<String> {
        self.inputs.iter().flat_map(|i| i.unresolved_imports.iter().cloned()).collect()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn ambiguous_calls(&self) -> &[AmbiguousCall] {
        &self.ambiguous_calls
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
