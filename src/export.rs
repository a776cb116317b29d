//! Report rendering: text listing, JSON and Graphviz DOT.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::analysis::{self, ConnectivityReport};
use crate::graph::{CallGraph, Direction, RenderedNode};
use crate::node::NodeId;
use crate::resolver::AmbiguousCall;
use crate::search::{Failure, InputReport, Search};
use crate::ui::table::metrics_table;
use crate::{Error, Result};

/// Column width of the text listing.
const COLUMN: usize = 40;

/// How node labels are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// `unit:scope.name`
    #[default]
    Normal,
    /// Declaring path relative to the working directory in place of the unit
    Long,
    /// `scope.name`
    Simple,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Dot,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "dot" => Ok(OutputFormat::Dot),
            other => Err(Error::Config(format!("unknown output format: {}", other))),
        }
    }
}

/// Presentation options.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub direction: Direction,
    /// Only `node edges` lines
    pub raw: bool,
    /// Leave out unresolved imports, ambiguous calls and skipped units
    pub quiet: bool,
    pub connectivity: bool,
    pub display: DisplayMode,
    pub format: OutputFormat,
    /// Base for `long` labels. Defaults to the working directory.
    pub cwd: Option<PathBuf>,
}

/// Writes node labels in the selected display mode.
pub struct Labeler<'g> {
    graph: &'g CallGraph,
    mode: DisplayMode,
    cwd: PathBuf,
}

impl<'g> Labeler<'g> {
    pub fn new(graph: &'g CallGraph, mode: DisplayMode, cwd: Option<&Path>) -> Self {
        let cwd = match cwd {
            Some(cwd) => cwd.to_path_buf(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        Self { graph, mode, cwd }
    }

    pub fn label(&self, id: &NodeId) -> String {
        match self.mode {
            DisplayMode::Normal => id.to_string(),
            DisplayMode::Simple => id.short(),
            DisplayMode::Long => {
                let path = self
                    .graph
                    .find(id)
                    .and_then(|idx| self.graph.get(idx).path());
                match path {
                    Some(path) if !id.is_placeholder() => {
                        let shown = path.strip_prefix(&self.cwd).unwrap_or(path.as_path());
                        format!("{}:{}", shown.display(), id.short())
                    }
                    _ => id.to_string(),
                }
            }
        }
    }

    fn edges(&self, edges: &[NodeId]) -> String {
        edges
            .iter()
            .map(|e| format!("({})", self.label(e)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render a finished search in the selected format.
pub fn render(search: &Search, opts: &ReportOptions) -> Result<String> {
    match opts.format {
        OutputFormat::Text => Ok(to_text(search, opts)),
        OutputFormat::Json => to_json(search, opts),
        OutputFormat::Dot => Ok(to_dot(search.graph(), opts)),
    }
}

pub fn to_text(search: &Search, opts: &ReportOptions) -> String {
    let graph = search.graph();
    let labels = Labeler::new(graph, opts.display, opts.cwd.as_deref());
    let rendered = search.render(opts.direction);

    if opts.raw {
        return rendered
            .iter()
            .map(|r| format!("{} {}", labels.label(&r.node), labels.edges(&r.edges)).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut lines = Vec::new();
    let searched = !search.searched_files().is_empty() || !search.searched_directories().is_empty();
    if searched {
        let crawled = search.crawled_imports();
        if !crawled.is_empty() {
            lines.push(format!("Also crawled these imports: {}", join(&crawled)));
        }
        if !opts.quiet {
            let unresolved = search.unresolved_imports();
            if !unresolved.is_empty() {
                lines.push(format!("Failed to crawl these imports: {}", join(&unresolved)));
            }
            if !search.ambiguous_calls().is_empty() {
                let calls: BTreeSet<String> = search
                    .ambiguous_calls()
                    .iter()
                    .map(|c| format!("{} -> {}", labels.label(&c.caller), c.callee))
                    .collect();
                lines.push(format!("Could not definitively resolve: {}", join(&calls)));
            }
        }
    }
    if !opts.quiet {
        for failure in search.failures() {
            lines.push(format!("Skipped {}: {}", failure.path.display(), failure.reason));
        }
    }

    if opts.connectivity {
        let report = analysis::analyze(graph, opts.direction);
        lines.push(String::new());
        lines.push(metrics_table(&report.rows()));
    }

    lines.push(String::new());
    lines.push(format!(
        "{:<width$} {:<width$}",
        "Function Name",
        opts.direction.label(),
        width = COLUMN
    ));
    lines.push(String::new());
    for r in &rendered {
        lines.push(
            format!(
                "{:<width$} {:<width$}",
                labels.label(&r.node),
                labels.edges(&r.edges),
                width = COLUMN
            )
            .trim_end()
            .to_string(),
        );
    }
    lines.join("\n")
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[derive(Serialize)]
struct JsonReport<'s> {
    direction: Direction,
    searched_files: &'s [PathBuf],
    searched_directories: &'s [PathBuf],
    inputs: &'s [InputReport],
    crawled_imports: BTreeSet<String>,
    unresolved_imports: BTreeSet<String>,
    ambiguous_calls: &'s [AmbiguousCall],
    failures: &'s [Failure],
    #[serde(skip_serializing_if = "Option::is_none")]
    connectivity: Option<ConnectivityReport>,
    nodes: Vec<RenderedNode>,
}

pub fn to_json(search: &Search, opts: &ReportOptions) -> Result<String> {
    let report = JsonReport {
        direction: opts.direction,
        searched_files: search.searched_files(),
        searched_directories: search.searched_directories(),
        inputs: search.inputs(),
        crawled_imports: search.crawled_imports(),
        unresolved_imports: search.unresolved_imports(),
        ambiguous_calls: search.ambiguous_calls(),
        failures: search.failures(),
        connectivity: opts
            .connectivity
            .then(|| analysis::analyze(search.graph(), opts.direction)),
        nodes: search.render(opts.direction),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Graphviz digraph of every visible node. Arrows run from caller to
/// callee, reversed for [`Direction::Dependencies`].
pub fn to_dot(graph: &CallGraph, opts: &ReportOptions) -> String {
    let labels = Labeler::new(graph, opts.display, opts.cwd.as_deref());
    let rendered = graph.render(Direction::Dependencies, true);
    let mut lines = Vec::new();

    lines.push("digraph CallGraph {".to_string());
    lines.push("    rankdir=LR;".to_string());
    lines.push("    node [shape=box, fontname=\"Helvetica\", fontsize=12];".to_string());
    lines.push("".to_string());

    for r in &rendered {
        let style = if r.node.is_placeholder() {
            "style=\"filled,dashed\", fillcolor=\"#e6e6e6\""
        } else if r.secondary {
            "style=\"dashed\""
        } else {
            "style=\"solid\""
        };
        lines.push(format!(
            "    \"{}\" [label=\"{}\", {}];",
            escape_label(&r.node.to_string()),
            escape_label(&labels.label(&r.node)),
            style
        ));
    }

    lines.push("".to_string());

    for r in &rendered {
        for callee in &r.edges {
            let (from, to) = match opts.direction {
                Direction::Dependents => (&r.node, callee),
                Direction::Dependencies => (callee, &r.node),
            };
            lines.push(format!(
                "    \"{}\" -> \"{}\";",
                escape_label(&from.to_string()),
                escape_label(&to.to_string())
            ));
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
