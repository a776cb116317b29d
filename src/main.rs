//! Spaghetti CLI - graph function-level Python dependencies

use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use spaghetti::config::{self, SpaghettiConfig};
use spaghetti::export::{self, DisplayMode, OutputFormat};
use spaghetti::ui;
use spaghetti::Search;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "spaghetti")]
#[command(version)]
#[command(about = "Graph function level Python dependencies to understand and fix spaghetti code")]
#[command(long_about = r#"
Spaghetti builds a function-level call graph for Python source:
  • Lists the dependents (or dependencies) of every function and method
  • Follows imports one hop so calls into sibling modules resolve
  • Measures how connected the code is

Example usage:
  spaghetti src/
  spaghetti --inverse --built-ins app.py utils.py
  spaghetti --format dot src/ > calls.dot
"#)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    map: MapArgs,
}

#[derive(Args)]
struct MapArgs {
    /// Files and directories to examine
    #[arg(value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// List dependencies instead of dependents
    #[arg(short, long)]
    inverse: bool,

    /// Also graph calls to Python's built-in functions
    #[arg(short = 'b', long = "built-ins")]
    built_ins: bool,

    /// Remove instruction text and formatting
    #[arg(short, long)]
    raw: bool,

    /// Print measurements of how connected the functions are
    #[arg(short, long)]
    connectivity: bool,

    /// Suppress non-critical errors
    #[arg(short, long)]
    quiet: bool,

    /// Show module paths relative to the current directory
    #[arg(short, long, conflicts_with = "simple")]
    long: bool,

    /// Show only class and function names
    #[arg(short, long)]
    simple: bool,

    /// Output format (text, json, dot)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Root that import prefixes are relative to
    #[arg(long)]
    root: Option<PathBuf>,

    /// Extra directory to search for imported modules
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Gitignore-style pattern to skip while walking directories
    #[arg(long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,

    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default spaghetti.toml
    Init {
        /// Path to the config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { config, force }) => {
            init_logging(log_level(cli.verbose, false));
            run_init(config, force)
        }
        None => run_map(cli.map, cli.verbose),
    }
}

fn log_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_init(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config::default_config_path);
    config::write_config(&path, &SpaghettiConfig::default(), force)?;
    ui::success(&format!("Wrote {}", path.display()));
    Ok(())
}

fn run_map(args: MapArgs, verbose: bool) -> anyhow::Result<()> {
    let mut settings = config::load_config(args.config.as_deref())?.unwrap_or_default();
    merge_flags(&mut settings, &args);
    // quiet from the config file silences diagnostics too
    init_logging(log_level(verbose, settings.quiet));

    let mut paths = args.paths.clone();
    if paths.is_empty() {
        paths.push(prompt_path()?);
    }

    let search_options = settings.search_options();
    let report_options = settings.report_options();

    let started = Instant::now();
    let spinner = ui::Spinner::new("Mapping calls...");
    let search = Search::run(&paths, &search_options);
    spinner.set_message("Rendering report...");
    let report = export::render(&search, &report_options)?;
    spinner.finish();

    if search.searched_files().is_empty() && !settings.quiet {
        ui::warn("No Python files found in the given paths");
    }
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", report)?;

    if verbose {
        let stats = search.graph().stats();
        ui::info("Graph", &stats.to_string().replace('\n', " "));
        ui::timing(started.elapsed(), search.searched_files().len(), stats.nodes, stats.edges);
    }
    Ok(())
}

/// Command-line flags win over the config file. Flags only ever switch
/// behavior on, so an unset flag leaves the file's value alone.
fn merge_flags(settings: &mut SpaghettiConfig, args: &MapArgs) {
    settings.inverse |= args.inverse;
    settings.include_builtins |= args.built_ins;
    settings.raw |= args.raw;
    settings.connectivity |= args.connectivity;
    settings.quiet |= args.quiet;
    if args.long {
        settings.display = DisplayMode::Long;
    } else if args.simple {
        settings.display = DisplayMode::Simple;
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(root) = &args.root {
        settings.root = Some(root.display().to_string());
    }
    settings
        .search_paths
        .extend(args.search_paths.iter().map(|p| p.display().to_string()));
    settings.exclude.extend(args.excludes.iter().cloned());
}

fn prompt_path() -> anyhow::Result<PathBuf> {
    eprint!("Filename to examine: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        anyhow::bail!("no path given");
    }
    Ok(PathBuf::from(line))
}
