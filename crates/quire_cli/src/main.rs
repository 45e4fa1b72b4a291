//! Quire CLI: the command-line interface for the quire build orchestrator.
//!
//! `quire build` (the default) rebuilds stale units, `quire clean` removes
//! generated outputs, `quire modules`, `quire files` and `quire info` inspect
//! the project, and `quire discover`, `quire deps` and `quire init-index`
//! write the discovery index and declared-dependency listings.

#![warn(missing_docs)]

mod build;
mod clean;
mod index;
mod list;
mod logging;
mod pipeline;
mod report;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Quire: incremental builds for trees of LaTeX documents.
#[derive(Parser, Debug)]
#[command(name = "quire", version, about = "Incremental LaTeX build orchestrator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `quire.toml` configuration file or project directory.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run; `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build stale units.
    Build(BuildArgs),
    /// Remove generated outputs.
    Clean(CleanArgs),
    /// List modules with their codes and unit counts.
    Modules,
    /// List main units.
    Files(FilesArgs),
    /// Show project configuration and counts.
    Info,
    /// Write the discovery index.
    Discover,
    /// Write declared-dependency listings for every main unit.
    Deps,
    /// Write the discovery index, then the dependency listings.
    InitIndex,
}

/// Arguments for the `quire build` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Module name, code, numeric code or name substring. Repeatable.
    #[arg(short = 'm', long = "module", value_name = "PATTERN")]
    pub modules: Vec<String>,

    /// Inclusive range of numeric module codes.
    #[arg(short, long, num_args = 2, value_names = ["START", "END"], conflicts_with = "modules")]
    pub range: Option<Vec<u32>>,

    /// Rebuild every selected unit, ignoring the cache.
    #[arg(short, long)]
    pub force: bool,

    /// Number of parallel jobs.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Build main units in a configured variant.
    #[arg(long, value_name = "NAME")]
    pub mode: Option<String>,

    /// Read units from the discovery index instead of walking the tree.
    #[arg(long)]
    pub from_index: bool,
}

/// Arguments for the `quire clean` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct CleanArgs {
    /// Remove build, logs, artifacts and the cache.
    #[arg(long)]
    pub all: bool,

    /// Remove the build tree.
    #[arg(long)]
    pub build: bool,

    /// Remove the log tree.
    #[arg(long)]
    pub logs: bool,

    /// Remove the artifact tree.
    #[arg(long)]
    pub artifacts: bool,

    /// Remove one module's outputs from every tree.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["all", "build", "logs", "artifacts"])]
    pub module: Option<String>,
}

/// Arguments for the `quire files` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct FilesArgs {
    /// Restrict the listing to matching modules. Repeatable.
    #[arg(short = 'm', long = "module", value_name = "PATTERN")]
    pub modules: Vec<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let command = cli
        .command
        .unwrap_or_else(|| Command::Build(BuildArgs::default()));

    let result = match command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
        Command::Modules => list::modules(&global),
        Command::Files(ref args) => list::files(args, &global),
        Command::Info => list::info(&global),
        Command::Discover => index::discover(&global),
        Command::Deps => index::deps(&global),
        Command::InitIndex => index::init_index(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
