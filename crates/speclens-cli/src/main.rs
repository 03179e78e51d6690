mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, spec::SpecSubcommand, task::TaskSubcommand,
    trace::TraceSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "speclens",
    about = "Parse, validate and cross-reference markdown spec documents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .speclens/ or .git/)
    #[arg(long, global = true, env = "SPECLENS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize speclens in the current project
    Init {
        /// Project name (default: root directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Create, list and inspect specs
    Spec {
        #[command(subcommand)]
        subcommand: SpecSubcommand,
    },

    /// Read and update tasks in a spec's tasks.md
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Check a spec's tasks.md for structural problems
    Validate {
        /// Spec name
        spec: String,
    },

    /// Cross-reference requirements and tasks
    Trace {
        #[command(subcommand)]
        subcommand: TraceSubcommand,
    },

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    tracing::debug!(root = %root.display(), "resolved project root");

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref(), cli.json),
        Commands::Spec { subcommand } => cmd::spec::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Validate { spec } => cmd::validate::run(&root, &spec, cli.json),
        Commands::Trace { subcommand } => cmd::trace::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
