use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fbexec::commands::{clean, config, history, objective, run, status, ProjectArgs};

#[derive(Parser)]
#[command(name = "fbexec")]
#[command(about = "Run and monitor ForceBalance optimizations", long_about = None)]
#[command(version)]
struct Cli {
    /// Project folder holding the input file
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Optimizer executable (default: ForceBalance)
    #[arg(long, global = true)]
    program: Option<String>,

    /// Project file prefix (default: fb)
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Poll interval in milliseconds once the output stream is exhausted
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show run status, iteration count and work queue progress
    Status,

    /// Run the optimizer in the foreground
    Run,

    /// Remove all outputs of previous runs
    Clean,

    /// Inspect or rewrite the input file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show the iteration history found on disk
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show reference versus predicted energies of a target at one iteration
    Objective {
        /// Target name
        target: String,

        /// Iteration index
        iteration: usize,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the parsed options
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse and rewrite the input file
    Normalize,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let project = ProjectArgs {
        root: cli.root,
        program: cli.program,
        prefix: cli.prefix,
        interval_ms: cli.interval_ms,
    };

    match cli.command {
        Commands::Status => status::execute(&project),
        Commands::Run => run::execute(&project),
        Commands::Clean => clean::execute(&project),
        Commands::Config { command } => match command {
            ConfigCommands::Show { json } => config::show(&project, json),
            ConfigCommands::Normalize => config::normalize(&project),
        },
        Commands::History { json } => history::execute(&project, json),
        Commands::Objective { target, iteration } => {
            objective::execute(&project, &target, iteration)
        }
    }
}
