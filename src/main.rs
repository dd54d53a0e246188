mod batch;
mod cache;
mod commands;
mod config;
mod diagnostics;
mod document;
mod error;
mod parser;
mod resolver;
mod scanner;
mod titles;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipsize", about = "Radar pip sizes from Unity prefab documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log resolver steps (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every MapDot prefab and cache the results, or report the existing cache
    Scan {
        /// Game extraction root
        #[arg(long, env = config::EXTRACT_ROOT_VAR)]
        root: Option<PathBuf>,
        /// Cache snapshot file (default from .pipsize.toml)
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Ignore the cache snapshot, resolve everything again and replace it
        #[arg(long)]
        rebuild: bool,
    },
    /// Resolve one prefab file and print `x z`
    Resolve {
        /// Prefab file to read
        file: PathBuf,
    },
    /// Print the cached snapshot
    Show {
        /// Cache snapshot file (default from .pipsize.toml)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan { root, cache, rebuild } => commands::scan(root, cache, rebuild),
        Commands::Resolve { file } => Ok(commands::resolve(&file)),
        Commands::Show { cache } => commands::show(cache),
    };

    match result {
        Ok(code) => return code,
        Err(e) => {
            diagnostics::print_error(&e);
            return ExitCode::FAILURE;
        },
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
