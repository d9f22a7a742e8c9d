#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser};
use miette::Result;

#[derive(Parser, Debug)]
#[command(name = "wayfind")]
#[command(author, version, about = "Resolve module requests the way bundlers do", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve a request to a file path
    Resolve {
        /// The request, e.g. `lodash/fp`, `./util` or `#internal`
        request: String,

        #[command(flatten)]
        options: ResolveArgs,
    },

    /// Resolve a request and print every step taken
    Explain {
        /// The request, e.g. `lodash/fp`, `./util` or `#internal`
        request: String,

        #[command(flatten)]
        options: ResolveArgs,
    },
}

/// Options shared by `resolve` and `explain`.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Directory to resolve from (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    from: Option<PathBuf>,

    /// JSON resolver config file
    #[arg(long, env = "WAYFIND_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Condition name honoured by exports/imports fields (repeatable)
    #[arg(long = "condition", value_name = "NAME")]
    conditions: Vec<String>,

    /// Extension to try, replacing the configured list (repeatable)
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Filesystem cache lifetime in milliseconds (0 only merges in-flight calls)
    #[arg(long, value_name = "MS")]
    cache_ms: Option<u64>,

    /// Use blocking filesystem calls instead of the async runtime
    #[arg(long)]
    sync: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Resolve { request, options }) => {
            let span = tracing::info_span!("resolve", cmd = "resolve", cwd = %cwd.display());
            let _guard = span.enter();
            commands::resolve::run(&cwd, &request, &options, cli.json)
        }
        Some(Commands::Explain { request, options }) => {
            let span = tracing::info_span!("explain", cmd = "explain", cwd = %cwd.display());
            let _guard = span.enter();
            commands::explain::run(&cwd, &request, &options, cli.json)
        }
    }
}
