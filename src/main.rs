use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use sharpe::RequestSpec;
use sharpe::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for sharpe::AppCommand {
    fn from(cmd: Commands) -> sharpe::AppCommand {
        match cmd {
            Commands::Intervals => sharpe::AppCommand::Intervals,
            Commands::Fetch {
                symbols,
                source,
                requests,
                tail,
                dump_cache,
            } => sharpe::AppCommand::Fetch(sharpe::FetchArgs {
                symbols,
                source,
                requests,
                tail,
                dump_cache,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List supported intervals and periods
    Intervals,
    /// Fetch price and dividend series for one or more symbols
    Fetch {
        /// Symbols to fetch, e.g. IBM MSFT
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Data source label
        #[arg(short, long)]
        source: Option<String>,

        /// INTERVAL:PERIOD to fetch, e.g. 1d:1y. May be repeated
        #[arg(short = 'r', long = "request")]
        requests: Vec<RequestSpec>,

        /// Print the last N rows of each series
        #[arg(long, default_value_t = 0)]
        tail: usize,

        /// Print the cache contents as JSON afterwards
        #[arg(long)]
        dump_cache: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => sharpe::cli::setup::setup_at_path(path),
            None => sharpe::cli::setup::setup(),
        },
        Some(cmd) => sharpe::run_command(cmd.into(), cli.config_path.as_deref()),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
