pub mod cli;
pub mod core;
pub mod providers;

pub use crate::core::config;

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

pub use cli::fetch::{FetchArgs, RequestSpec};
pub use providers::data_getter_factory;

pub enum AppCommand {
    Intervals,
    Fetch(FetchArgs),
}

/// Runs `command` against the config at `config_path`, or the default config.
pub fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("sharpe starting...");

    let config = config::AppConfig::load_or_default(config_path.map(Path::new))?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Intervals => cli::intervals::run(),
        AppCommand::Fetch(args) => {
            let label = args.source.as_deref().unwrap_or(&config.defaults.source);
            let mut getter = data_getter_factory(label, &config)?;
            cli::fetch::run(&mut getter, &args, &config.defaults)
        }
    }
}
