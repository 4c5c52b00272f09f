use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. Debug output for this crate when `verbose`,
/// otherwise silent unless `RUST_LOG` says otherwise.
///
/// Returns `false` if another subscriber was already installed, e.g. by a test
/// harness, in which case that one stays in place.
pub fn init_logging(verbose: bool) -> bool {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::OFF, "off")
    };
    let app_filter = Targets::new().with_target("sharpe", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(app_filter)
        .with(env_filter)
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Tracing subscriber already installed, keeping it");
            false
        }
    }
}
