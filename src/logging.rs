//! Logging setup for the formbuilder binary.
//!
//! Logs go to stderr; stdout carries the JSON responses.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that overrides every other filter source
pub const LOG_ENV: &str = "FORMBUILDER_LOG";

/// Filter used when neither the environment nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "formbuilder=info";

/// Logging options collected from the command line and config file.
#[derive(Debug, Default, Clone)]
pub struct LogConfig<'a> {
    /// `log_filter` from the config file
    pub filter: Option<&'a str>,
    /// Raise the crate's level to debug
    pub verbose: bool,
}

/// Picks the filter directive: `FORMBUILDER_LOG`, then config, then default.
pub fn filter_directive(config: &LogConfig<'_>, env: Option<&str>) -> String {
    if let Some(env) = env.filter(|s| !s.trim().is_empty()) {
        return env.to_string();
    }
    if config.verbose {
        return "formbuilder=debug".to_string();
    }
    config.filter.unwrap_or(DEFAULT_LOG_FILTER).to_string()
}

/// Installs the global subscriber. Returns false if one was already set.
pub fn init(config: &LogConfig<'_>) -> bool {
    let env = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(config, env.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}
