//! Installs the `tracing` subscriber used by the command line tools.
use clap::Args;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::ParseError};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("Cannot install tracing subscriber: {0}")]
    Install(String),
}

/// [clap] derived struct holding the logging options common to every binary.
#[derive(Clone, Debug, Args)]
pub struct LoggingOpts {
    /// Filter directive passed to the tracing subscriber, e.g. "info" or "h2f_pipeline=debug"
    #[clap(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Installs a formatting subscriber writing to stderr, so stdout stays free for command output.
pub fn init_tracing(options: &LoggingOpts) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(&options.log_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}
