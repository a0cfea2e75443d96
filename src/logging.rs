//! Structured logging for the library and the CLI.
//!
//! Events carry dotted names such as `connection.opened` or
//! `schema.geometry_failed`. A bare level (`debug`) applies to this crate
//! only and leaves other targets at `warn`; a full `EnvFilter` directive is
//! used as given.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, TerraError};

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Builds the filter for `level`.
///
/// # Errors
///
/// Returns [`TerraError::InvalidArgument`] for a malformed directive.
pub fn log_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    let directive = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("warn,{CRATE_TARGET}={level}")
    };
    EnvFilter::try_new(&directive)
        .map_err(|e| TerraError::InvalidArgument(format!("Invalid log level: {e}")))
}

/// Installs a global `fmt` subscriber on stderr filtered by [`log_filter`].
///
/// # Errors
///
/// Returns [`TerraError::InvalidArgument`] for a malformed directive or when
/// a subscriber is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(log_filter(level)?)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| TerraError::InvalidArgument("Logging already initialized".into()))
}
