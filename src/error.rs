use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TerraError>;

/// Failures surfaced by connection, query, and schema operations.
#[derive(Debug, Error)]
pub enum TerraError {
    /// Malformed table or column specification, reported before any SQL runs.
    #[error("{reason}")]
    Validation {
        /// Human-readable violation.
        reason: String,
    },
    /// The engine rejected or failed a statement, including DDL and bootstrap.
    #[error("{source}")]
    Execution {
        /// Statement that failed.
        sql: String,
        /// Engine failure.
        #[source]
        source: rusqlite::Error,
    },
    /// Read or update statement failed to prepare or step.
    #[error("{source}")]
    Query {
        /// Statement that failed.
        sql: String,
        /// Engine failure.
        #[source]
        source: rusqlite::Error,
    },
    /// Operation attempted without an open database handle.
    #[error("database is not connected")]
    NotConnected,
    /// Caller supplied an unusable argument.
    #[error("{0}")]
    InvalidArgument(String),
    /// The engine could not open the database file.
    #[error("failed to open database {path}: {source}")]
    Open {
        /// Resolved database file.
        path: PathBuf,
        /// Engine failure.
        #[source]
        source: rusqlite::Error,
    },
    /// The engine could not close the database handle.
    #[error("failed to close database: {source}")]
    Close {
        /// Engine failure.
        #[source]
        source: rusqlite::Error,
    },
    /// The spatial extension could not be installed on the connection.
    #[error("failed to install spatial extension '{provider}': {source}")]
    SpatialExtension {
        /// Provider name.
        provider: String,
        /// Engine failure.
        #[source]
        source: rusqlite::Error,
    },
    /// Filesystem failure while preparing the storage directory.
    #[error("failed to prepare directory {path}: {source}")]
    Io {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// No default storage directory could be resolved on this platform.
    #[error("no storage directory available; set storage.default_dir in the config")]
    StorageUnavailable,
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TerraError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        TerraError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn execution(sql: impl Into<String>, source: rusqlite::Error) -> Self {
        TerraError::Execution {
            sql: sql.into(),
            source,
        }
    }

    pub(crate) fn query(sql: impl Into<String>, source: rusqlite::Error) -> Self {
        TerraError::Query {
            sql: sql.into(),
            source,
        }
    }

    /// Returns the engine error behind this failure, if any.
    pub fn engine_error(&self) -> Option<&rusqlite::Error> {
        match self {
            TerraError::Execution { source, .. }
            | TerraError::Query { source, .. }
            | TerraError::Open { source, .. }
            | TerraError::Close { source }
            | TerraError::SpatialExtension { source, .. } => Some(source),
            _ => None,
        }
    }
}
