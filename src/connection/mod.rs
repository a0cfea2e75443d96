//! Connection state for the single on-device database.
//!
//! A [`Session`] owns at most one open handle. Every operation locks the
//! session for the duration of one call, so concurrent callers are serialized
//! rather than racing on the handle.

mod path;

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TerraConfig;
use crate::error::{Result, TerraError};
use crate::spatial::{self, Probe, SpatialProvider};

/// Parameters for [`Session::connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// Database name; the configured file extension is appended if absent.
    pub db_name: String,
    /// Directory under the external root to hold the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

impl ConnectRequest {
    /// Request for `db_name` in the default storage directory.
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            local_path: None,
        }
    }

    /// Places the database under `local_path`.
    pub fn local_path(mut self, local_path: impl Into<String>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }
}

/// Outcome of [`Session::connect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectReport {
    /// Always `true` on success.
    pub is_connected: bool,
    /// Result of the marker-table probe taken before any bootstrap.
    pub is_spatial: bool,
    /// Spatial metadata was initialized during this call.
    pub bootstrapped: bool,
    /// Resolved database file.
    pub path: PathBuf,
}

/// Outcome of [`Session::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReport {
    /// Always `false` on success.
    pub is_connected: bool,
}

struct OpenDatabase {
    conn: Connection,
    path: PathBuf,
    spatial_initialized: bool,
}

/// Owner of the database handle.
pub struct Session {
    config: TerraConfig,
    provider: Box<dyn SpatialProvider>,
    state: Mutex<Option<OpenDatabase>>,
}

impl Session {
    /// Creates a closed session using the provider described by `config`.
    pub fn new(config: TerraConfig) -> Self {
        let provider = config.spatial_provider();
        Self::with_provider(config, provider)
    }

    /// Creates a closed session with an explicit spatial provider.
    pub fn with_provider(config: TerraConfig, provider: Box<dyn SpatialProvider>) -> Self {
        Self {
            config,
            provider,
            state: Mutex::new(None),
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &TerraConfig {
        &self.config
    }

    /// Opens (or reopens) the database and checks spatial readiness.
    ///
    /// A handle that was already open is released once the new one is ready.
    /// When the marker table is missing and the provider manages metadata,
    /// spatial metadata is bootstrapped and the report still carries
    /// `is_spatial = false` for this call.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::InvalidArgument`] for a blank name or local
    /// path, [`TerraError::Io`] if the directory cannot be created,
    /// [`TerraError::Open`] or [`TerraError::SpatialExtension`] if the engine
    /// fails to open the file or load the extension, and
    /// [`TerraError::Execution`] if the bootstrap fails.
    pub fn connect(&self, request: &ConnectRequest) -> Result<ConnectReport> {
        let storage = &self.config.storage;
        let file_name = path::database_file_name(&request.db_name, &storage.file_extension)?;
        let dir = path::storage_directory(request.local_path.as_deref(), storage)?;
        path::ensure_dir(&dir)?;
        let db_path = dir.join(file_name);

        let mut state = self.state.lock();
        let conn = open_connection(&db_path)?;
        self.provider
            .install(&conn)
            .map_err(|source| TerraError::SpatialExtension {
                provider: self.provider.name().to_string(),
                source,
            })?;

        let (is_spatial, bootstrapped) = match spatial::probe(&conn)
            .map_err(|e| TerraError::query(spatial::PROBE_SQL, e))?
        {
            Probe::Ran(ready) => (ready, false),
            Probe::MarkerMissing if !self.provider.bootstraps_metadata() => (false, false),
            Probe::MarkerMissing => {
                spatial::init_metadata(&conn)
                    .map_err(|e| TerraError::execution(spatial::INIT_METADATA_SQL, e))?;
                info!(path = %db_path.display(), "connection.spatial_bootstrap");
                (false, true)
            }
        };

        let previous = state.replace(OpenDatabase {
            conn,
            path: db_path.clone(),
            spatial_initialized: is_spatial || bootstrapped,
        });
        if let Some(previous) = previous {
            debug!(path = %previous.path.display(), "connection.replaced");
            if let Err((_, err)) = previous.conn.close() {
                warn!(error = %err, "connection.replaced.close_failed");
            }
        }

        info!(
            path = %db_path.display(),
            provider = self.provider.name(),
            is_spatial,
            bootstrapped,
            "connection.opened"
        );
        Ok(ConnectReport {
            is_connected: true,
            is_spatial,
            bootstrapped,
            path: db_path,
        })
    }

    /// Releases the handle.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::NotConnected`] when nothing is open and
    /// [`TerraError::Close`] if the engine refuses to close; the handle is
    /// released either way.
    pub fn close(&self) -> Result<CloseReport> {
        let open = self.state.lock().take().ok_or(TerraError::NotConnected)?;
        let path = open.path;
        open.conn
            .close()
            .map_err(|(_, source)| TerraError::Close { source })?;
        info!(path = %path.display(), "connection.closed");
        Ok(CloseReport {
            is_connected: false,
        })
    }

    /// True while a handle is open.
    pub fn is_connected(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Path of the open database.
    pub fn path(&self) -> Option<PathBuf> {
        self.state.lock().as_ref().map(|open| open.path.clone())
    }

    /// True once spatial metadata is known to exist, including after a bootstrap.
    pub fn is_spatial(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|open| open.spatial_initialized)
    }

    /// Runs `f` against the open connection while holding the session lock.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection, &TerraConfig) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.lock();
        let open = state.as_ref().ok_or(TerraError::NotConnected)?;
        f(&open.conn, &self.config)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider.name())
            .field("path", &self.path())
            .finish()
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).map_err(|source| TerraError::Open {
        path: path.to_path_buf(),
        source,
    })
}
