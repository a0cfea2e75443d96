//! Runtime configuration loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spatial::{NoSpatial, SpatialProvider, Spatialite};

/// File extension appended to database names that lack it.
pub const DEFAULT_FILE_EXTENSION: &str = ".sqlite";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TerraConfig {
    /// Where database files live.
    pub storage: StorageConfig,
    /// How the spatial extension is provided.
    pub spatial: SpatialConfig,
    /// How result cells are typed.
    pub cells: CellOptions,
}

/// Storage path settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory used when a connect request carries no local path.
    pub default_dir: Option<PathBuf>,
    /// Root that relative local paths are resolved against.
    pub external_root: Option<PathBuf>,
    /// Extension appended to database names.
    pub file_extension: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_dir: None,
            external_root: None,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }
}

impl StorageConfig {
    /// Application-private directory for databases.
    pub fn resolve_default_dir(&self) -> Option<PathBuf> {
        self.default_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|base| base.join("terrasql")))
    }

    /// Root for caller-supplied local paths.
    pub fn resolve_external_root(&self) -> Option<PathBuf> {
        self.external_root.clone().or_else(dirs::home_dir)
    }
}

/// Spatial extension settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Load the extension on open.
    pub enabled: bool,
    /// Shared library name or path.
    pub library: String,
    /// Optional entry point symbol.
    pub entry_point: Option<String>,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            library: Spatialite::DEFAULT_LIBRARY.to_string(),
            entry_point: None,
        }
    }
}

/// Width used for INTEGER cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerWidth {
    /// Full signed 64-bit values.
    #[default]
    Wide,
    /// Truncate to 32 bits, matching bridges that only carry `int`.
    Narrow32,
}

/// Text form used for BLOB cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobRendering {
    /// Bytes decoded as (lossy) UTF-8.
    #[default]
    Text,
    /// Lower-case hexadecimal.
    Hex,
}

/// Knobs for the typed cell conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CellOptions {
    /// INTEGER width.
    pub integer_width: IntegerWidth,
    /// BLOB rendering.
    pub blob_rendering: BlobRendering,
}

impl TerraConfig {
    /// Loads the config from `explicit`, else the default location if it exists, else defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return read_file(&path);
        }
        match default_config_path() {
            Some(path) if path.exists() => read_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Builds the spatial provider described by this config.
    pub fn spatial_provider(&self) -> Box<dyn SpatialProvider> {
        if self.spatial.enabled {
            Box::new(Spatialite::new(
                self.spatial.library.clone(),
                self.spatial.entry_point.clone(),
            ))
        } else {
            Box::new(NoSpatial)
        }
    }
}

fn read_file(path: &Path) -> Result<TerraConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("terrasql").join("config.toml"))
}

/// Failure while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file.
        path: PathBuf,
        /// TOML failure.
        source: toml::de::Error,
    },
}
