use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::error::{Result, TerraError};

/// Trims `db_name` and appends `extension` when missing.
pub(crate) fn database_file_name(db_name: &str, extension: &str) -> Result<String> {
    let name = db_name.trim();
    if name.is_empty() {
        return Err(TerraError::InvalidArgument(
            "database name can't be empty".to_string(),
        ));
    }
    if extension.is_empty() || name.ends_with(extension) {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}{extension}"))
    }
}

/// Picks the directory that holds the database file.
///
/// A local path is resolved under the external root (absolute paths replace
/// it); otherwise the application-private default directory is used.
pub(crate) fn storage_directory(
    local_path: Option<&str>,
    storage: &StorageConfig,
) -> Result<PathBuf> {
    match local_path {
        Some(raw) => {
            let local = raw.trim();
            if local.is_empty() {
                return Err(TerraError::InvalidArgument(
                    "local path can't be empty".to_string(),
                ));
            }
            let root = storage
                .resolve_external_root()
                .ok_or(TerraError::StorageUnavailable)?;
            Ok(root.join(local))
        }
        None => storage
            .resolve_default_dir()
            .ok_or(TerraError::StorageUnavailable),
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        fs::create_dir_all(dir).map_err(|source| TerraError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
