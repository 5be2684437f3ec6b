//! Persists a `GrantSet` to a user-owned file with restrictive
//! permissions.

use reglet_types::GrantSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum GrantStoreError {
    #[error("failed to create grant store directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read grant store {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write grant store {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("grant store at {path} is not valid YAML: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to encode grant set: {0}")]
    Encode(#[from] serde_yaml::Error),
}

impl GrantStoreError {
    pub fn to_wire(&self) -> reglet_types::ErrorDetail {
        reglet_types::ErrorDetail::internal(self.to_string())
    }
}

/// Owner-only (`0600`) file mode; the directory containing it is
/// owner-readable and traversable (`0700`).
const FILE_MODE: u32 = 0o600;
const DIR_MODE: u32 = 0o700;

/// Reads and writes a single `GrantSet` at a fixed path on disk.
pub struct GrantStore {
    path: PathBuf,
}

impl GrantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this store persists to, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted `GrantSet`. A missing file yields an empty
    /// `GrantSet`, never an error.
    pub fn load(&self) -> Result<GrantSet, GrantStoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(GrantSet::default()),
            Err(source) => {
                return Err(GrantStoreError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        serde_yaml::from_str(&contents).map_err(|source| GrantStoreError::Decode {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Persist `grants`, creating intermediate directories as needed and
    /// setting restrictive permissions on both the file and any directory
    /// this call creates.
    pub fn save(&self, grants: &GrantSet) -> Result<(), GrantStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| GrantStoreError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
                set_permissions(parent, DIR_MODE);
            }
        }

        let yaml = serde_yaml::to_string(grants)?;
        std::fs::write(&self.path, yaml).map_err(|source| GrantStoreError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        set_permissions(&self.path, FILE_MODE);
        debug!(path = %self.path.display(), "grant store saved");
        Ok(())
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) {
    if let Ok(metadata) = std::fs::metadata(path) {
        let mut perms = metadata.permissions();
        perms.set_mode(mode);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) {}
