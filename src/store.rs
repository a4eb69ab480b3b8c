use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::ports::store::{SettingsStore, StoredSettings};

/// Persists [`StoredSettings`] as a JSON document on the local device.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<StoredSettings, StoreError> {
        if !self.path.exists() {
            return Ok(StoredSettings::default());
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if contents.trim().is_empty() {
            return Ok(StoredSettings::default());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes through a private temp file in the same directory and renames
    /// it over the target, so readers never see a partial or world-readable
    /// file.
    fn save(&self, settings: &StoredSettings) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let contents = serde_json::to_vec_pretty(settings)?;

        // NamedTempFile is created with mode 0600 on unix
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        file.write_all(&contents).map_err(|e| self.io_error(e))?;
        file.as_file().sync_all().map_err(|e| self.io_error(e))?;
        file.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        Ok(())
    }
}
