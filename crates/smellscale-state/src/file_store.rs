//! JsonFileStore — the flat `scaleData.json` layout.
//!
//! Writes land in a sibling `.tmp` file which is then renamed over the
//! target, so readers never observe a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::backend::BlobStore;
use crate::error::{StateError, StateResult};

/// Default file name used by the original deployment.
pub const DEFAULT_FILE_NAME: &str = "scaleData.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store `scaleData.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> StateResult<()> {
        let tmp = self.tmp_path();
        std::fs::write(&tmp, bytes)
            .map_err(|e| StateError::Write(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, target)
            .map_err(|e| StateError::Write(format!("{}: {e}", target.display())))?;
        Ok(())
    }
}

impl BlobStore for JsonFileStore {
    fn read_blob(&self) -> StateResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::Read(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write_blob(&self, bytes: &[u8]) -> StateResult<()> {
        self.write_atomic(&self.path, bytes)?;
        debug!(path = ?self.path, len = bytes.len(), "state file written");
        Ok(())
    }

    fn stash_corrupt(&self, bytes: &[u8]) -> StateResult<()> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{stamp}"));
        let target = self.path.with_file_name(name);
        self.write_atomic(&target, bytes)?;
        debug!(path = ?target, "corrupt state file preserved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
