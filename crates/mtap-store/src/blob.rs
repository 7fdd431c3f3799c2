use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StoreError;

/// Filesystem blob store for raw scraped payloads and rendered reports.
///
/// Layout under the root follows `mtap_models::warehouse_schema::blob_paths`.
/// Writes create parent directories as needed and return the absolute path,
/// which producers thread through events as `raw_path` / `report_path`.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serialize `value` as pretty JSON at `rel_path` under the root.
    pub fn put_json<T: Serialize>(&self, rel_path: &str, value: &T) -> Result<PathBuf, StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(rel_path, json.as_bytes())
    }

    /// Write string content (e.g. a rendered report) at `rel_path`.
    pub fn put_string(&self, rel_path: &str, content: &str) -> Result<PathBuf, StoreError> {
        self.write(rel_path, content.as_bytes())
    }

    fn write(&self, rel_path: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}
