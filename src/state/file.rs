use super::{normalize_marker, MarkerError, MarkerStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// On-disk form of the marker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    pub revision: Option<String>,
    pub updated_at: String,
}

/// Marker persisted as a JSON file, for environments without a FHIR server.
#[derive(Debug)]
pub struct FileMarkerStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full record, `None` if the file does not exist yet.
    pub async fn read_record(&self) -> Result<Option<MarkerRecord>, MarkerError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let record: MarkerRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }
}

#[async_trait]
impl MarkerStore for FileMarkerStore {
    async fn get(&self) -> Result<Option<String>, MarkerError> {
        let record = self.read_record().await?;
        Ok(normalize_marker(record.and_then(|r| r.revision)))
    }

    async fn set(&self, revision: Option<String>) -> Result<(), MarkerError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let record = MarkerRecord {
            revision,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        // Write atomically using temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&record)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), revision = ?record.revision, "Wrote migration marker");
        Ok(())
    }
}
