//! Applied-migration marker storage.
//!
//! The marker is the single persisted value naming the most recently
//! applied revision. The engine writes it after every completed step.

mod fhir;
mod file;

pub use fhir::FhirMarkerStore;
pub use file::{FileMarkerStore, MarkerRecord};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("FHIR error: {0}")]
    FhirError(#[from] crate::fhir::FhirError),

    #[error("Malformed migration marker resource: {0}")]
    MalformedResource(String),
}

/// Storage for the applied-migration marker.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Most recently applied revision, `None` when nothing is applied.
    async fn get(&self) -> Result<Option<String>, MarkerError>;

    /// Replace the marker.
    async fn set(&self, revision: Option<String>) -> Result<(), MarkerError>;
}

/// Treat the literal `"None"` and blank values as "nothing applied".
pub(crate) fn normalize_marker(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != "None")
}

/// Marker held in process memory.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    marker: Mutex<Option<String>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(revision: Option<String>) -> Self {
        Self {
            marker: Mutex::new(revision),
        }
    }
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn get(&self) -> Result<Option<String>, MarkerError> {
        Ok(self.marker.lock().await.clone())
    }

    async fn set(&self, revision: Option<String>) -> Result<(), MarkerError> {
        *self.marker.lock().await = revision;
        Ok(())
    }
}
