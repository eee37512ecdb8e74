//! Minimal FHIR REST client.
//!
//! Only what the migration tooling needs: searching a resource type and
//! conditional updates against a search query.

mod types;

pub use types::{Basic, CodeableConcept, Coding, Identifier};

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Media type for FHIR JSON payloads
pub const FHIR_JSON: &str = "application/fhir+json";

#[derive(Error, Debug)]
pub enum FhirError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid FHIR base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Client bound to one FHIR server base URL.
#[derive(Debug, Clone)]
pub struct FhirClient {
    base_url: String,
    http: reqwest::Client,
}

impl FhirClient {
    /// Create a client for `base_url`. A trailing slash is added if missing.
    pub fn new(base_url: &str) -> Result<Self, FhirError> {
        let trimmed = base_url.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(FhirError::InvalidBaseUrl(base_url.to_string()));
        }

        let base_url = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for a resource type endpoint, e.g. `<base>/Basic`
    pub fn resource_url(&self, resource_type: &str) -> String {
        format!("{}{}", self.base_url, resource_type)
    }

    /// Search `resource_type` and return the raw response bundle.
    pub async fn search(
        &self,
        resource_type: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, FhirError> {
        let url = self.resource_url(resource_type);
        debug!(url = %url, "Searching FHIR resources");

        let bundle = self
            .http
            .get(&url)
            .query(params)
            .header(CONTENT_TYPE, FHIR_JSON)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(bundle)
    }

    /// Conditional update: the server updates the resource matching `params`,
    /// or creates it when nothing matches.
    pub async fn put_conditional<T: Serialize>(
        &self,
        resource_type: &str,
        params: &[(&str, &str)],
        resource: &T,
    ) -> Result<Value, FhirError> {
        let url = self.resource_url(resource_type);
        debug!(url = %url, "Conditionally updating FHIR resource");

        let body = serde_json::to_vec(resource)?;
        let stored = self
            .http
            .put(&url)
            .query(params)
            .header(CONTENT_TYPE, FHIR_JSON)
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(stored)
    }
}

/// Return the first resource in a search bundle, if any.
///
/// Decided from `entry` alone; `total` is optional on searchsets.
pub fn first_in_bundle(bundle: &Value) -> Option<&Value> {
    if bundle.get("resourceType")?.as_str()? != "Bundle" {
        return None;
    }
    bundle.get("entry")?.get(0)?.get("resource")
}
