//! Adds the hospital identifier to the example patient.
//!
//! Read-modify-write on a single `Patient`: search by id, edit the JSON,
//! conditionally update it back. Both directions are idempotent so a step
//! re-run after a failed marker write is harmless.

use crate::fhir::{first_in_bundle, FhirClient};
use crate::migration::{MigrationError, MigrationUnit};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

pub const REVISION: &str = "8c0e6f4a-2d1b-4e7a-9a53-6b4f1d2c9e18";
pub const DOWN_REVISION: Option<&str> = Some(super::initial::REVISION);

const PATIENT: &str = "Patient";
pub const PATIENT_ID: &str = "example";
pub const IDENTIFIER_SYSTEM: &str = "http://hospital.smarthealthit.org";
pub const IDENTIFIER_VALUE: &str = "12345";

pub struct AddPatientIdentifierMigration {
    client: FhirClient,
}

impl AddPatientIdentifierMigration {
    pub fn new(client: FhirClient) -> Self {
        Self { client }
    }

    async fn fetch_patient(&self) -> Result<Option<Value>, MigrationError> {
        let bundle = self.client.search(PATIENT, &[("_id", PATIENT_ID)]).await?;
        Ok(first_in_bundle(&bundle).cloned())
    }

    async fn store_patient(&self, patient: &Value) -> Result<(), MigrationError> {
        self.client
            .put_conditional(PATIENT, &[("_id", PATIENT_ID)], patient)
            .await?;
        Ok(())
    }
}

fn is_hospital_identifier(identifier: &Value) -> bool {
    identifier["system"] == IDENTIFIER_SYSTEM && identifier["value"] == IDENTIFIER_VALUE
}

/// Append the hospital identifier. Returns false if it was already there.
pub fn add_identifier(patient: &mut Value) -> Result<bool, MigrationError> {
    let Some(resource) = patient.as_object_mut() else {
        return Err(MigrationError::Failed("Patient is not a JSON object".to_string()));
    };

    let identifiers = resource
        .entry("identifier")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(identifiers) = identifiers.as_array_mut() else {
        return Err(MigrationError::Failed(
            "Patient.identifier is not an array".to_string(),
        ));
    };

    if identifiers.iter().any(is_hospital_identifier) {
        return Ok(false);
    }
    identifiers.push(json!({
        "use": "usual",
        "system": IDENTIFIER_SYSTEM,
        "value": IDENTIFIER_VALUE
    }));
    Ok(true)
}

/// Drop the hospital identifier. Returns false if there was nothing to drop.
pub fn remove_identifier(patient: &mut Value) -> bool {
    let Some(identifiers) = patient
        .get_mut("identifier")
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    let before = identifiers.len();
    identifiers.retain(|identifier| !is_hospital_identifier(identifier));
    let removed = identifiers.len() != before;

    if identifiers.is_empty() {
        if let Some(resource) = patient.as_object_mut() {
            resource.remove("identifier");
        }
    }
    removed
}

#[async_trait]
impl MigrationUnit for AddPatientIdentifierMigration {
    fn revision(&self) -> &str {
        REVISION
    }

    fn down_revision(&self) -> Option<&str> {
        DOWN_REVISION
    }

    fn name(&self) -> &str {
        "add_patient_identifier"
    }

    async fn upgrade(&self) -> Result<(), MigrationError> {
        let Some(mut patient) = self.fetch_patient().await? else {
            info!(patient = PATIENT_ID, "Patient not found, nothing to update");
            return Ok(());
        };

        if add_identifier(&mut patient)? {
            self.store_patient(&patient).await?;
            info!(patient = PATIENT_ID, "Identifier appended");
        }
        Ok(())
    }

    async fn downgrade(&self) -> Result<(), MigrationError> {
        let Some(mut patient) = self.fetch_patient().await? else {
            info!(patient = PATIENT_ID, "Patient not found, nothing to revert");
            return Ok(());
        };

        if remove_identifier(&mut patient) {
            self.store_patient(&patient).await?;
            info!(patient = PATIENT_ID, "Identifier removed");
        }
        Ok(())
    }
}
