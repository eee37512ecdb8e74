use super::{normalize_marker, MarkerError, MarkerStore};
use crate::fhir::{first_in_bundle, Basic, CodeableConcept, Coding, FhirClient, Identifier};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

const BASIC: &str = "Basic";

/// Coding system placed on a freshly created marker resource
pub const MARKER_CODING_SYSTEM: &str = "http://our.migration.system";

/// Marker stored in a single FHIR `Basic` resource.
///
/// The resource is found by `identifier = <system>|<resource id>`; the
/// applied revision lives in `code.coding[0].code`.
#[derive(Debug, Clone)]
pub struct FhirMarkerStore {
    client: FhirClient,
    system: String,
    resource_id: String,
}

impl FhirMarkerStore {
    pub fn new(client: FhirClient, system: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            client,
            system: system.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Search token identifying the marker resource
    pub fn identifier_token(&self) -> String {
        format!("{}|{}", self.system, self.resource_id)
    }

    /// Fetch the marker resource, `None` if the server has none yet.
    pub async fn fetch_resource(&self) -> Result<Option<Basic>, MarkerError> {
        let token = self.identifier_token();
        let bundle = self
            .client
            .search(BASIC, &[("identifier", token.as_str())])
            .await?;

        resource_from_bundle(&bundle)
    }

    /// A new marker resource carrying this store's identifier.
    pub fn new_resource(&self) -> Basic {
        Basic {
            resource_type: BASIC.to_string(),
            id: None,
            identifier: vec![Identifier {
                system: Some(self.system.clone()),
                value: Some(self.resource_id.clone()),
            }],
            code: CodeableConcept {
                coding: vec![Coding {
                    system: Some(MARKER_CODING_SYSTEM.to_string()),
                    code: None,
                }],
            },
            extra: Map::new(),
        }
    }
}

/// Marker resource carried by a search response, `None` for an empty searchset.
///
/// Anything other than a Bundle is an error so that a failed search never
/// reads as "nothing applied".
pub fn resource_from_bundle(bundle: &Value) -> Result<Option<Basic>, MarkerError> {
    let resource_type = bundle.get("resourceType").and_then(Value::as_str);
    if resource_type != Some("Bundle") {
        return Err(MarkerError::MalformedResource(format!(
            "expected a search Bundle, found {}",
            resource_type.unwrap_or("no resourceType")
        )));
    }

    first_in_bundle(bundle)
        .map(|resource| serde_json::from_value::<Basic>(resource.clone()))
        .transpose()
        .map_err(|e| MarkerError::MalformedResource(e.to_string()))
}

/// Applied revision held by a marker resource.
pub fn marker_from_resource(resource: &Basic) -> Result<Option<String>, MarkerError> {
    if resource.resource_type != BASIC {
        return Err(MarkerError::MalformedResource(format!(
            "expected Basic, found {}",
            resource.resource_type
        )));
    }
    let code = resource.code.coding.first().and_then(|c| c.code.clone());
    Ok(normalize_marker(code))
}

/// Store `revision` in the first coding of a marker resource.
pub fn apply_marker(resource: &mut Basic, revision: Option<String>) {
    match resource.code.coding.first_mut() {
        Some(coding) => coding.code = revision,
        None => resource.code.coding.push(Coding {
            system: Some(MARKER_CODING_SYSTEM.to_string()),
            code: revision,
        }),
    }
}

#[async_trait]
impl MarkerStore for FhirMarkerStore {
    async fn get(&self) -> Result<Option<String>, MarkerError> {
        match self.fetch_resource().await? {
            Some(resource) => marker_from_resource(&resource),
            None => Ok(None),
        }
    }

    async fn set(&self, revision: Option<String>) -> Result<(), MarkerError> {
        let mut resource = match self.fetch_resource().await? {
            Some(resource) => resource,
            None => {
                debug!(identifier = %self.identifier_token(), "Creating migration marker resource");
                self.new_resource()
            }
        };
        apply_marker(&mut resource, revision);

        let token = self.identifier_token();
        self.client
            .put_conditional(BASIC, &[("identifier", token.as_str())], &resource)
            .await?;
        Ok(())
    }
}
