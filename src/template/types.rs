use serde::Serialize;

/// Context for migration stub templates
/// Placeholders: {{name}}, {{struct_name}}, {{revision}}, {{down_revision}}, {{created_at}}
#[derive(Debug, Clone, Serialize)]
pub struct StubContext {
    pub name: String,
    pub struct_name: String,
    pub revision: String,
    pub down_revision: Option<String>,
    pub created_at: String,
}

impl StubContext {
    pub fn new(name: &str, revision: String, down_revision: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            struct_name: struct_name_for(name),
            revision,
            down_revision,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// `add_patient_mrn` -> `AddPatientMrnMigration`
pub fn struct_name_for(name: &str) -> String {
    let mut struct_name: String = name
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    struct_name.push_str("Migration");
    struct_name
}

/// Stub written when no custom template exists. Stubs are modules of
/// `crate::migration::migrations`, next to the built-in units.
pub const DEFAULT_STUB_TEMPLATE: &str = r#"//! Migration script generated for {{name}} on {{created_at}}.

use async_trait::async_trait;
use crate::migration::{MigrationError, MigrationUnit};

pub const REVISION: &str = "{{revision}}";
pub const DOWN_REVISION: Option<&str> = {{#if down_revision}}Some("{{down_revision}}"){{else}}None{{/if}};

pub struct {{struct_name}};

#[async_trait]
impl MigrationUnit for {{struct_name}} {
    fn revision(&self) -> &str {
        REVISION
    }

    fn down_revision(&self) -> Option<&str> {
        DOWN_REVISION
    }

    fn name(&self) -> &str {
        "{{name}}"
    }

    async fn upgrade(&self) -> Result<(), MigrationError> {
        // Add your upgrade migration code here
        Ok(())
    }

    async fn downgrade(&self) -> Result<(), MigrationError> {
        // Add your downgrade migration code here
        Ok(())
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_name_for() {
        assert_eq!(struct_name_for("add_patient_mrn"), "AddPatientMrnMigration");
        assert_eq!(struct_name_for("initial"), "InitialMigration");
        assert_eq!(struct_name_for("v2__fix"), "V2FixMigration");
    }
}
