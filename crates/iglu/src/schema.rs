use std::sync::Arc;

use crate::error::IgluError;
use crate::reference::IgluReference;

const DRAFT_2020_12_URIS: &[&str] = &[
    "https://json-schema.org/draft/2020-12/schema",
    "http://json-schema.org/draft/2020-12/schema",
];

/// A resolved schema: the raw JSON object, a compiled validator, and the
/// ordered list of top-level property names (used by enrichers assembling an
/// event from the scratchpad).
#[derive(Clone)]
pub struct SchemaEntry {
    pub reference: IgluReference,
    pub schema_object: serde_json::Value,
    pub validator: Arc<jsonschema::Validator>,
}

impl SchemaEntry {
    pub fn validate(&self, data: &serde_json::Value) -> Result<(), IgluError> {
        self.validator.validate(data).map_err(|e| IgluError::ValidationFailed {
            reference: self.reference.clone(),
            reason: e.to_string(),
        })
    }

    pub fn is_valid(&self, data: &serde_json::Value) -> bool {
        self.validator.is_valid(data)
    }

    /// Every validation failure against `data`, formatted as `{instance path}: {message}`.
    /// Empty iff `data` is valid.
    pub fn validation_errors(&self, data: &serde_json::Value) -> Vec<String> {
        self.validator
            .iter_errors(data)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect()
    }

    pub fn fields(&self) -> Vec<String> {
        self.schema_object
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Compiles `schema_object` as Draft 2020-12 without checking its own
/// `$schema` tag — used for the built-in schemas shipped with the binary,
/// some of which predate the 2020-12 meta-schema but are otherwise trusted.
pub fn compile_trusted(
    reference: &IgluReference,
    schema_object: serde_json::Value,
) -> Result<SchemaEntry, IgluError> {
    let validator = jsonschema::draft202012::new(&schema_object).map_err(|e| IgluError::InvalidSchema {
        reference: reference.clone(),
        reason: e.to_string(),
    })?;
    Ok(SchemaEntry {
        reference: reference.clone(),
        schema_object,
        validator: Arc::new(validator),
    })
}

/// Compiles `schema_object` as Draft 2020-12, requiring its `$schema` tag to
/// actually say so — used for schemas fetched from a remote registry.
pub fn compile_remote(
    reference: &IgluReference,
    schema_object: serde_json::Value,
) -> Result<SchemaEntry, IgluError> {
    let declared = schema_object.get("$schema").and_then(|v| v.as_str());
    match declared {
        Some(uri) if DRAFT_2020_12_URIS.contains(&uri) => {}
        Some(other) => {
            return Err(IgluError::InvalidSchema {
                reference: reference.clone(),
                reason: format!("unsupported meta-schema: {other}"),
            })
        }
        None => {
            return Err(IgluError::InvalidSchema {
                reference: reference.clone(),
                reason: "missing $schema".to_string(),
            })
        }
    }
    compile_trusted(reference, schema_object)
}
