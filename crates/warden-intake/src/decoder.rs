//! Schema-validated request decoder.
//!
//! `SchemaRequestDecoder` implements the `RequestDecoder` trait from
//! `warden-core`. Decoding runs in three phases:
//!
//! 1. **Parse**: the raw message must be a single JSON document.
//! 2. **Structural**: the document is validated against the request JSON
//!    Schema. Every violation is collected so the caller sees the full set
//!    in one pass.
//! 3. **Typed**: the validated document is deserialized into an
//!    `ActionRequest`.
//!
//! A failure in any phase is a `MalformedRequest`. An omitted
//! `agent_identity` is *not* a decoding failure: it reaches the engine as
//! an empty identity and is denied there with an explanatory violation.

use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, warn};

use warden_contracts::{ActionRequest, WardenError, WardenResult};
use warden_core::traits::RequestDecoder;

/// The bundled JSON Schema for `ActionRequest` messages.
pub const ACTION_REQUEST_SCHEMA: &str = include_str!("../schemas/action_request.schema.json");

/// Decodes one JSON object per request, validating it first.
pub struct SchemaRequestDecoder {
    validator: Validator,
}

impl SchemaRequestDecoder {
    /// A decoder using the bundled request schema.
    pub fn new() -> WardenResult<Self> {
        let schema: Value =
            serde_json::from_str(ACTION_REQUEST_SCHEMA).map_err(|e| WardenError::SchemaValidation {
                reason: format!("bundled request schema is not valid JSON: {e}"),
            })?;
        Self::with_schema(&schema)
    }

    /// A decoder validating against `schema`.
    ///
    /// Returns `WardenError::SchemaValidation` if `schema` is not a valid
    /// JSON Schema document.
    pub fn with_schema(schema: &Value) -> WardenResult<Self> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| WardenError::SchemaValidation {
                reason: format!("invalid JSON Schema document: {e}"),
            })?;
        Ok(Self { validator })
    }

    /// Every schema violation in `document`, formatted with its location.
    pub fn schema_violations(&self, document: &Value) -> Vec<String> {
        self.validator
            .iter_errors(document)
            .map(|error| {
                let path = error.instance_path.to_string();
                let at = if path.is_empty() { "/" } else { path.as_str() };
                format!("{at}: {error}")
            })
            .collect()
    }
}

impl RequestDecoder for SchemaRequestDecoder {
    fn decode(&self, raw: &str) -> WardenResult<ActionRequest> {
        let document: Value =
            serde_json::from_str(raw).map_err(|e| WardenError::MalformedRequest {
                reason: format!("request is not valid JSON: {e}"),
            })?;

        let violations = self.schema_violations(&document);
        if !violations.is_empty() {
            warn!(
                violation_count = violations.len(),
                "request failed schema validation"
            );
            return Err(WardenError::MalformedRequest {
                reason: format!(
                    "request failed schema validation: {}",
                    violations.join("; ")
                ),
            });
        }

        let request: ActionRequest =
            serde_json::from_value(document).map_err(|e| WardenError::MalformedRequest {
                reason: format!("request does not match ActionRequest: {e}"),
            })?;

        debug!(
            agent_identity = %request.agent_identity,
            operation = %request.operation,
            "request decoded"
        );
        Ok(request)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
