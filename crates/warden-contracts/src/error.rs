//! Error types for the warden decision pipeline.
//!
//! Only structural problems are errors. A well-formed request that breaks
//! policy is never an error: it is expressed as a tier 2 or tier 3
//! `Decision` carrying violations.

use thiserror::Error;

/// The unified error type for warden crates.
#[derive(Debug, Error)]
pub enum WardenError {
    /// The raw request could not be parsed or is missing required fields.
    ///
    /// Callers must treat this as a deny.
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// A rule table or other configuration document is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The request JSON Schema document itself could not be compiled.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// The audit sink could not persist a decision record.
    ///
    /// A decision that cannot be audited must not be acted upon.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The escalation collaborator rejected a tier 2 hand-off.
    #[error("escalation failed: {reason}")]
    EscalationFailed { reason: String },
}

/// Convenience alias used throughout the warden crates.
pub type WardenResult<T> = Result<T, WardenError>;
