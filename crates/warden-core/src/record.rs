//! Payloads handed to the audit and escalation collaborators.
//!
//! The fingerprint is a SHA-256 digest over deterministic byte sequences:
//!
//!   1. canonical JSON of the request, or the literal `null` when the
//!      submission never decoded into a request
//!   2. canonical JSON of the decision (which embeds the rule-set version)
//!
//! Both request and decision use ordered maps and sets, so identical inputs
//! always produce identical bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use warden_contracts::{ActionRequest, Decision, WardenError, WardenResult};

/// One entry for the audit sink: the original request plus its decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// `None` when the raw message was malformed.
    pub request: Option<ActionRequest>,
    pub decision: Decision,
    /// Lowercase 64-character hex SHA-256 over (request, decision).
    pub fingerprint: String,
}

impl DecisionRecord {
    /// Build a record and compute its fingerprint.
    pub fn new(request: Option<ActionRequest>, decision: Decision) -> WardenResult<Self> {
        let fingerprint = fingerprint(request.as_ref(), &decision)?;
        Ok(Self {
            request,
            decision,
            fingerprint,
        })
    }
}

/// Compute the record fingerprint for `request` and `decision`.
pub fn fingerprint(request: Option<&ActionRequest>, decision: &Decision) -> WardenResult<String> {
    let request_json = serde_json::to_vec(&request).map_err(|e| WardenError::AuditWriteFailed {
        reason: format!("request could not be serialized for fingerprinting: {e}"),
    })?;
    let decision_json =
        serde_json::to_vec(decision).map_err(|e| WardenError::AuditWriteFailed {
            reason: format!("decision could not be serialized for fingerprinting: {e}"),
        })?;

    let mut hasher = Sha256::new();
    hasher.update(&request_json);
    hasher.update(&decision_json);

    Ok(hex::encode(hasher.finalize()))
}

/// A tier 2 hand-off for the ticketing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    /// Ordered, non-empty list of teams or queues to notify.
    pub routing: Vec<String>,
    pub justification: String,
    pub simulation_required: bool,
    /// Fingerprint of the audit record this escalation belongs to.
    pub fingerprint: String,
    pub request: ActionRequest,
}
