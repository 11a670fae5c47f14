//! Core trait definitions for the warden decision pipeline.
//!
//! These four traits define the complete trust boundary:
//!
//! - `RequestDecoder`: turns an untrusted raw message into an `ActionRequest`
//! - `DecisionEngine`: trusted, pure classifier (no I/O, no blocking)
//! - `AuditSink`: trusted append-only sink for every decision
//! - `EscalationSink`: ticketing collaborator that receives tier 2 hand-offs
//!
//! The gatekeeper wires them together. Persistence and notification live
//! behind the sink traits; the engine itself never performs either.

use warden_contracts::{ActionRequest, Decision, WardenResult};

use crate::record::{DecisionRecord, Escalation};

/// The governance decision engine.
///
/// Implementations are **trusted** and must be deterministic: the same
/// request against the same rule set always yields an identical `Decision`.
/// `decide` is total: noncompliance is expressed through tiers and
/// violations, never through a panic or error.
pub trait DecisionEngine: Send + Sync {
    /// Classify `request` against the currently active rule set.
    fn decide(&self, request: &ActionRequest) -> Decision;

    /// Version string of the rule set new evaluations will use.
    fn active_version(&self) -> String;
}

/// Decoder for raw request messages (e.g. one JSON object per request).
pub trait RequestDecoder: Send + Sync {
    /// Parse `raw` into an `ActionRequest`.
    ///
    /// Returns `WardenError::MalformedRequest` when the message cannot be
    /// parsed or lacks required fields.
    fn decode(&self, raw: &str) -> WardenResult<ActionRequest>;
}

/// The audit sink: the append-only decision record.
///
/// Every submission, malformed ones included, produces exactly one
/// record. A failed write is fatal for that submission.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &DecisionRecord) -> WardenResult<()>;
}

/// The escalation collaborator (ticketing / approval queue).
///
/// Only called for tier 2 decisions, after the audit record is written.
pub trait EscalationSink: Send + Sync {
    fn escalate(&self, escalation: &Escalation) -> WardenResult<()>;
}
