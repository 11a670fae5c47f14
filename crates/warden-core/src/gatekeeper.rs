//! The warden gatekeeper: decode → decide → audit → escalate.
//!
//! The gatekeeper is what a caller holding a raw request message uses. It
//! enforces the ordering of the trusted components:
//!
//!   Decode → Decide → Audit → [Escalate, tier 2 only]
//!
//! A malformed message never reaches the engine. It is converted into an
//! immediate tier 3 deny carrying a critical `malformed_request` violation,
//! and that deny is audited like any other decision.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use warden_contracts::{
    decision::Severity, Allow, AuditLevel, Decision, Tier, Violation, WardenError, WardenResult,
};

use crate::{
    record::{DecisionRecord, Escalation},
    traits::{AuditSink, DecisionEngine, EscalationSink, RequestDecoder},
};

/// Wires the decoder, engine, and collaborator sinks together.
///
/// The gatekeeper holds no request-scoped state and may be shared across
/// threads; every component it owns is `Send + Sync`.
pub struct Gatekeeper {
    decoder: Box<dyn RequestDecoder>,
    engine: Box<dyn DecisionEngine>,
    audit: Box<dyn AuditSink>,
    escalation: Box<dyn EscalationSink>,
}

impl Gatekeeper {
    pub fn new(
        decoder: Box<dyn RequestDecoder>,
        engine: Box<dyn DecisionEngine>,
        audit: Box<dyn AuditSink>,
        escalation: Box<dyn EscalationSink>,
    ) -> Self {
        Self {
            decoder,
            engine,
            audit,
            escalation,
        }
    }

    /// Process one raw request message.
    ///
    /// # Pipeline
    ///
    /// 1. Decode `raw`; a `MalformedRequest` becomes a tier 3 deny
    /// 2. Evaluate the request against the active rule set
    /// 3. Write exactly one `DecisionRecord` to the audit sink
    /// 4. For tier 2, hand routing and justification to the escalation sink
    ///
    /// # Errors
    ///
    /// Returns `Err` for audit and escalation failures, and for decoder
    /// errors other than `MalformedRequest`. Callers must treat any `Err`
    /// as a deny.
    pub fn submit(&self, raw: &str) -> WardenResult<Decision> {
        match self.decoder.decode(raw) {
            Ok(request) => self.submit_request(request),
            Err(WardenError::MalformedRequest { reason }) => {
                warn!(reason = %reason, "malformed request denied before evaluation");
                let decision = malformed_decision(&reason, self.engine.active_version());
                let record = DecisionRecord::new(None, decision)?;
                self.audit.record(&record)?;
                Ok(record.decision)
            }
            Err(other) => Err(other),
        }
    }

    /// Process an already-decoded request (steps 2–4 of `submit`).
    pub fn submit_request(
        &self,
        request: warden_contracts::ActionRequest,
    ) -> WardenResult<Decision> {
        let decision = self.engine.decide(&request);

        debug!(
            agent_identity = %request.agent_identity,
            operation = %request.operation,
            tier = %decision.tier,
            "decision computed"
        );

        let record = DecisionRecord::new(Some(request), decision)?;
        self.audit.record(&record)?;

        if record.decision.tier == Tier::HumanApproval {
            // The engine guarantees non-empty routing for tier 2.
            let routing = record.decision.approval_routing.clone().unwrap_or_default();
            info!(
                fingerprint = %record.fingerprint,
                routing = ?routing,
                "escalating for human approval"
            );
            let DecisionRecord {
                request,
                decision,
                fingerprint,
            } = record;
            if let Some(request) = request {
                self.escalation.escalate(&Escalation {
                    routing,
                    justification: decision.justification.clone(),
                    simulation_required: decision.simulation_required,
                    fingerprint,
                    request,
                })?;
            }
            return Ok(decision);
        }

        Ok(record.decision)
    }
}

/// Build the deny decision returned for a message that could not be decoded.
pub fn malformed_decision(reason: &str, policy_version: String) -> Decision {
    let mut violations = BTreeSet::new();
    violations.insert(Violation::new(
        "malformed_request",
        Severity::Critical,
        format!("request could not be evaluated: {reason}"),
    ));

    Decision {
        allow: Allow::Denied,
        tier: Tier::AlwaysDeny,
        requires_human_approval: false,
        approval_routing: None,
        justification: format!("request rejected as malformed: {reason}"),
        violations,
        recommendations: BTreeSet::new(),
        audit_level: AuditLevel::Critical,
        simulation_required: false,
        matched_rule: None,
        policy_version,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use warden_contracts::{
        ActionRequest, Allow, AuditLevel, Decision, Tier, WardenError, WardenResult,
    };

    use crate::record::{DecisionRecord, Escalation};
    use crate::traits::{AuditSink, DecisionEngine, EscalationSink, RequestDecoder};

    use super::Gatekeeper;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// Decodes any input into a fixed request, or fails with a fixed error.
    struct MockDecoder {
        fail_with: Option<String>,
    }

    impl RequestDecoder for MockDecoder {
        fn decode(&self, raw: &str) -> WardenResult<ActionRequest> {
            match &self.fail_with {
                Some(reason) => Err(WardenError::MalformedRequest {
                    reason: reason.clone(),
                }),
                None => Ok(ActionRequest::new("ops/bot", "ops", raw, raw, "v1")),
            }
        }
    }

    /// An engine that returns a fixed tier for every request.
    struct MockEngine {
        tier: Tier,
    }

    impl DecisionEngine for MockEngine {
        fn decide(&self, _request: &ActionRequest) -> Decision {
            let pending = self.tier == Tier::HumanApproval;
            Decision {
                allow: if pending { Allow::PendingApproval } else { Allow::Granted },
                tier: self.tier,
                requires_human_approval: pending,
                approval_routing: pending.then(|| vec!["governance_team".to_string()]),
                justification: "mock".to_string(),
                violations: BTreeSet::new(),
                recommendations: BTreeSet::new(),
                audit_level: AuditLevel::Info,
                simulation_required: false,
                matched_rule: None,
                policy_version: "v1".to_string(),
            }
        }

        fn active_version(&self) -> String {
            "v1".to_string()
        }
    }

    struct MockAudit {
        records: Arc<Mutex<Vec<DecisionRecord>>>,
        fail: bool,
    }

    impl AuditSink for MockAudit {
        fn record(&self, record: &DecisionRecord) -> WardenResult<()> {
            if self.fail {
                return Err(WardenError::AuditWriteFailed {
                    reason: "sink offline".to_string(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct MockEscalation {
        tickets: Arc<Mutex<Vec<Escalation>>>,
    }

    impl EscalationSink for MockEscalation {
        fn escalate(&self, escalation: &Escalation) -> WardenResult<()> {
            self.tickets.lock().unwrap().push(escalation.clone());
            Ok(())
        }
    }

    struct Harness {
        gatekeeper: Gatekeeper,
        records: Arc<Mutex<Vec<DecisionRecord>>>,
        tickets: Arc<Mutex<Vec<Escalation>>>,
    }

    fn harness(tier: Tier, decode_error: Option<&str>, audit_fails: bool) -> Harness {
        let records = Arc::new(Mutex::new(Vec::new()));
        let tickets = Arc::new(Mutex::new(Vec::new()));
        let gatekeeper = Gatekeeper::new(
            Box::new(MockDecoder {
                fail_with: decode_error.map(str::to_string),
            }),
            Box::new(MockEngine { tier }),
            Box::new(MockAudit {
                records: Arc::clone(&records),
                fail: audit_fails,
            }),
            Box::new(MockEscalation {
                tickets: Arc::clone(&tickets),
            }),
        );
        Harness {
            gatekeeper,
            records,
            tickets,
        }
    }

    // ── Tests ────────────────────────────────────────────────────────────────

    /// An auto-approved request is audited once and never escalated.
    #[test]
    fn test_auto_approved_is_audited_not_escalated() {
        let h = harness(Tier::AutoApprove, None, false);
        let decision = h.gatekeeper.submit("get").unwrap();

        assert_eq!(decision.allow, Allow::Granted);
        assert_eq!(h.records.lock().unwrap().len(), 1);
        assert!(h.tickets.lock().unwrap().is_empty());
    }

    /// A tier 2 decision is audited and then handed to the escalation sink
    /// with the same fingerprint.
    #[test]
    fn test_tier_two_is_escalated() {
        let h = harness(Tier::HumanApproval, None, false);
        let decision = h.gatekeeper.submit("delete").unwrap();

        assert_eq!(decision.allow, Allow::PendingApproval);

        let records = h.records.lock().unwrap();
        let tickets = h.tickets.lock().unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].routing, vec!["governance_team".to_string()]);
        assert_eq!(tickets[0].fingerprint, records[0].fingerprint);
    }

    /// A malformed message becomes a critical tier 3 deny and is still audited
    /// (with no request attached).
    #[test]
    fn test_malformed_request_is_denied_and_audited() {
        let h = harness(Tier::AutoApprove, Some("missing field `namespace`"), false);
        let decision = h.gatekeeper.submit("{}").unwrap();

        assert_eq!(decision.allow, Allow::Denied);
        assert_eq!(decision.tier, Tier::AlwaysDeny);
        assert_eq!(decision.audit_level, AuditLevel::Critical);
        assert!(decision.has_critical_violation());
        assert!(
            decision.justification.contains("namespace"),
            "justification should carry the decode reason: {}",
            decision.justification
        );

        let records = h.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].request.is_none());
    }

    /// Audit failure is fatal: the caller gets an error, not a decision, and
    /// no escalation is sent.
    #[test]
    fn test_audit_failure_propagates() {
        let h = harness(Tier::HumanApproval, None, true);
        match h.gatekeeper.submit("delete") {
            Err(WardenError::AuditWriteFailed { reason }) => {
                assert!(reason.contains("sink offline"));
            }
            other => panic!("expected AuditWriteFailed, got {:?}", other),
        }
        assert!(h.tickets.lock().unwrap().is_empty());
    }

    /// Fingerprints are deterministic for identical inputs.
    #[test]
    fn test_fingerprint_is_stable() {
        let h = harness(Tier::AutoApprove, None, false);
        h.gatekeeper.submit("get").unwrap();
        h.gatekeeper.submit("get").unwrap();

        let records = h.records.lock().unwrap();
        assert_eq!(records[0].fingerprint, records[1].fingerprint);
        assert_eq!(records[0].fingerprint.len(), 64);
    }
}
