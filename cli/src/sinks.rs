//! In-memory audit and escalation sinks for the command line.
//!
//! Both sinks keep their entries behind `Arc<Mutex<_>>`. Cloning a sink
//! shares the same storage, so one clone can be boxed into the
//! `Gatekeeper` while another is kept to read the entries back.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use warden_contracts::{WardenError, WardenResult};
use warden_core::{
    traits::{AuditSink, EscalationSink},
    DecisionRecord, Escalation,
};

// ── Audit ─────────────────────────────────────────────────────────────────────

/// Append-only in-memory audit sink.
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<DecisionRecord>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far, in append order.
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<DecisionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &DecisionRecord) -> WardenResult<()> {
        let mut records = self.records.lock().map_err(|e| WardenError::AuditWriteFailed {
            reason: format!("audit log lock poisoned: {}", e),
        })?;
        records.push(record.clone());
        info!(
            fingerprint = %record.fingerprint,
            tier = %record.decision.tier,
            sequence = records.len() - 1,
            "decision audited"
        );
        Ok(())
    }
}

// ── Escalation ────────────────────────────────────────────────────────────────

/// Queues tier 2 hand-offs and reports each one on stderr.
#[derive(Clone, Default)]
pub struct ConsoleEscalationSink {
    queue: Arc<Mutex<Vec<Escalation>>>,
    quiet: bool,
}

impl ConsoleEscalationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that queues without printing.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn escalations(&self) -> Vec<Escalation> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EscalationSink for ConsoleEscalationSink {
    fn escalate(&self, escalation: &Escalation) -> WardenResult<()> {
        let mut queue = self.queue.lock().map_err(|e| WardenError::EscalationFailed {
            reason: format!("escalation queue lock poisoned: {}", e),
        })?;
        queue.push(escalation.clone());
        if !self.quiet {
            eprintln!(
                "escalated to [{}]{}: {}",
                escalation.routing.join(", "),
                if escalation.simulation_required {
                    " (simulation required)"
                } else {
                    ""
                },
                escalation.justification
            );
        }
        Ok(())
    }
}
