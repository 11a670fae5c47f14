//! Decision types emitted by the governance engine.
//!
//! A `Decision` is built fresh for every evaluation and never mutated after
//! the engine returns it. Audit consumers receive it alongside the original
//! `ActionRequest`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Tier ──────────────────────────────────────────────────────────────────────

/// Discrete risk classification of an action.
///
/// Serialized as its integer value (`0`..=`3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    /// Auto-approve.
    AutoApprove,
    /// Auto-approve, with an audit trail at `info`.
    AutoApproveWithAudit,
    /// A human must approve before the action runs.
    HumanApproval,
    /// Never permitted.
    AlwaysDeny,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 4] = [
        Tier::AutoApprove,
        Tier::AutoApproveWithAudit,
        Tier::HumanApproval,
        Tier::AlwaysDeny,
    ];

    pub const fn as_u8(self) -> u8 {
        match self {
            Tier::AutoApprove => 0,
            Tier::AutoApproveWithAudit => 1,
            Tier::HumanApproval => 2,
            Tier::AlwaysDeny => 3,
        }
    }

    /// True for the two tiers that never involve a human.
    pub const fn is_auto_approvable(self) -> bool {
        matches!(self, Tier::AutoApprove | Tier::AutoApproveWithAudit)
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tier::AutoApprove),
            1 => Ok(Tier::AutoApproveWithAudit),
            2 => Ok(Tier::HumanApproval),
            3 => Ok(Tier::AlwaysDeny),
            other => Err(format!("tier must be between 0 and 3, got {other}")),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

// ── Allow ─────────────────────────────────────────────────────────────────────

/// Sentinel string used on the wire for tier 2 decisions.
pub const PENDING_APPROVAL: &str = "pending_approval";

/// The headline outcome of a decision.
///
/// On the wire this is `true`, `false`, or the string `"pending_approval"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AllowRepr", into = "AllowRepr")]
pub enum Allow {
    Granted,
    Denied,
    /// Tier 2 only: neither approved nor denied until a human decides.
    PendingApproval,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AllowRepr {
    Flag(bool),
    Sentinel(String),
}

impl From<Allow> for AllowRepr {
    fn from(allow: Allow) -> Self {
        match allow {
            Allow::Granted => AllowRepr::Flag(true),
            Allow::Denied => AllowRepr::Flag(false),
            Allow::PendingApproval => AllowRepr::Sentinel(PENDING_APPROVAL.to_string()),
        }
    }
}

impl TryFrom<AllowRepr> for Allow {
    type Error = String;

    fn try_from(repr: AllowRepr) -> Result<Self, Self::Error> {
        match repr {
            AllowRepr::Flag(true) => Ok(Allow::Granted),
            AllowRepr::Flag(false) => Ok(Allow::Denied),
            AllowRepr::Sentinel(s) if s == PENDING_APPROVAL => Ok(Allow::PendingApproval),
            AllowRepr::Sentinel(s) => Err(format!(
                "allow must be true, false or \"{PENDING_APPROVAL}\", got \"{s}\""
            )),
        }
    }
}

// ── Audit level / severity ────────────────────────────────────────────────────

/// Log level the audit sink should record a decision at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ── Violation ─────────────────────────────────────────────────────────────────

/// A policy violation attached to a decision.
///
/// Violations explain *why* a request was escalated or denied. Several may
/// be attached to one decision, independent of which rule chose the tier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Stable rule name, e.g. `quota_exceeded`.
    pub rule: String,
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    pub fn new(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
        }
    }
}

// ── Decision ──────────────────────────────────────────────────────────────────

/// The immutable outcome of evaluating one `ActionRequest`.
///
/// Sets are ordered so two evaluations of the same request serialize to
/// identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allow: Allow,
    pub tier: Tier,
    /// True iff `tier` is 2.
    pub requires_human_approval: bool,
    /// Ordered escalation destinations. Present and non-empty iff tier 2.
    pub approval_routing: Option<Vec<String>>,
    /// Exactly one explanation, chosen by rule priority.
    pub justification: String,
    pub violations: BTreeSet<Violation>,
    /// Advisory, non-blocking hints.
    pub recommendations: BTreeSet<String>,
    pub audit_level: AuditLevel,
    pub simulation_required: bool,
    /// Id of the rule that selected the tier, if any rule matched.
    #[serde(default)]
    pub matched_rule: Option<String>,
    /// Version of the rule set this decision was computed against.
    #[serde(default)]
    pub policy_version: String,
}

impl Decision {
    /// True if any attached violation is `critical`.
    pub fn has_critical_violation(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Critical)
    }
}
