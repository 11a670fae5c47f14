//! The action request an agent submits for a governance decision.
//!
//! Every field is plain data supplied by the caller. Budget and quota
//! figures are fetched by the caller *before* evaluation; the engine never
//! performs I/O of its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tag keys every tag-compliant request must carry.
pub const REQUIRED_COST_TAGS: [&str; 3] = ["agent_identity", "cost_center", "project_code"];

/// Optional tag naming the person accountable for the budget.
pub const BUDGET_OWNER_TAG: &str = "budget_owner";

/// A description of one action an autonomous agent intends to perform.
///
/// `agent_identity` defaults to the empty string when omitted so that a
/// missing identity reaches the engine and is denied with an explanatory
/// violation instead of failing to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Verified caller identity, `<namespace>/<name>`.
    #[serde(default)]
    pub agent_identity: String,

    /// Namespace the action targets.
    pub namespace: String,

    /// Action category, e.g. `get`, `apply`, `delete`, `scale`.
    pub operation: String,

    /// Literal invocation text, matched against the rule table's patterns.
    pub command: String,

    #[serde(default)]
    pub resource_type: Option<String>,

    /// Resources the action would touch, in caller order.
    #[serde(default)]
    pub affected_resources: Vec<String>,

    #[serde(default)]
    pub target_replicas: Option<u32>,

    #[serde(default)]
    pub total_size_gb: Option<f64>,

    /// Deployment environment, e.g. `production`, `staging`, `dev`.
    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub current_cpu_usage: f64,
    #[serde(default)]
    pub declared_cpu_quota: f64,
    #[serde(default)]
    pub current_memory_usage: f64,
    #[serde(default)]
    pub declared_memory_quota: f64,
    #[serde(default)]
    pub current_storage_usage: f64,
    #[serde(default)]
    pub declared_storage_quota: f64,

    #[serde(default)]
    pub budget_limit_usd: f64,
    #[serde(default)]
    pub current_spending_usd: f64,

    /// Attribution tags. Sorted so serialized requests are canonical.
    #[serde(default)]
    pub resource_tags: BTreeMap<String, String>,

    /// The rule-set version the caller believes is active.
    pub policy_version: String,
}

impl ActionRequest {
    /// Build a request with the required fields set and everything else
    /// zeroed or empty.
    pub fn new(
        agent_identity: impl Into<String>,
        namespace: impl Into<String>,
        operation: impl Into<String>,
        command: impl Into<String>,
        policy_version: impl Into<String>,
    ) -> Self {
        Self {
            agent_identity: agent_identity.into(),
            namespace: namespace.into(),
            operation: operation.into(),
            command: command.into(),
            policy_version: policy_version.into(),
            ..Self::default()
        }
    }

    /// Return the value of `key` in `resource_tags`, if present and non-empty.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.resource_tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}
