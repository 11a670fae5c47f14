//! Rule table types and configuration schema.
//!
//! A `RuleTable` is deserialized from TOML and is pure data: tagged
//! predicates, ordered tier rules, ordered routing rules, and the limits
//! and verb lists the predicates consult. `RuleSet::compile` turns it into
//! the immutable snapshot the evaluator walks.
//!
//! Example:
//! ```toml
//! version = "2026.10.1"
//! default_tier = 2
//!
//! [[tier_rules]]
//! id = "deny-credential-exposure"
//! tier = 3
//! justification = "command would expose credentials"
//! predicate = { kind = "command_matches", pattern_set = "credential_exposure" }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use warden_contracts::{Tier, WardenError, WardenResult};

/// The reference rule table bundled with the crate.
pub const REFERENCE_RULES: &str = include_str!("../policies/reference.toml");

/// A boolean test over the extracted facts and the raw request.
///
/// Expressed in TOML as an inline table tagged by `kind`:
/// ```toml
/// predicate = { kind = "destructive_in_production", resource_types = ["database"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Any pattern in the named set matches `command`.
    CommandMatches { pattern_set: String },

    /// Like `CommandMatches`, but only inside the agent's own namespace and
    /// only for operations that neither mutate nor destroy. The command text
    /// alone never vouches for a write.
    OwnNamespaceCommandMatches { pattern_set: String },

    /// Spending exceeds the budget limit.
    BudgetExceeded,

    /// A mutating operation targeting another namespace.
    CrossNamespaceMutation,

    /// A read-only operation targeting another namespace.
    CrossNamespaceRead,

    /// A destructive operation on one of `resource_types` in production.
    DestructiveInProduction { resource_types: Vec<String> },

    /// More affected resources than `limits.max_blast_radius`.
    BlastRadiusAboveCeiling,

    /// One of `operations`, non-destructive, in the agent's own namespace.
    OwnNamespaceWrite { operations: Vec<String> },

    /// Pod deletion of at most `limits.max_auto_delete_pods` resources in
    /// the agent's own namespace.
    BoundedPodDeletion,

    /// A `scale` whose target is at most `limits.max_auto_scale_replicas`,
    /// in the agent's own namespace.
    BoundedScale,

    /// A read-only operation in the agent's own namespace.
    OwnNamespaceRead,

    /// `operation` is one of `operations` (exact, case-sensitive).
    OperationIn { operations: Vec<String> },
}

/// One tier rule. Within a tier, rules are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    /// Stable identifier used in decisions, logs, and error messages.
    pub id: String,

    pub tier: Tier,

    pub predicate: Predicate,

    /// Justification template; see `assemble::render` for placeholders.
    pub justification: String,
}

/// One routing rule. The first matching rule supplies the destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: String,

    pub predicate: Predicate,

    /// Destination templates. `{budget_owner}` and `{namespace}` are
    /// interpolated.
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Separates the home namespace from the agent name.
    pub delimiter: char,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { delimiter: '/' }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment names treated as production (ASCII case-insensitive).
    pub production: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            production: vec!["production".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_blast_radius: usize,
    pub max_auto_scale_replicas: u32,
    pub max_auto_delete_pods: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_blast_radius: 10,
            max_auto_scale_replicas: 10,
            max_auto_delete_pods: 5,
        }
    }
}

/// Operation verb lists. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSets {
    pub read_only: Vec<String>,
    pub mutating: Vec<String>,
    /// Operations that must carry the required cost tags.
    pub tag_required: Vec<String>,
}

impl Default for OperationSets {
    fn default() -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            read_only: owned(&["get", "list", "describe", "watch", "logs"]),
            mutating: owned(&[
                "create", "apply", "update", "patch", "delete", "drop", "truncate", "scale",
            ]),
            tag_required: owned(&["create", "apply", "update", "patch"]),
        }
    }
}

/// A named list of regular expressions matched against `command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSetConfig {
    #[serde(default)]
    pub case_insensitive: bool,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Destinations used when no routing rule matches. Must be non-empty.
    pub default: Vec<String>,
    /// Substituted for `{budget_owner}` when the request has no
    /// `budget_owner` tag.
    pub budget_owner_fallback: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default: vec!["governance_team".to_string()],
            budget_owner_fallback: "governance_team".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Utilization ratio (current / declared) at which a quota warning is
    /// issued.
    pub quota_warning_ratio: f64,
    /// Remaining-budget ratio below which a budget warning is issued.
    pub budget_warning_ratio: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            quota_warning_ratio: 0.8,
            budget_warning_ratio: 0.2,
        }
    }
}

fn default_tier() -> Tier {
    Tier::HumanApproval
}

fn default_justification() -> String {
    "no rule matched operation '{operation}' in namespace '{namespace}'; escalating for human review"
        .to_string()
}

/// The top-level structure deserialized from a TOML rule file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Version string callers compare against `ActionRequest::policy_version`.
    pub version: String,

    /// Tier assigned when no tier rule matches.
    #[serde(default = "default_tier")]
    pub default_tier: Tier,

    #[serde(default = "default_justification")]
    pub default_justification: String,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub operations: OperationSets,

    #[serde(default)]
    pub patterns: BTreeMap<String, PatternSetConfig>,

    /// Ordered tier rules. Grouped by tier at compile time; order within a
    /// tier is preserved.
    #[serde(default)]
    pub tier_rules: Vec<TierRule>,

    /// Ordered routing rules. First match wins.
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

impl RuleTable {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed, does not
    /// match the `RuleTable` schema, or fails validation.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let table: RuleTable = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse rule table TOML: {}", e),
        })?;
        table.validate()?;
        Ok(table)
    }

    /// The bundled reference rule table.
    pub fn reference() -> WardenResult<Self> {
        Self::from_toml_str(REFERENCE_RULES)
    }

    /// Check structural invariants the evaluator relies on.
    ///
    /// Unknown pattern-set references are *not* rejected here: a rule that
    /// references a missing set simply never matches (and is logged when
    /// the table is compiled).
    pub fn validate(&self) -> WardenResult<()> {
        if self.version.trim().is_empty() {
            return Err(config_error("rule table version must not be empty"));
        }
        if self.routing.default.iter().all(|d| d.trim().is_empty()) {
            return Err(config_error("routing.default must list at least one destination"));
        }
        if !(0.0..=1.0).contains(&self.recommendations.quota_warning_ratio)
            || !(0.0..=1.0).contains(&self.recommendations.budget_warning_ratio)
        {
            return Err(config_error("recommendation ratios must lie between 0 and 1"));
        }
        for rule in &self.tier_rules {
            if rule.id.trim().is_empty() {
                return Err(config_error("every tier rule needs a non-empty id"));
            }
        }
        for rule in &self.routing_rules {
            if rule.id.trim().is_empty() {
                return Err(config_error("every routing rule needs a non-empty id"));
            }
            if rule.destinations.is_empty() {
                return Err(config_error(&format!(
                    "routing rule '{}' has no destinations",
                    rule.id
                )));
            }
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> WardenError {
    WardenError::ConfigError {
        reason: reason.to_string(),
    }
}
