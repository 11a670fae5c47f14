//! The tiered decision engine.
//!
//! `TieredPolicyEngine` owns the active `RuleSet` behind an
//! `RwLock<Arc<RuleSet>>`. An evaluation clones the `Arc` once and then
//! runs entirely against that snapshot, so the lock is held only for the
//! clone and a rule-set swap can never be observed half-way through an
//! evaluation.
//!
//! Evaluation pipeline (see [`evaluate`]):
//!
//! 1. Extract facts from the request.
//! 2. Classify into exactly one tier.
//! 3. For tier 2, compute approval routing.
//! 4. Aggregate violations and recommendations, then assemble the decision.

use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, info};

use warden_contracts::{ActionRequest, Decision, Tier, WardenError, WardenResult};
use warden_core::traits::DecisionEngine;

use crate::{
    assemble::assemble, classifier::classify, conditions::EvalContext, facts::Facts,
    router::route, rule::RuleTable, ruleset::RuleSet,
};

/// Evaluate `request` against one rule-set snapshot.
///
/// Pure and total: no I/O, no locking, and every request yields a decision.
pub fn evaluate(rules: &RuleSet, request: &ActionRequest) -> Decision {
    let facts = Facts::extract(request, rules);
    let ctx = EvalContext {
        request,
        facts: &facts,
        rules,
    };

    let classification = classify(&ctx);
    let routing = (classification.tier == Tier::HumanApproval).then(|| route(&ctx));

    let decision = assemble(&ctx, classification, routing);
    debug!(
        agent_identity = %request.agent_identity,
        namespace = %request.namespace,
        operation = %request.operation,
        tier = %decision.tier,
        matched_rule = ?decision.matched_rule,
        violations = decision.violations.len(),
        "request evaluated"
    );
    decision
}

/// A `DecisionEngine` backed by a swappable TOML rule set.
///
/// ```rust,ignore
/// use warden_policy::TieredPolicyEngine;
///
/// let engine = TieredPolicyEngine::from_file(Path::new("policies/reference.toml"))?;
/// let decision = engine.decide(&request);
/// ```
#[derive(Debug)]
pub struct TieredPolicyEngine {
    active: RwLock<Arc<RuleSet>>,
}

impl TieredPolicyEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            active: RwLock::new(Arc::new(rules)),
        }
    }

    /// An engine running the bundled reference rule table.
    pub fn reference() -> WardenResult<Self> {
        Ok(Self::new(RuleSet::reference()?))
    }

    /// Parse, validate, and compile `s` as a TOML rule table.
    ///
    /// Returns `WardenError::ConfigError` on any parse or validation failure.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        Ok(Self::new(RuleSet::compile(RuleTable::from_toml_str(s)?)?))
    }

    /// Read the rule table at `path`.
    ///
    /// Returns `WardenError::ConfigError` if the file cannot be read or its
    /// contents are not a valid rule table.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        Self::from_toml_str(&read_rules(path)?)
    }

    /// The rule set new evaluations will run against.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Atomically replace the active rule set.
    ///
    /// `version` overrides the table's own version string. The new table
    /// is validated and compiled before the swap, so a rejected table
    /// leaves the active rule set untouched. In-flight evaluations finish
    /// against the snapshot they started with.
    pub fn load_rule_set(&self, version: &str, mut rules: RuleTable) -> WardenResult<()> {
        rules.version = version.to_string();
        let compiled = Arc::new(RuleSet::compile(rules)?);

        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, compiled);
        drop(guard);

        info!(
            previous_version = %previous.version(),
            version = %version,
            "active rule set replaced"
        );
        Ok(())
    }

    /// Re-read `path` and swap it in, keeping the version written in the file.
    pub fn reload_from_file(&self, path: &Path) -> WardenResult<()> {
        let table = RuleTable::from_toml_str(&read_rules(path)?)?;
        let version = table.version.clone();
        self.load_rule_set(&version, table)
    }
}

fn read_rules(path: &Path) -> WardenResult<String> {
    std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
        reason: format!("failed to read rule file '{}': {}", path.display(), e),
    })
}

impl DecisionEngine for TieredPolicyEngine {
    fn decide(&self, request: &ActionRequest) -> Decision {
        evaluate(&self.snapshot(), request)
    }

    fn active_version(&self) -> String {
        self.snapshot().version().to_string()
    }
}
