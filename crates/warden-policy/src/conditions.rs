//! Condition evaluators: small pure predicates consumed by the classifier
//! and the router.

use std::collections::BTreeMap;

use warden_contracts::{request::REQUIRED_COST_TAGS, ActionRequest};

use crate::{facts::Facts, pattern::PatternSet, rule::Predicate, ruleset::RuleSet};

/// Operations that destroy data or resources.
pub const DESTRUCTIVE_OPERATIONS: [&str; 3] = ["delete", "drop", "truncate"];

/// Everything a predicate may consult during one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub request: &'a ActionRequest,
    pub facts: &'a Facts,
    pub rules: &'a RuleSet,
}

/// True when every quota pair is within bounds.
pub fn quota_within_bounds(facts: &Facts) -> bool {
    facts.quotas.iter().all(|q| q.within())
}

/// True when all required cost tags are present and non-empty.
pub fn cost_tags_present(tags: &BTreeMap<String, String>) -> bool {
    missing_cost_tags(tags).is_empty()
}

/// Required cost tags that are absent or blank, in canonical order.
pub fn missing_cost_tags(tags: &BTreeMap<String, String>) -> Vec<&'static str> {
    REQUIRED_COST_TAGS
        .iter()
        .copied()
        .filter(|key| tags.get(*key).map_or(true, |v| v.trim().is_empty()))
        .collect()
}

pub fn is_destructive(operation: &str) -> bool {
    DESTRUCTIVE_OPERATIONS.contains(&operation)
}

/// True when `set` is defined and any of its patterns matches `command`.
///
/// An undefined set never matches.
pub fn matches_any(command: &str, set: Option<&PatternSet>) -> bool {
    set.is_some_and(|s| s.matches(command))
}

/// Evaluate one tagged predicate.
pub fn predicate_holds(predicate: &Predicate, ctx: &EvalContext<'_>) -> bool {
    let EvalContext {
        request,
        facts,
        rules,
    } = *ctx;
    let limits = &rules.table().limits;
    let own_namespace = facts.identity_valid() && !facts.cross_namespace;

    match predicate {
        Predicate::CommandMatches { pattern_set } => {
            matches_any(&request.command, rules.patterns().get(pattern_set))
        }
        Predicate::OwnNamespaceCommandMatches { pattern_set } => {
            own_namespace
                && !facts.mutating
                && !facts.destructive
                && matches_any(&request.command, rules.patterns().get(pattern_set))
        }
        Predicate::BudgetExceeded => facts.budget_remaining < 0.0,
        Predicate::CrossNamespaceMutation => facts.cross_namespace && facts.mutating,
        Predicate::CrossNamespaceRead => facts.cross_namespace && facts.read_only,
        Predicate::DestructiveInProduction { resource_types } => {
            facts.destructive
                && facts.production
                && request.resource_type.as_deref().is_some_and(|rt| {
                    resource_types.iter().any(|t| t.eq_ignore_ascii_case(rt))
                })
        }
        Predicate::BlastRadiusAboveCeiling => facts.blast_radius > limits.max_blast_radius,
        Predicate::OwnNamespaceWrite { operations } => {
            own_namespace
                && !facts.destructive
                && operations.iter().any(|op| *op == request.operation)
        }
        Predicate::BoundedPodDeletion => {
            own_namespace
                && request.operation == "delete"
                && request
                    .resource_type
                    .as_deref()
                    .is_some_and(|rt| rt.eq_ignore_ascii_case("pod") || rt.eq_ignore_ascii_case("pods"))
                && facts.blast_radius <= limits.max_auto_delete_pods
        }
        Predicate::BoundedScale => {
            own_namespace
                && request.operation == "scale"
                && request
                    .target_replicas
                    .is_some_and(|r| r <= limits.max_auto_scale_replicas)
        }
        Predicate::OwnNamespaceRead => own_namespace && facts.read_only,
        Predicate::OperationIn { operations } => {
            operations.iter().any(|op| *op == request.operation)
        }
    }
}
