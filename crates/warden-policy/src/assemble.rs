//! Decision assembly: turn a classification plus its aggregates into the
//! final `Decision`.

use std::collections::BTreeSet;

use warden_contracts::{Allow, AuditLevel, Decision, Tier, Violation};

use crate::{
    aggregate::{recommendations, violations},
    classifier::Classification,
    conditions::EvalContext,
    facts::Facts,
    template::interpolate,
};

/// Interpolate a justification template.
///
/// Supported placeholders: `{agent_identity}`, `{agent_namespace}`,
/// `{namespace}`, `{operation}`, `{resource_type}`, `{environment}`,
/// `{blast_radius}`, `{overage}`, `{budget_limit}`, `{spending}`,
/// `{target_replicas}`, `{rule_id}`, `{failed_guards}`. Unknown
/// placeholders are left as written.
pub fn render(template: &str, ctx: &EvalContext<'_>, classification: &Classification) -> String {
    let EvalContext { request, facts, .. } = *ctx;

    let failed_guards = classification
        .failed_guards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let replacements: [(&str, String); 13] = [
        ("agent_identity", request.agent_identity.clone()),
        (
            "agent_namespace",
            facts.agent_namespace.clone().unwrap_or_else(|| "unknown".to_string()),
        ),
        ("namespace", request.namespace.clone()),
        ("operation", request.operation.clone()),
        (
            "resource_type",
            request.resource_type.clone().unwrap_or_else(|| "resource".to_string()),
        ),
        ("environment", request.environment.clone()),
        ("blast_radius", facts.blast_radius.to_string()),
        ("overage", format!("{:.2}", facts.budget_overage())),
        ("budget_limit", format!("{:.2}", request.budget_limit_usd)),
        ("spending", format!("{:.2}", request.current_spending_usd)),
        (
            "target_replicas",
            request
                .target_replicas
                .map_or_else(|| "unspecified".to_string(), |r| r.to_string()),
        ),
        (
            "rule_id",
            classification.matched_rule.clone().unwrap_or_default(),
        ),
        ("failed_guards", failed_guards),
    ];

    interpolate(template, |key| {
        replacements
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.clone())
    })
}

/// Total mapping from tier to audit level.
pub const fn audit_level_for(tier: Tier) -> AuditLevel {
    match tier {
        Tier::AutoApprove => AuditLevel::Debug,
        Tier::AutoApproveWithAudit => AuditLevel::Info,
        Tier::HumanApproval => AuditLevel::Warn,
        Tier::AlwaysDeny => AuditLevel::Critical,
    }
}

/// Tier 2 changes that are destructive, or mutating in production, must be
/// simulated before execution.
pub fn simulation_required(tier: Tier, facts: &Facts) -> bool {
    tier == Tier::HumanApproval && (facts.destructive || (facts.production && facts.mutating))
}

/// Auto-approvable tiers are granted only with an empty violation set.
pub fn allow_for(tier: Tier, violations: &BTreeSet<Violation>) -> Allow {
    match tier {
        Tier::AutoApprove | Tier::AutoApproveWithAudit if violations.is_empty() => Allow::Granted,
        Tier::AutoApprove | Tier::AutoApproveWithAudit | Tier::AlwaysDeny => Allow::Denied,
        Tier::HumanApproval => Allow::PendingApproval,
    }
}

/// Build the final decision.
///
/// `routing` must be `Some` exactly when the classification is tier 2.
pub fn assemble(
    ctx: &EvalContext<'_>,
    classification: Classification,
    routing: Option<Vec<String>>,
) -> Decision {
    let tier = classification.tier;
    let justification = render(&classification.template, ctx, &classification);
    let violations = violations(ctx, &classification, &justification);
    let simulation_required = simulation_required(tier, ctx.facts);
    let recommendations = recommendations(ctx, simulation_required);

    Decision {
        allow: allow_for(tier, &violations),
        tier,
        requires_human_approval: tier == Tier::HumanApproval,
        approval_routing: routing,
        justification,
        violations,
        recommendations,
        audit_level: audit_level_for(tier),
        simulation_required,
        matched_rule: classification.matched_rule,
        policy_version: ctx.rules.version().to_string(),
    }
}
