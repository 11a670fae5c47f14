//! Violation and recommendation aggregation.
//!
//! Every rule here fires independently of which tier rule won. Quota and
//! cost-tag violations look at the *candidate* tier, so a Tier-1 action
//! escalated by a failed guard still carries the violation explaining the
//! escalation.

use std::collections::BTreeSet;

use warden_contracts::{request::BUDGET_OWNER_TAG, Severity, Tier, Violation};

use crate::{
    classifier::Classification,
    conditions::{missing_cost_tags, EvalContext},
    facts::QuotaUsage,
};

pub const QUOTA_EXCEEDED: &str = "quota_exceeded";
pub const COST_TAGS_MISSING: &str = "cost_tags_missing";
pub const ALWAYS_DENY: &str = "always_deny";
pub const POLICY_VERSION_MISMATCH: &str = "policy_version_mismatch";
pub const INVALID_AGENT_IDENTITY: &str = "invalid_agent_identity";

/// Collect every violation that applies to this request.
pub fn violations(
    ctx: &EvalContext<'_>,
    classification: &Classification,
    justification: &str,
) -> BTreeSet<Violation> {
    let EvalContext {
        request,
        facts,
        rules,
    } = *ctx;
    let mut out = BTreeSet::new();
    let candidate_auto = classification.candidate_tier().is_auto_approvable();

    if candidate_auto {
        let exceeded: Vec<String> = facts
            .quotas
            .iter()
            .filter(|q| !q.within())
            .map(describe_overrun)
            .collect();
        if !exceeded.is_empty() {
            out.insert(Violation::new(
                QUOTA_EXCEEDED,
                Severity::High,
                format!("quota exceeded: {}", exceeded.join("; ")),
            ));
        }

        let tag_required = rules
            .table()
            .operations
            .tag_required
            .iter()
            .any(|op| *op == request.operation);
        if tag_required {
            let missing = missing_cost_tags(&request.resource_tags);
            if !missing.is_empty() {
                out.insert(Violation::new(
                    COST_TAGS_MISSING,
                    Severity::High,
                    format!(
                        "'{}' requires cost attribution tags; missing: {}",
                        request.operation,
                        missing.join(", ")
                    ),
                ));
            }
        }
    }

    if classification.tier == Tier::AlwaysDeny {
        out.insert(Violation::new(ALWAYS_DENY, Severity::Critical, justification));
    }

    if request.policy_version != rules.version() {
        out.insert(Violation::new(
            POLICY_VERSION_MISMATCH,
            Severity::Critical,
            format!(
                "request assumes policy version '{}' but the active version is '{}'",
                request.policy_version,
                rules.version()
            ),
        ));
    }

    if let Some(fault) = facts.identity_fault {
        out.insert(Violation::new(
            INVALID_AGENT_IDENTITY,
            Severity::Critical,
            format!("{fault}: '{}'", request.agent_identity),
        ));
    }

    out
}

fn describe_overrun(q: &QuotaUsage) -> String {
    format!(
        "{} usage {} exceeds declared quota {}",
        q.resource, q.current, q.declared
    )
}

/// Collect advisory, non-blocking recommendations.
pub fn recommendations(ctx: &EvalContext<'_>, simulation_required: bool) -> BTreeSet<String> {
    let EvalContext {
        request,
        facts,
        rules,
    } = *ctx;
    let table = rules.table();
    let thresholds = &table.recommendations;
    let mut out = BTreeSet::new();

    for q in &facts.quotas {
        if let Some(ratio) = q.utilization() {
            if ratio >= thresholds.quota_warning_ratio && q.within() {
                out.insert(format!(
                    "approaching {:.0}% of {} quota (currently at {:.0}%)",
                    thresholds.quota_warning_ratio * 100.0,
                    q.resource,
                    ratio * 100.0
                ));
            }
        }
    }

    if request.budget_limit_usd > 0.0
        && facts.budget_remaining >= 0.0
        && facts.budget_remaining < request.budget_limit_usd * thresholds.budget_warning_ratio
    {
        out.insert(format!(
            "budget nearly exhausted: ${:.2} of ${:.2} remaining",
            facts.budget_remaining, request.budget_limit_usd
        ));
    }

    let batch_size = table.limits.max_auto_delete_pods;
    if facts.destructive && facts.blast_radius > batch_size {
        out.insert(format!(
            "batch small deletes: split this {}-resource deletion into batches of at most {} to stay within auto-approval limits",
            facts.blast_radius, batch_size
        ));
    }

    if facts.mutating && request.tag(BUDGET_OWNER_TAG).is_none() {
        out.insert(
            "add a budget_owner tag so budget escalations reach an accountable owner".to_string(),
        );
    }

    if simulation_required {
        out.insert("run a dry-run or simulation before executing this change".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use warden_contracts::{ActionRequest, Severity, Violation};

    use crate::{
        classifier::classify, conditions::EvalContext, facts::Facts, ruleset::RuleSet,
    };

    use super::{recommendations, violations, POLICY_VERSION_MISMATCH, QUOTA_EXCEEDED};

    fn run(request: &ActionRequest) -> (BTreeSet<Violation>, BTreeSet<String>) {
        let rules = RuleSet::reference().unwrap();
        let facts = Facts::extract(request, &rules);
        let ctx = EvalContext {
            request,
            facts: &facts,
            rules: &rules,
        };
        let c = classify(&ctx);
        (violations(&ctx, &c, "j"), recommendations(&ctx, false))
    }

    #[test]
    fn test_version_mismatch_is_critical_for_any_tier() {
        let req = ActionRequest::new("web/bot", "web", "get", "kubectl get pods", "1999.1");
        let (v, _) = run(&req);
        let mismatch = v.iter().find(|v| v.rule == POLICY_VERSION_MISMATCH).unwrap();
        assert_eq!(mismatch.severity, Severity::Critical);
        assert!(mismatch.message.contains("1999.1"));
    }

    /// A read over quota is tier 0 but still carries the quota violation.
    #[test]
    fn test_quota_violation_on_tier_zero() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "get", "kubectl get pods", rules.version());
        req.current_memory_usage = 9.0;
        req.declared_memory_quota = 8.0;

        let (v, _) = run(&req);
        assert_eq!(v.len(), 1);
        let only = v.iter().next().unwrap();
        assert_eq!(only.rule, QUOTA_EXCEEDED);
        assert_eq!(only.severity, Severity::High);
        assert!(only.message.contains("memory"), "{}", only.message);
    }

    /// Quota violations are not attached when the request was tier 2 for a
    /// reason unrelated to the Tier-1 guard.
    #[test]
    fn test_no_quota_violation_for_tier_two_match() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "payments", "apply", "kubectl apply", rules.version());
        req.current_cpu_usage = 9.0;
        req.declared_cpu_quota = 8.0;

        let (v, _) = run(&req);
        assert!(v.is_empty(), "unexpected violations: {v:?}");
    }

    #[test]
    fn test_quota_approach_recommendation() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "get", "kubectl get pods", rules.version());
        req.current_cpu_usage = 3.4;
        req.declared_cpu_quota = 4.0;

        let (_, r) = run(&req);
        assert!(
            r.iter().any(|s| s.contains("approaching 80% of CPU quota")),
            "recommendations: {r:?}"
        );
    }

    #[test]
    fn test_batch_delete_recommendation() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "delete", "kubectl delete pods", rules.version());
        req.resource_type = Some("pod".into());
        req.affected_resources = (0..8).map(|i| format!("pod/p{i}")).collect();

        let (_, r) = run(&req);
        assert!(r.iter().any(|s| s.starts_with("batch small deletes")), "{r:?}");
    }
}
