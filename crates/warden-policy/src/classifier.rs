//! Tier classification.
//!
//! Evaluation order is fixed and never data-dependent:
//!
//! 0. Identity gate: a missing or malformed identity is tier 3.
//! 1. Tier 3 rules. Any match → tier 3.
//! 2. Tier 2 rules. Any match → tier 2.
//! 3. Tier 1 rules. A match is tier 1 only if the guard (quota within
//!    bounds AND cost tags present) also holds; otherwise the request
//!    escalates straight to tier 2 and never falls through to tier 0.
//! 4. Tier 0 rules. Any match → tier 0.
//! 5. Otherwise → the rule table's `default_tier`.
//!
//! Within a tier, rules are tried in declaration order and the first match
//! supplies the justification template.

use std::fmt;

use tracing::{debug, warn};

use warden_contracts::Tier;

use crate::{
    conditions::{cost_tags_present, predicate_holds, quota_within_bounds, EvalContext},
    rule::TierRule,
};

/// Rule id reported when the identity gate fires.
pub const IDENTITY_GATE: &str = "identity-gate";

const IDENTITY_JUSTIFICATION: &str =
    "agent identity '{agent_identity}' is missing or malformed; denying by default";

const GUARD_JUSTIFICATION: &str = "'{operation}' in namespace '{namespace}' matched auto-approval rule '{rule_id}' but failed operational guardrails ({failed_guards}); escalating for human review";

/// A Tier-1 guardrail that must hold for auto-approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    QuotaWithinBounds,
    CostTagsPresent,
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::QuotaWithinBounds => f.write_str("quota exceeded"),
            Guard::CostTagsPresent => f.write_str("cost tags missing"),
        }
    }
}

/// The classifier's verdict for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: Tier,
    /// Id of the rule that selected the tier; `None` for the default tier.
    pub matched_rule: Option<String>,
    /// Justification template for the winning rule (not yet interpolated).
    pub template: String,
    /// Set when a Tier-1 match escalated because a guard failed.
    pub escalated_from: Option<Tier>,
    pub failed_guards: Vec<Guard>,
}

impl Classification {
    /// The tier the action pattern asked for, before any guard escalation.
    pub fn candidate_tier(&self) -> Tier {
        self.escalated_from.unwrap_or(self.tier)
    }

    fn matched(rule: &TierRule) -> Self {
        Self {
            tier: rule.tier,
            matched_rule: Some(rule.id.clone()),
            template: rule.justification.clone(),
            escalated_from: None,
            failed_guards: Vec::new(),
        }
    }
}

/// Classify the request in `ctx` into exactly one tier.
pub fn classify(ctx: &EvalContext<'_>) -> Classification {
    if let Some(fault) = ctx.facts.identity_fault {
        debug!(fault = %fault, "identity gate denies request");
        return Classification {
            tier: Tier::AlwaysDeny,
            matched_rule: Some(IDENTITY_GATE.to_string()),
            template: IDENTITY_JUSTIFICATION.to_string(),
            escalated_from: None,
            failed_guards: Vec::new(),
        };
    }

    for tier in [Tier::AlwaysDeny, Tier::HumanApproval] {
        if let Some(rule) = first_match(ctx, tier) {
            return Classification::matched(rule);
        }
    }

    if let Some(rule) = first_match(ctx, Tier::AutoApproveWithAudit) {
        let failed_guards = failed_guards(ctx);
        if failed_guards.is_empty() {
            return Classification::matched(rule);
        }
        debug!(
            rule_id = %rule.id,
            failed_guards = ?failed_guards,
            "tier 1 guard failed; escalating to tier 2"
        );
        return Classification {
            tier: Tier::HumanApproval,
            matched_rule: Some(rule.id.clone()),
            template: GUARD_JUSTIFICATION.to_string(),
            escalated_from: Some(Tier::AutoApproveWithAudit),
            failed_guards,
        };
    }

    if let Some(rule) = first_match(ctx, Tier::AutoApprove) {
        return Classification::matched(rule);
    }

    let table = ctx.rules.table();
    warn!(
        operation = %ctx.request.operation,
        namespace = %ctx.request.namespace,
        default_tier = %table.default_tier,
        "no tier rule matched; applying default tier"
    );
    Classification {
        tier: table.default_tier,
        matched_rule: None,
        template: table.default_justification.clone(),
        escalated_from: None,
        failed_guards: Vec::new(),
    }
}

fn first_match<'r>(ctx: &EvalContext<'r>, tier: Tier) -> Option<&'r TierRule> {
    let found = ctx
        .rules
        .rules_for(tier)
        .iter()
        .find(|rule| predicate_holds(&rule.predicate, ctx));
    if let Some(rule) = found {
        debug!(rule_id = %rule.id, tier = %tier, "tier rule matched");
    }
    found
}

/// Guards that fail for this request, in fixed order.
pub fn failed_guards(ctx: &EvalContext<'_>) -> Vec<Guard> {
    let mut failed = Vec::new();
    if !quota_within_bounds(ctx.facts) {
        failed.push(Guard::QuotaWithinBounds);
    }
    if !cost_tags_present(&ctx.request.resource_tags) {
        failed.push(Guard::CostTagsPresent);
    }
    failed
}

#[cfg(test)]
mod tests {
    use warden_contracts::{ActionRequest, Tier};

    use crate::{
        conditions::EvalContext,
        facts::Facts,
        rule::RuleTable,
        ruleset::RuleSet,
    };

    use super::{classify, Classification, Guard, IDENTITY_GATE};

    fn classify_with(rules: &RuleSet, request: &ActionRequest) -> Classification {
        let facts = Facts::extract(request, rules);
        classify(&EvalContext {
            request,
            facts: &facts,
            rules,
        })
    }

    fn tagged(mut req: ActionRequest) -> ActionRequest {
        for (k, v) in [
            ("agent_identity", req.agent_identity.clone()),
            ("cost_center", "CC-42".to_string()),
            ("project_code", "PRJ-7".to_string()),
        ] {
            req.resource_tags.insert(k.to_string(), v);
        }
        req
    }

    /// Tier 3 wins even when tier 2, 1 and 0 predicates also match.
    #[test]
    fn test_tier_three_dominates() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new(
            "web/bot",
            "payments",
            "get",
            "kubectl get pods && echo $API_TOKEN",
            "v",
        );
        req.budget_limit_usd = 10.0;
        req.current_spending_usd = 20.0;

        let c = classify_with(&rules, &req);
        assert_eq!(c.tier, Tier::AlwaysDeny);
        assert_eq!(c.matched_rule.as_deref(), Some("deny-credential-exposure"));
    }

    /// Within a tier, the first rule in declaration order wins.
    #[test]
    fn test_first_rule_in_tier_wins() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "payments", "apply", "sudo kubectl apply", "v");
        req.budget_limit_usd = 10.0;
        req.current_spending_usd = 20.0;

        let c = classify_with(&rules, &req);
        assert_eq!(c.tier, Tier::HumanApproval);
        assert_eq!(c.matched_rule.as_deref(), Some("approve-budget-exceeded"));
    }

    /// A Tier-1 action that fails its guard escalates to tier 2 and never
    /// drops through to tier 0.
    #[test]
    fn test_tier_one_guard_escalates() {
        let rules = RuleSet::reference().unwrap();
        let req = ActionRequest::new("web/bot", "web", "apply", "kubectl apply -f deploy.yaml", "v");

        let c = classify_with(&rules, &req);
        assert_eq!(c.tier, Tier::HumanApproval);
        assert_eq!(c.escalated_from, Some(Tier::AutoApproveWithAudit));
        assert_eq!(c.candidate_tier(), Tier::AutoApproveWithAudit);
        assert_eq!(c.failed_guards, vec![Guard::CostTagsPresent]);

        let c = classify_with(&rules, &tagged(req));
        assert_eq!(c.tier, Tier::AutoApproveWithAudit);
        assert!(c.failed_guards.is_empty());
    }

    #[test]
    fn test_identity_gate() {
        let rules = RuleSet::reference().unwrap();
        let req = ActionRequest::new("nobody", "web", "get", "kubectl get pods", "v");

        let c = classify_with(&rules, &req);
        assert_eq!(c.tier, Tier::AlwaysDeny);
        assert_eq!(c.matched_rule.as_deref(), Some(IDENTITY_GATE));
    }

    /// Unmatched requests get the configured default tier.
    #[test]
    fn test_default_tier_is_configurable() {
        let rules = RuleSet::reference().unwrap();
        let req = ActionRequest::new("web/bot", "web", "frobnicate", "frob --all", "v");
        let c = classify_with(&rules, &req);
        assert_eq!(c.tier, Tier::HumanApproval);
        assert!(c.matched_rule.is_none());

        let strict = RuleSet::compile(
            RuleTable::from_toml_str(
                r#"
                version = "strict"
                default_tier = 3
                "#,
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(classify_with(&strict, &req).tier, Tier::AlwaysDeny);
    }

    #[test]
    fn test_cross_namespace_read_falls_to_default() {
        let rules = RuleSet::reference().unwrap();
        let req = ActionRequest::new("web/bot", "payments", "get", "kubectl get pods -n payments", "v");
        let c = classify_with(&rules, &req);
        assert_eq!(c.tier, Tier::HumanApproval);
        assert!(c.matched_rule.is_none());
    }
}
