//! Approval routing for tier 2 decisions.
//!
//! First match wins over the ordered routing rules. When nothing matches,
//! the configured default destinations are used, so a tier 2 decision
//! always carries a non-empty routing list.

use tracing::debug;

use warden_contracts::request::BUDGET_OWNER_TAG;

use crate::{
    conditions::{predicate_holds, EvalContext},
    template::interpolate,
};

/// Used only if the configured default renders to nothing.
pub const LAST_RESORT_DESTINATION: &str = "governance_team";

/// Compute the ordered routing destinations for a tier 2 request.
pub fn route(ctx: &EvalContext<'_>) -> Vec<String> {
    let table = ctx.rules.table();

    let matched = table
        .routing_rules
        .iter()
        .find(|rule| predicate_holds(&rule.predicate, ctx));

    let destinations = match matched {
        Some(rule) => {
            debug!(rule_id = %rule.id, "routing rule matched");
            render_destinations(&rule.destinations, ctx)
        }
        None => Vec::new(),
    };

    if !destinations.is_empty() {
        return destinations;
    }
    let fallback = render_destinations(&table.routing.default, ctx);
    if fallback.is_empty() {
        return vec![LAST_RESORT_DESTINATION.to_string()];
    }
    fallback
}

fn render_destinations(templates: &[String], ctx: &EvalContext<'_>) -> Vec<String> {
    let budget_owner = ctx
        .request
        .tag(BUDGET_OWNER_TAG)
        .unwrap_or(ctx.rules.table().routing.budget_owner_fallback.as_str());

    templates
        .iter()
        .map(|t| {
            interpolate(t, |key| match key {
                "budget_owner" => Some(budget_owner.to_string()),
                "namespace" => Some(ctx.request.namespace.clone()),
                _ => None,
            })
        })
        .filter(|d| !d.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use warden_contracts::ActionRequest;

    use crate::{conditions::EvalContext, facts::Facts, rule::RuleTable, ruleset::RuleSet};

    use super::route;

    fn route_with(rules: &RuleSet, request: &ActionRequest) -> Vec<String> {
        let facts = Facts::extract(request, rules);
        route(&EvalContext {
            request,
            facts: &facts,
            rules,
        })
    }

    #[test]
    fn test_budget_route_uses_owner_tag_or_fallback() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "apply", "kubectl apply", "v");
        req.budget_limit_usd = 100.0;
        req.current_spending_usd = 150.0;

        assert_eq!(route_with(&rules, &req), vec!["finops_team", "governance_team"]);

        req.resource_tags.insert("budget_owner".into(), "alice".into());
        assert_eq!(route_with(&rules, &req), vec!["finops_team", "alice"]);
    }

    /// Budget routing precedes privilege-escalation routing.
    #[test]
    fn test_first_routing_rule_wins() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "exec", "sudo reboot", "v");
        assert_eq!(route_with(&rules, &req), vec!["security_team"]);

        req.budget_limit_usd = 1.0;
        req.current_spending_usd = 2.0;
        assert_eq!(route_with(&rules, &req)[0], "finops_team");
    }

    /// A budget owner tag is used verbatim, never re-interpolated.
    #[test]
    fn test_budget_owner_tag_is_not_expanded() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "apply", "kubectl apply", "v");
        req.budget_limit_usd = 100.0;
        req.current_spending_usd = 150.0;
        req.resource_tags.insert("budget_owner".into(), "{namespace}".into());

        assert_eq!(route_with(&rules, &req), vec!["finops_team", "{namespace}"]);
    }

    #[test]
    fn test_cross_namespace_routes() {
        let rules = RuleSet::reference().unwrap();
        let write = ActionRequest::new("web/bot", "payments", "patch", "kubectl patch svc", "v");
        assert_eq!(route_with(&rules, &write), vec!["namespace_owner", "governance_team"]);

        let read = ActionRequest::new("web/bot", "payments", "get", "kubectl get svc", "v");
        assert_eq!(route_with(&rules, &read), vec!["namespace_payments_owner"]);
    }

    #[test]
    fn test_default_route_when_nothing_matches() {
        let rules = RuleSet::reference().unwrap();
        let req = ActionRequest::new("web/bot", "web", "frobnicate", "frob", "v");
        assert_eq!(route_with(&rules, &req), vec!["governance_team"]);
    }

    /// A routing rule whose destinations all render empty falls back to the
    /// default, keeping routing non-empty.
    #[test]
    fn test_empty_rendered_destinations_fall_back() {
        let table = RuleTable::from_toml_str(
            r#"
            version = "t"

            [[routing_rules]]
            id = "owner-only"
            predicate = { kind = "budget_exceeded" }
            destinations = ["{budget_owner}"]

            [routing]
            default = ["governance_team"]
            budget_owner_fallback = ""
            "#,
        )
        .unwrap();
        let rules = RuleSet::compile(table).unwrap();
        let mut req = ActionRequest::new("web/bot", "web", "apply", "kubectl apply", "t");
        req.current_spending_usd = 5.0;

        assert_eq!(route_with(&rules, &req), vec!["governance_team"]);
    }
}
