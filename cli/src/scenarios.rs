//! The reference governance scenarios, run end to end through the
//! gatekeeper: raw JSON → schema decoder → tiered engine → audit →
//! escalation.

use serde_json::{json, Value};

use warden_contracts::{Allow, AuditLevel, Decision, Tier, WardenResult};
use warden_core::{traits::DecisionEngine, Gatekeeper};
use warden_intake::SchemaRequestDecoder;
use warden_policy::TieredPolicyEngine;

use crate::sinks::{ConsoleEscalationSink, MemoryAuditSink};

/// One scenario: a raw request and the checks its decision must pass.
struct Scenario {
    label: &'static str,
    title: &'static str,
    request: Value,
    check: fn(&Decision) -> Result<(), String>,
}

/// Outcome of running one scenario.
pub struct ScenarioOutcome {
    pub label: &'static str,
    pub title: &'static str,
    pub decision: Decision,
    pub failure: Option<String>,
}

fn expect(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

fn routes_to(decision: &Decision, destination: &str) -> bool {
    decision
        .approval_routing
        .as_ref()
        .is_some_and(|r| r.iter().any(|d| d == destination))
}

fn scenarios(version: &str) -> Vec<Scenario> {
    vec![
        Scenario {
            label: "A",
            title: "read in own namespace",
            request: json!({
                "agent_identity": "web/deploy-bot",
                "namespace": "web",
                "operation": "get",
                "command": "kubectl get pods -n web",
                "policy_version": version,
            }),
            check: |d| {
                expect(d.tier == Tier::AutoApprove, "expected tier 0")?;
                expect(d.allow == Allow::Granted, "expected allow=true")
            },
        },
        Scenario {
            label: "B",
            title: "delete production database",
            request: json!({
                "agent_identity": "data/migrator",
                "namespace": "data",
                "operation": "delete",
                "command": "dropdb orders",
                "resource_type": "database",
                "environment": "production",
                "affected_resources": ["db/orders"],
                "policy_version": version,
            }),
            check: |d| {
                expect(d.tier == Tier::HumanApproval, "expected tier 2")?;
                expect(d.simulation_required, "expected simulation_required")?;
                expect(routes_to(d, "data_owner"), "expected routing to data_owner")?;
                expect(routes_to(d, "dba_team"), "expected routing to dba_team")
            },
        },
        Scenario {
            label: "C",
            title: "budget exceeded",
            request: json!({
                "agent_identity": "web/deploy-bot",
                "namespace": "web",
                "operation": "apply",
                "command": "kubectl apply -f deploy.yaml",
                "budget_limit_usd": 100,
                "current_spending_usd": 150,
                "policy_version": version,
            }),
            check: |d| {
                expect(d.tier == Tier::HumanApproval, "expected tier 2")?;
                expect(d.justification.contains("50.00"), "expected overage of 50 in justification")?;
                expect(routes_to(d, "finops_team"), "expected routing to finops_team")
            },
        },
        Scenario {
            label: "D",
            title: "credential exposure",
            request: json!({
                "agent_identity": "web/deploy-bot",
                "namespace": "web",
                "operation": "exec",
                "command": "echo $DATABASE_PASSWORD",
                "policy_version": version,
            }),
            check: |d| {
                expect(d.tier == Tier::AlwaysDeny, "expected tier 3")?;
                expect(d.allow == Allow::Denied, "expected allow=false")?;
                expect(d.audit_level == AuditLevel::Critical, "expected critical audit level")
            },
        },
        Scenario {
            label: "E",
            title: "tier 1 write over quota",
            request: json!({
                "agent_identity": "web/deploy-bot",
                "namespace": "web",
                "operation": "apply",
                "command": "kubectl apply -f deploy.yaml",
                "current_cpu_usage": 5,
                "declared_cpu_quota": 4,
                "resource_tags": {
                    "agent_identity": "web/deploy-bot",
                    "cost_center": "CC-100",
                    "project_code": "PRJ-WEB",
                },
                "policy_version": version,
            }),
            check: |d| {
                expect(d.tier == Tier::HumanApproval, "expected escalation to tier 2")?;
                expect(
                    d.violations.iter().any(|v| v.rule == "quota_exceeded"),
                    "expected quota_exceeded violation",
                )
            },
        },
    ]
}

/// Run every reference scenario against `engine`.
pub fn run(engine: TieredPolicyEngine) -> WardenResult<Vec<ScenarioOutcome>> {
    let version = engine.active_version();
    let audit = MemoryAuditSink::new();
    let escalation = ConsoleEscalationSink::quiet();
    let gatekeeper = Gatekeeper::new(
        Box::new(SchemaRequestDecoder::new()?),
        Box::new(engine),
        Box::new(audit.clone()),
        Box::new(escalation.clone()),
    );

    let mut outcomes = Vec::new();
    for scenario in scenarios(&version) {
        let decision = gatekeeper.submit(&scenario.request.to_string())?;
        let failure = (scenario.check)(&decision).err();
        outcomes.push(ScenarioOutcome {
            label: scenario.label,
            title: scenario.title,
            decision,
            failure,
        });
    }

    let escalated = escalation.escalations().len();
    let expected = outcomes
        .iter()
        .filter(|o| o.decision.tier == Tier::HumanApproval)
        .count();
    if escalated != expected || audit.records().len() != outcomes.len() {
        if let Some(last) = outcomes.last_mut() {
            last.failure.get_or_insert_with(|| {
                format!(
                    "collaborator mismatch: {} audit record(s), {} escalation(s) for {} tier 2 decision(s)",
                    audit.records().len(),
                    escalated,
                    expected
                )
            });
        }
    }

    Ok(outcomes)
}
