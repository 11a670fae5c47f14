//! Fact extraction: normalize a raw request into typed facts.
//!
//! No decision logic lives here. A structurally invalid identity is not an
//! error; it is recorded as `identity_fault` so later stages can still
//! produce a (deny) decision.

use std::fmt;

use warden_contracts::ActionRequest;

use crate::{conditions::is_destructive, ruleset::RuleSet};

/// Why an `agent_identity` could not yield a home namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityFault {
    /// Empty or whitespace-only.
    Missing,
    /// Not of the form `<namespace><delimiter><name>`.
    Malformed,
}

impl fmt::Display for IdentityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityFault::Missing => f.write_str("agent identity is missing"),
            IdentityFault::Malformed => f.write_str("agent identity is malformed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaResource {
    Cpu,
    Memory,
    Storage,
}

impl fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuotaResource::Cpu => "CPU",
            QuotaResource::Memory => "memory",
            QuotaResource::Storage => "storage",
        };
        f.write_str(s)
    }
}

/// Current usage against a declared quota for one resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaUsage {
    pub resource: QuotaResource,
    pub current: f64,
    pub declared: f64,
}

impl QuotaUsage {
    /// `current < declared`, except that zero usage is always within bounds.
    ///
    /// A declared quota of zero is not "unbounded": any nonzero usage
    /// against it fails.
    pub fn within(&self) -> bool {
        self.current <= 0.0 || self.current < self.declared
    }

    /// `current / declared`, or `None` when nothing is declared.
    pub fn utilization(&self) -> Option<f64> {
        (self.declared > 0.0).then(|| self.current / self.declared)
    }
}

/// Typed facts derived from one `ActionRequest`.
#[derive(Debug, Clone, PartialEq)]
pub struct Facts {
    /// First segment of `agent_identity`, when the identity is well formed.
    pub agent_namespace: Option<String>,
    pub identity_fault: Option<IdentityFault>,
    /// `budget_limit_usd - current_spending_usd`; negative when over budget.
    pub budget_remaining: f64,
    /// True when the target namespace differs from the agent's home
    /// namespace. Always true when the identity is invalid.
    pub cross_namespace: bool,
    pub blast_radius: usize,
    pub quotas: [QuotaUsage; 3],
    pub read_only: bool,
    pub mutating: bool,
    pub destructive: bool,
    pub production: bool,
}

impl Facts {
    pub fn extract(request: &ActionRequest, rules: &RuleSet) -> Self {
        let table = rules.table();

        let (agent_namespace, identity_fault) =
            match agent_namespace(&request.agent_identity, table.identity.delimiter) {
                Ok(ns) => (Some(ns.to_string()), None),
                Err(fault) => (None, Some(fault)),
            };

        let cross_namespace = agent_namespace
            .as_deref()
            .map_or(true, |home| home != request.namespace);

        let op = request.operation.as_str();
        let production = table
            .environment
            .production
            .iter()
            .any(|env| env.eq_ignore_ascii_case(request.environment.trim()));

        Self {
            agent_namespace,
            identity_fault,
            budget_remaining: request.budget_limit_usd - request.current_spending_usd,
            cross_namespace,
            blast_radius: request.affected_resources.len(),
            quotas: [
                QuotaUsage {
                    resource: QuotaResource::Cpu,
                    current: request.current_cpu_usage,
                    declared: request.declared_cpu_quota,
                },
                QuotaUsage {
                    resource: QuotaResource::Memory,
                    current: request.current_memory_usage,
                    declared: request.declared_memory_quota,
                },
                QuotaUsage {
                    resource: QuotaResource::Storage,
                    current: request.current_storage_usage,
                    declared: request.declared_storage_quota,
                },
            ],
            read_only: table.operations.read_only.iter().any(|o| o == op),
            mutating: table.operations.mutating.iter().any(|o| o == op),
            destructive: is_destructive(op),
            production,
        }
    }

    pub fn identity_valid(&self) -> bool {
        self.identity_fault.is_none()
    }

    /// Amount by which spending exceeds the limit, or zero.
    pub fn budget_overage(&self) -> f64 {
        (-self.budget_remaining).max(0.0)
    }
}

/// Split `identity` into its home namespace.
///
/// The identity must be `<namespace><delimiter><name>` where both parts are
/// non-empty and neither contains whitespace.
pub fn agent_namespace(identity: &str, delimiter: char) -> Result<&str, IdentityFault> {
    if identity.trim().is_empty() {
        return Err(IdentityFault::Missing);
    }
    if identity.chars().any(char::is_whitespace) {
        return Err(IdentityFault::Malformed);
    }
    match identity.split_once(delimiter) {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(ns),
        _ => Err(IdentityFault::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use warden_contracts::ActionRequest;

    use crate::ruleset::RuleSet;

    use super::{agent_namespace, Facts, IdentityFault, QuotaResource, QuotaUsage};

    #[test]
    fn test_agent_namespace_takes_first_segment() {
        assert_eq!(agent_namespace("payments/deploy-bot", '/'), Ok("payments"));
        assert_eq!(agent_namespace("payments/bots/deploy", '/'), Ok("payments"));
    }

    #[test]
    fn test_agent_namespace_faults() {
        assert_eq!(agent_namespace("", '/'), Err(IdentityFault::Missing));
        assert_eq!(agent_namespace("   ", '/'), Err(IdentityFault::Missing));
        assert_eq!(agent_namespace("no-delimiter", '/'), Err(IdentityFault::Malformed));
        assert_eq!(agent_namespace("/bot", '/'), Err(IdentityFault::Malformed));
        assert_eq!(agent_namespace("payments/", '/'), Err(IdentityFault::Malformed));
        assert_eq!(agent_namespace("pay ments/bot", '/'), Err(IdentityFault::Malformed));
    }

    #[test]
    fn test_extract_derives_budget_and_namespace_facts() {
        let rules = RuleSet::reference().unwrap();
        let mut req = ActionRequest::new("payments/bot", "ledger", "delete", "kubectl delete pod x", "v");
        req.budget_limit_usd = 100.0;
        req.current_spending_usd = 150.0;
        req.affected_resources = vec!["pod/a".into(), "pod/b".into()];
        req.environment = "Production".into();

        let facts = Facts::extract(&req, &rules);

        assert_eq!(facts.agent_namespace.as_deref(), Some("payments"));
        assert!(facts.identity_valid());
        assert!(facts.cross_namespace);
        assert_eq!(facts.budget_remaining, -50.0);
        assert_eq!(facts.budget_overage(), 50.0);
        assert_eq!(facts.blast_radius, 2);
        assert!(facts.mutating && facts.destructive && !facts.read_only);
        assert!(facts.production, "environment match is case-insensitive");
    }

    /// Without a valid identity there is no proven home namespace, so every
    /// target counts as cross-namespace.
    #[test]
    fn test_invalid_identity_is_cross_namespace() {
        let rules = RuleSet::reference().unwrap();
        let req = ActionRequest::new("", "payments", "get", "kubectl get pods", "v");
        let facts = Facts::extract(&req, &rules);

        assert_eq!(facts.identity_fault, Some(IdentityFault::Missing));
        assert!(facts.cross_namespace);
    }

    #[test]
    fn test_quota_usage_zero_declared_is_not_unbounded() {
        let usage = |current, declared| QuotaUsage {
            resource: QuotaResource::Cpu,
            current,
            declared,
        };
        assert!(usage(0.0, 0.0).within());
        assert!(!usage(0.5, 0.0).within());
        assert!(usage(3.0, 4.0).within());
        assert!(!usage(4.0, 4.0).within());
        assert_eq!(usage(3.0, 4.0).utilization(), Some(0.75));
        assert_eq!(usage(3.0, 0.0).utilization(), None);
    }
}
