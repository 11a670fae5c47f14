//! The compiled, immutable rule-set snapshot the evaluator walks.

use tracing::{debug, warn};

use warden_contracts::{Tier, WardenResult};

use crate::{
    pattern::PatternLibrary,
    rule::{Predicate, RuleTable, TierRule},
};

/// A validated `RuleTable` with its patterns compiled and tier rules grouped
/// by tier.
///
/// A `RuleSet` is never mutated after construction. Policy updates build a
/// new one and swap it in whole.
#[derive(Debug, Clone)]
pub struct RuleSet {
    table: RuleTable,
    patterns: PatternLibrary,
    /// Tier rules indexed by tier value, declaration order preserved.
    by_tier: [Vec<TierRule>; 4],
}

impl RuleSet {
    /// Validate and compile `table`.
    ///
    /// Returns `WardenError::ConfigError` if the table fails validation.
    /// Invalid patterns and references to undefined pattern sets are logged
    /// and tolerated: the affected predicates never match.
    pub fn compile(table: RuleTable) -> WardenResult<Self> {
        table.validate()?;

        let patterns = PatternLibrary::compile(&table.patterns);

        let mut by_tier: [Vec<TierRule>; 4] = Default::default();
        for rule in &table.tier_rules {
            by_tier[usize::from(rule.tier.as_u8())].push(rule.clone());
        }

        let referenced = table
            .tier_rules
            .iter()
            .map(|r| (&r.id, &r.predicate))
            .chain(table.routing_rules.iter().map(|r| (&r.id, &r.predicate)));
        for (rule_id, predicate) in referenced {
            if let Some(name) = pattern_set_of(predicate) {
                if patterns.get(name).is_none() {
                    warn!(
                        rule_id = %rule_id,
                        pattern_set = %name,
                        "rule references an undefined pattern set; it will never match"
                    );
                }
            }
        }

        debug!(
            version = %table.version,
            tier_rules = table.tier_rules.len(),
            routing_rules = table.routing_rules.len(),
            invalid_patterns = patterns.invalid_patterns().len(),
            "rule set compiled"
        );

        Ok(Self {
            table,
            patterns,
            by_tier,
        })
    }

    /// Compile the bundled reference rule table.
    pub fn reference() -> WardenResult<Self> {
        Self::compile(RuleTable::reference()?)
    }

    pub fn version(&self) -> &str {
        &self.table.version
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// Tier rules for `tier`, in declaration order.
    pub fn rules_for(&self, tier: Tier) -> &[TierRule] {
        &self.by_tier[usize::from(tier.as_u8())]
    }
}

fn pattern_set_of(predicate: &Predicate) -> Option<&str> {
    match predicate {
        Predicate::CommandMatches { pattern_set }
        | Predicate::OwnNamespaceCommandMatches { pattern_set } => Some(pattern_set),
        _ => None,
    }
}
