//! Compiled command pattern sets.
//!
//! Patterns use the `regex` crate, whose matcher runs in time linear in the
//! command length, so no configured pattern can cause catastrophic
//! backtracking. A pattern that fails to compile is dropped from its set
//! with a warning: the set keeps working with its remaining patterns, and
//! the bad pattern simply never matches.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::rule::PatternSetConfig;

/// Upper bound on the compiled size of a single pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A pattern that was configured but could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern {
    pub set: String,
    pub pattern: String,
    pub error: String,
}

/// One named set of compiled patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    name: String,
    case_insensitive: bool,
    regexes: Vec<Regex>,
}

impl PatternSet {
    /// Compile every pattern in `config`, collecting failures into `invalid`.
    pub fn compile(name: &str, config: &PatternSetConfig, invalid: &mut Vec<InvalidPattern>) -> Self {
        let mut regexes = Vec::with_capacity(config.patterns.len());

        for pattern in &config.patterns {
            match RegexBuilder::new(pattern)
                .case_insensitive(config.case_insensitive)
                .size_limit(PATTERN_SIZE_LIMIT)
                .build()
            {
                Ok(regex) => regexes.push(regex),
                Err(e) => {
                    warn!(
                        pattern_set = %name,
                        pattern = %pattern,
                        error = %e,
                        "invalid pattern ignored; it will never match"
                    );
                    invalid.push(InvalidPattern {
                        set: name.to_string(),
                        pattern: pattern.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Self {
            name: name.to_string(),
            case_insensitive: config.case_insensitive,
            regexes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Number of patterns that compiled successfully.
    pub fn len(&self) -> usize {
        self.regexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty()
    }

    /// Return true if any pattern in the set matches `command`.
    pub fn matches(&self, command: &str) -> bool {
        self.regexes.iter().any(|r| r.is_match(command))
    }
}

/// All pattern sets of a rule set, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    sets: BTreeMap<String, PatternSet>,
    invalid: Vec<InvalidPattern>,
}

impl PatternLibrary {
    pub fn compile(configs: &BTreeMap<String, PatternSetConfig>) -> Self {
        let mut invalid = Vec::new();
        let sets = configs
            .iter()
            .map(|(name, config)| (name.clone(), PatternSet::compile(name, config, &mut invalid)))
            .collect();
        Self { sets, invalid }
    }

    pub fn get(&self, name: &str) -> Option<&PatternSet> {
        self.sets.get(name)
    }

    pub fn sets(&self) -> impl Iterator<Item = &PatternSet> {
        self.sets.values()
    }

    /// Patterns dropped at compile time.
    pub fn invalid_patterns(&self) -> &[InvalidPattern] {
        &self.invalid
    }

    /// Sets with no usable pattern. Rules naming them never match.
    pub fn empty_sets(&self) -> impl Iterator<Item = &PatternSet> {
        self.sets.values().filter(|set| set.is_empty())
    }
}
