//! # warden-policy
//!
//! A TOML-driven, tiered decision engine for autonomous-agent actions.
//!
//! ## Overview
//!
//! This crate provides [`TieredPolicyEngine`], which implements the
//! [`DecisionEngine`](warden_core::traits::DecisionEngine) trait. Every
//! request is classified into exactly one tier:
//!
//! | Tier | Meaning | `allow` |
//! |---|---|---|
//! | 0 | auto-approve | `true` unless violations |
//! | 1 | auto-approve with audit (guarded) | `true` unless violations |
//! | 2 | human approval | `"pending_approval"` |
//! | 3 | always deny | `false` |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use warden_policy::TieredPolicyEngine;
//! use warden_core::traits::DecisionEngine;
//!
//! let engine = TieredPolicyEngine::reference()?;
//! let decision = engine.decide(&request);
//! ```
//!
//! ## Layers
//!
//! The rule table ([`rule::RuleTable`]) is pure data. The evaluator is a set
//! of stateless stages that walk it in fixed priority order: [`facts`],
//! [`classifier`], [`router`], [`aggregate`], [`assemble`].

pub mod aggregate;
pub mod assemble;
pub mod classifier;
pub mod conditions;
pub mod engine;
pub mod facts;
pub mod pattern;
pub mod router;
pub mod rule;
pub mod ruleset;
pub mod template;

pub use engine::{evaluate, TieredPolicyEngine};
pub use rule::{Predicate, RoutingRule, RuleTable, TierRule, REFERENCE_RULES};
pub use ruleset::RuleSet;

// ── Tests ─────────────────────────────────────────────────────────────────────
