//! warden: governance decisions for autonomous-agent actions.
//!
//! Evaluates action requests against a tiered rule table and prints the
//! resulting decision as JSON.
//!
//! Usage:
//!   warden evaluate request.json
//!   cat request.json | warden evaluate --rules policies/custom.toml
//!   warden check-rules --rules policies/custom.toml
//!   warden scenarios

mod scenarios;
mod sinks;

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use warden_contracts::{Allow, Tier, WardenError, WardenResult};
use warden_core::{traits::DecisionEngine, Gatekeeper};
use warden_intake::SchemaRequestDecoder;
use warden_policy::TieredPolicyEngine;

use crate::sinks::{ConsoleEscalationSink, MemoryAuditSink};

// ── CLI definition ────────────────────────────────────────────────────────────

/// warden: tiered governance decisions for agent actions.
///
/// Each request is classified as auto-approve (0), auto-approve with audit
/// (1), human approval (2), or always deny (3).
#[derive(Parser)]
#[command(
    name = "warden",
    about = "Tiered governance decisions for autonomous-agent actions",
    long_about = "Classifies agent action requests into approval tiers against a TOML rule table,\n\
                  with violations, recommendations, and approval routing."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one JSON request and print the decision.
    Evaluate {
        /// Request file. Reads stdin when omitted or `-`.
        input: Option<PathBuf>,

        #[command(flatten)]
        rules: RulesArgs,

        /// Print the full audit record (request, decision, fingerprint).
        #[arg(long)]
        record: bool,
    },
    /// Compile a rule table and summarize it.
    CheckRules {
        #[command(flatten)]
        rules: RulesArgs,
    },
    /// Run the reference scenarios end to end.
    Scenarios {
        #[command(flatten)]
        rules: RulesArgs,
    },
}

#[derive(Args)]
struct RulesArgs {
    /// Rule table TOML. Defaults to the bundled reference table.
    #[arg(long, value_name = "PATH")]
    rules: Option<PathBuf>,

    /// Override the active rule-set version.
    #[arg(long, value_name = "VERSION")]
    policy_version: Option<String>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to trace every matched rule.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Evaluate {
            input,
            rules,
            record,
        } => run_evaluate(input.as_deref(), &rules, record),
        Command::CheckRules { rules } => run_check_rules(&rules),
        Command::Scenarios { rules } => run_scenarios(&rules),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("warden: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Engine loading ────────────────────────────────────────────────────────────

fn load_engine(args: &RulesArgs) -> WardenResult<TieredPolicyEngine> {
    let engine = match &args.rules {
        Some(path) => TieredPolicyEngine::from_file(path)?,
        None => TieredPolicyEngine::reference()?,
    };
    if let Some(version) = &args.policy_version {
        let table = engine.snapshot().table().clone();
        engine.load_rule_set(version, table)?;
    }
    Ok(engine)
}

fn read_input(input: Option<&Path>) -> WardenResult<String> {
    let mut raw = String::new();
    match input {
        Some(path) if path != Path::new("-") => {
            raw = std::fs::read_to_string(path).map_err(|e| WardenError::MalformedRequest {
                reason: format!("failed to read request file '{}': {}", path.display(), e),
            })?;
        }
        _ => {
            std::io::stdin()
                .read_to_string(&mut raw)
                .map_err(|e| WardenError::MalformedRequest {
                    reason: format!("failed to read request from stdin: {}", e),
                })?;
        }
    }
    Ok(raw)
}

fn to_json<T: serde::Serialize>(value: &T) -> WardenResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| WardenError::AuditWriteFailed {
        reason: format!("failed to serialize output: {}", e),
    })
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// Returns `Ok(false)` when the decision does not grant the action.
fn run_evaluate(input: Option<&Path>, rules: &RulesArgs, record: bool) -> WardenResult<bool> {
    let engine = load_engine(rules)?;
    let raw = read_input(input)?;

    let audit = MemoryAuditSink::new();
    let gatekeeper = Gatekeeper::new(
        Box::new(SchemaRequestDecoder::new()?),
        Box::new(engine),
        Box::new(audit.clone()),
        Box::new(ConsoleEscalationSink::new()),
    );

    let decision = gatekeeper.submit(&raw)?;

    let output = match audit.last() {
        Some(entry) if record => to_json(&entry)?,
        _ => to_json(&decision)?,
    };
    println!("{}", output);

    Ok(decision.allow == Allow::Granted)
}

fn run_check_rules(rules: &RulesArgs) -> WardenResult<bool> {
    let engine = load_engine(rules)?;
    let snapshot = engine.snapshot();
    let table = snapshot.table();

    println!("rule set {}", snapshot.version());
    println!("  default tier:  {}", table.default_tier);
    for tier in Tier::ALL.iter().rev() {
        let ids: Vec<&str> = snapshot
            .rules_for(*tier)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        println!("  tier {} rules: {} [{}]", tier, ids.len(), ids.join(", "));
    }
    println!(
        "  routing rules: {} (default: {})",
        table.routing_rules.len(),
        table.routing.default.join(", ")
    );
    for set in snapshot.patterns().sets() {
        println!(
            "  patterns {:<24} {:>2} compiled{}",
            set.name(),
            set.len(),
            if set.is_case_insensitive() {
                ", case-insensitive"
            } else {
                ""
            }
        );
    }

    for empty in snapshot.patterns().empty_sets() {
        println!("  EMPTY {}: no usable patterns, rules naming it never match", empty.name());
    }

    let invalid = snapshot.patterns().invalid_patterns();
    for bad in invalid {
        println!("  INVALID {}: {} ({})", bad.set, bad.pattern, bad.error);
    }
    if !invalid.is_empty() {
        return Err(WardenError::ConfigError {
            reason: format!("{} pattern(s) failed to compile", invalid.len()),
        });
    }
    Ok(true)
}

fn run_scenarios(rules: &RulesArgs) -> WardenResult<bool> {
    let engine = load_engine(rules)?;
    println!("warden reference scenarios (rule set {})", engine.active_version());
    println!();

    let outcomes = scenarios::run(engine)?;
    let mut all_passed = true;
    for outcome in &outcomes {
        let d = &outcome.decision;
        println!("=== Scenario {}: {} ===", outcome.label, outcome.title);
        println!("  tier:          {}", d.tier);
        println!(
            "  allow:         {}",
            serde_json::to_string(&d.allow).unwrap_or_default()
        );
        println!("  matched rule:  {}", d.matched_rule.as_deref().unwrap_or("(default)"));
        println!("  justification: {}", d.justification);
        if let Some(routing) = &d.approval_routing {
            println!("  routing:       {}", routing.join(", "));
        }
        for v in &d.violations {
            println!("  violation:     [{}] {}: {}", v.severity, v.rule, v.message);
        }
        for r in &d.recommendations {
            println!("  recommend:     {}", r);
        }
        match &outcome.failure {
            None => println!("  RESULT: PASS"),
            Some(reason) => {
                all_passed = false;
                println!("  RESULT: FAIL ({})", reason);
            }
        }
        println!();
    }
    Ok(all_passed)
}
