//! # warden-core
//!
//! The trust boundary of the warden governance engine.
//!
//! This crate provides:
//! - The four collaborator traits (`DecisionEngine`, `RequestDecoder`,
//!   `AuditSink`, `EscalationSink`)
//! - `DecisionRecord` and `Escalation`, the payloads handed to the sinks
//! - The `Gatekeeper` that wires them together for callers holding raw
//!   request messages
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{Gatekeeper, traits::{DecisionEngine, RequestDecoder, AuditSink, EscalationSink}};
//! ```

pub mod gatekeeper;
pub mod record;
pub mod traits;

pub use gatekeeper::Gatekeeper;
pub use record::{DecisionRecord, Escalation};
