//! # warden-contracts
//!
//! Shared types for the warden governance engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod decision;
pub mod error;
pub mod request;

pub use decision::{Allow, AuditLevel, Decision, Severity, Tier, Violation, PENDING_APPROVAL};
pub use error::{WardenError, WardenResult};
pub use request::ActionRequest;
