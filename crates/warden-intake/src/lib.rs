//! # warden-intake
//!
//! Request intake for the warden governance engine.
//!
//! This crate provides [`decoder::SchemaRequestDecoder`], which implements
//! the [`warden_core::traits::RequestDecoder`] trait. Raw messages are
//! validated against the bundled JSON Schema
//! ([`decoder::ACTION_REQUEST_SCHEMA`]) before being deserialized, so a
//! rejected message lists every structural problem at once.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use warden_intake::SchemaRequestDecoder;
//! use warden_core::traits::RequestDecoder;
//!
//! let decoder = SchemaRequestDecoder::new()?;
//! let request = decoder.decode(r#"{"namespace":"web", ...}"#)?;
//! ```

pub mod decoder;

pub use decoder::{SchemaRequestDecoder, ACTION_REQUEST_SCHEMA};
