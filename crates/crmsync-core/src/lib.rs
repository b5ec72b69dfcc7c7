//! Core domain + reconciliation logic for the WhatsApp → CRM sync shim.
//!
//! This crate is intentionally transport-agnostic. Storage, integration lookup and the
//! remote RPC bridge live behind ports (traits); adapter crates implement the ones that
//! need network access.

pub mod config;
pub mod domain;
pub mod errors;
pub mod inbound;
pub mod integrations;
pub mod logging;
pub mod pipeline;
pub mod ports;
pub mod reconciler;
pub mod records;
pub mod rpc;
pub mod store;

pub use errors::{Error, Result};
