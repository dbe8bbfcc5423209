//! AWS-oriented adapters and handlers for the nightly analytics UNLOAD.
//!
//! This crate owns runtime integration details (the Lambda handler, the
//! warehouse connection and the Athena client) on top of the deterministic
//! primitives in `unload_pipeline_core`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
