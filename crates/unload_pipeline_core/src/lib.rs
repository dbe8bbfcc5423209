//! Domain primitives for the nightly analytics UNLOAD pipeline.
//!
//! This crate owns the deterministic parts of an invocation: the reporting
//! window, dataset definitions, UNLOAD rendering, partition-repair requests
//! and the repair poll policy. It intentionally excludes AWS SDK, Lambda
//! runtime and database driver concerns.

pub mod dataset;
pub mod error;
pub mod execution;
pub mod poll;
pub mod query;
pub mod repair;
pub mod window;

pub use error::PipelineError;
