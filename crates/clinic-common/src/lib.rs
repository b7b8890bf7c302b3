//! Clinic Common Library
//!
//! Shared plumbing for the clinic audit workspace members.
//!
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod logging;

pub use logging::{init_logging, LogConfig};
