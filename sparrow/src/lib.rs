//! Binary-only crate: `SparrowConfig`, the orchestrator and error types
//! composing the lower crates into a runnable agent (§6, §7).

pub mod config;
pub mod error;
pub mod orchestrator;
