//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components to perform user tasks.

pub mod demo;
pub mod metrics;

// Re-export main command functions
pub use demo::{execute_demo, validate_args, DemoArgs};
pub use metrics::list_metrics;
