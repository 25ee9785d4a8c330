//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while parsing a stat line template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("Unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),

    #[error("Unknown placeholder field: {0}")]
    UnknownField(String),

    #[error("Invalid format spec '{spec}' for field {field}")]
    InvalidSpec { field: String, spec: String },
}

/// Errors that can occur during metric registration
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Metric name cannot be empty")]
    EmptyName,

    #[error("Metric already registered: {0}")]
    DuplicateMetric(String),

    #[error("Prune threshold must be a percentage in [0, 100], got {0}")]
    InvalidPruneThreshold(f64),

    #[error("Invalid stat line for metric {metric}: {source}")]
    Template {
        metric: String,
        #[source]
        source: TemplateError,
    },

    #[error("Cannot register metric {0}: the global tracer has already started")]
    Frozen(String),
}

/// Errors that can occur while loading tracer configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("top_k must be greater than 0")]
    ZeroTopK,

    #[error("top_k is too large: {0} (max {max})", max = crate::utils::config::MAX_TOP_K)]
    TopKTooLarge(usize),
}

/// Errors that can occur while writing a report
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write report: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
