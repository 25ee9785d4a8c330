//! Metric definitions, stat line templates and the metric registry.
//!
//! This module covers everything about *what* is measured:
//! - Metric definitions (name, unit, sampler, prune threshold, templates)
//! - Stat line templates rendered at report time
//! - The ordered registry and builtin metrics
//! - The counting allocator behind "Memory Allocated"

pub mod alloc;
pub mod definition;
pub mod registry;
pub mod template;

// Re-export main types and functions
pub use alloc::{allocation_metric, CountingAllocator};
pub use definition::{MetricDef, MetricDefBuilder, Sampler};
pub use registry::{global_metrics, latency_metric, register_metric, MetricRegistry};
pub use template::{Percent, StatTemplate, StatValues, DEFAULT_STAT_LINE};
