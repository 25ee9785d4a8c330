//! Spike Trace
//!
//! In-process span tracing that keeps every closed span of a run and, at
//! shutdown, reports the heaviest call trees for each metric.
//!
//! Wrap the interesting parts of a program in scopes; each scope becomes
//! one span per metric (latency, heap, or anything registered). When the
//! run ends, the spans with the largest deltas are traced back to their
//! roots and the top K trees are printed as an ASCII report.
//!
//! ## Getting Started
//!
//! ```no_run
//! fn main() {
//!     // Prints the summary when dropped, if SPIKE_TRACE > 0
//!     let _summary = spike_trace::init();
//!
//!     let _scope = spike_trace::trace("main");
//!     // ...
//! }
//! ```
//!
//! Try the bundled workload with the CLI:
//!
//! ```bash
//! spike-trace demo --workers 4 --depth 3
//! ```

pub mod commands;
pub mod metric;
pub mod report;
pub mod span;
pub mod tracer;
pub mod utils;

pub use metric::{
    global_metrics, register_metric, CountingAllocator, MetricDef, MetricDefBuilder,
    MetricRegistry, StatTemplate,
};
pub use tracer::{
    global, init, summarize, trace, AdoptGuard, Scope, SpanContext, SummaryGuard, Tracer,
};
pub use utils::{ConfigError, OutputError, RegistryError, TemplateError, TracerConfig};
