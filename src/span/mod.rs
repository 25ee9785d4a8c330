//! Span recording: nodes, context slots and the leaf pool.
//!
//! This module turns scope entry/exit into span trees:
//! - `node`: span arena with parent/child links
//! - `context`: thread-local current-span slots
//! - `pool`: max-priority pool of closed spans
//! - `recorder`: per-metric glue that samples and records spans

pub mod context;
pub mod node;
pub mod pool;
pub mod recorder;

// Re-export main types
pub use context::{MetricId, SlotToken};
pub use node::{SpanId, SpanNode, SpanState, SpanStore};
pub use pool::LeafPool;
pub use recorder::{MetricRecorder, OpenSpan};
