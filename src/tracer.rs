//! The scope API.
//!
//! A [`Tracer`] owns one [`MetricRecorder`] per metric. [`Tracer::trace`]
//! opens a span for every metric and returns a [`Scope`] that closes them
//! again, in reverse order, when it drops. Whether scopes record anything
//! is decided once, when the tracer is built.
//!
//! # Example
//! ```
//! use spike_trace::{Tracer, TracerConfig, MetricRegistry};
//!
//! let registry = MetricRegistry::with_builtins().unwrap();
//! let tracer = Tracer::from_registry(TracerConfig::new().with_enabled(true), &registry);
//!
//! {
//!     let _request = tracer.trace("handle_request");
//!     let parsed = tracer.in_scope("parse", || "42".parse::<u32>());
//!     assert_eq!(parsed, Ok(42));
//! }
//!
//! assert!(tracer.summary().contains("[ 1]  handle_request"));
//! ```

use crate::metric::registry::{self, MetricRegistry};
use crate::metric::{alloc, MetricDef};
use crate::report::{render_metric_section, render_summary, write_report};
use crate::span::context::{self, MetricId, SlotToken};
use crate::span::{MetricRecorder, OpenSpan, SpanId};
use crate::utils::config::TracerConfig;
use crate::utils::error::OutputError;
use log::{debug, error, info, warn};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock};

/// Opens a scope; chosen once per tracer
type OpenScope = for<'a> fn(&'a Tracer, &str) -> Scope<'a>;

/// Records spans for a fixed, ordered set of metrics
pub struct Tracer {
    recorders: Vec<MetricRecorder>,
    top_k: usize,
    enabled: bool,
    open_scope: OpenScope,
}

impl Tracer {
    pub fn new(config: TracerConfig, metrics: impl IntoIterator<Item = Arc<MetricDef>>) -> Self {
        let recorders: Vec<MetricRecorder> = metrics.into_iter().map(MetricRecorder::new).collect();
        let open_scope: OpenScope = if config.enabled {
            open_recording
        } else {
            open_noop
        };

        debug!(
            "Tracer created: enabled={}, top_k={}, {} metrics",
            config.enabled,
            config.top_k,
            recorders.len()
        );

        Self {
            recorders,
            top_k: config.top_k,
            enabled: config.enabled,
            open_scope,
        }
    }

    pub fn from_registry(config: TracerConfig, registry: &MetricRegistry) -> Self {
        Self::new(config, registry.to_vec())
    }

    /// A tracer whose scopes do nothing
    pub fn disabled() -> Self {
        Self::new(TracerConfig::default(), Vec::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn metrics(&self) -> impl Iterator<Item = &MetricDef> {
        self.recorders.iter().map(MetricRecorder::metric)
    }

    pub fn recorders(&self) -> &[MetricRecorder] {
        &self.recorders
    }

    pub fn recorder(&self, metric_name: &str) -> Option<&MetricRecorder> {
        self.recorders
            .iter()
            .find(|r| r.metric().name() == metric_name)
    }

    /// Open a scope named `name` nested under this thread's current scope
    pub fn trace(&self, name: &str) -> Scope<'_> {
        (self.open_scope)(self, name)
    }

    /// Run `f` inside a scope named `name`
    pub fn in_scope<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let _scope = self.trace(name);
        f()
    }

    /// Capture this thread's current spans so another thread can nest
    /// its scopes under them (see [`Tracer::adopt`])
    pub fn fork(&self) -> SpanContext {
        let parents = self
            .recorders
            .iter()
            .filter_map(|r| r.current().map(|span| (r.id(), span)))
            .collect();

        SpanContext { parents }
    }

    /// Make the spans captured by [`Tracer::fork`] the current spans of
    /// this thread until the guard drops
    pub fn adopt(&self, ctx: &SpanContext) -> AdoptGuard {
        alloc::untracked(|| {
            let mut tokens = Vec::with_capacity(ctx.parents.len());

            for &(metric, span) in &ctx.parents {
                match self.recorders.iter().find(|r| r.id() == metric) {
                    Some(recorder) => tokens.push(recorder.adopt(span)),
                    None => debug!("Ignoring span context from another tracer"),
                }
            }

            AdoptGuard { tokens }
        })
    }

    /// Render the report for every metric, in registration order.
    ///
    /// Selection consumes the spans it pops from each leaf pool, so this is
    /// meant to run once, after the traced work has finished.
    pub fn summary(&self) -> String {
        let sections = self.recorders.iter().map(|recorder| {
            let mut store = recorder.lock();
            render_metric_section(recorder.metric(), &mut store, self.top_k)
        });

        render_summary(sections)
    }

    pub fn write_summary(&self, writer: &mut impl Write) -> Result<(), OutputError> {
        write_report(writer, &self.summary())
    }

    /// Print the report to stdout
    pub fn print_summary(&self) {
        let stdout = std::io::stdout();
        if let Err(e) = self.write_summary(&mut stdout.lock()) {
            error!("Failed to print tracer summary: {}", e);
        }
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("recorders", &self.recorders)
            .field("top_k", &self.top_k)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

fn open_recording<'a>(tracer: &'a Tracer, name: &str) -> Scope<'a> {
    alloc::untracked(|| {
        let name: Arc<str> = Arc::from(name);
        let spans = tracer
            .recorders
            .iter()
            .filter_map(|recorder| recorder.enter(&name))
            .collect();

        Scope { spans }
    })
}

fn open_noop<'a>(_tracer: &'a Tracer, _name: &str) -> Scope<'a> {
    Scope { spans: Vec::new() }
}

/// An open scope; one span per metric, closed when dropped
#[must_use = "a scope is closed as soon as it is dropped; bind it with `let _scope = ...`"]
#[derive(Debug)]
pub struct Scope<'a> {
    spans: Vec<OpenSpan<'a>>,
}

impl Scope<'_> {
    /// Whether any metric is recording this scope
    pub fn is_recording(&self) -> bool {
        !self.spans.is_empty()
    }

    /// Ids of the spans opened for this scope, in metric order
    pub fn span_ids(&self) -> Vec<SpanId> {
        self.spans.iter().filter_map(OpenSpan::id).collect()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        // The span list was allocated untracked, so it is freed untracked too
        let spans = std::mem::take(&mut self.spans);
        alloc::untracked(|| {
            // Last metric opened is the first closed
            for span in spans.into_iter().rev() {
                drop(span);
            }
        });
    }
}

/// Current spans of one thread, captured by [`Tracer::fork`]
#[derive(Debug, Clone, Default)]
pub struct SpanContext {
    parents: Vec<(MetricId, SpanId)>,
}

impl SpanContext {
    /// True when the forking thread had no open scope
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Restores the adopting thread's spans when dropped
#[must_use = "dropping an AdoptGuard ends the adoption immediately"]
#[derive(Debug)]
pub struct AdoptGuard {
    tokens: Vec<SlotToken>,
}

impl Drop for AdoptGuard {
    fn drop(&mut self) {
        let tokens = std::mem::take(&mut self.tokens);
        alloc::untracked(|| {
            for token in tokens.into_iter().rev() {
                context::exit(token);
            }
        });
    }
}

/// The process-wide tracer.
///
/// Built on first use from the environment (`SPIKE_TRACE`,
/// `SPIKE_TRACE_TOP_K`) and the global metric registry, which is frozen at
/// that point.
pub fn global() -> &'static Tracer {
    static GLOBAL: OnceLock<Tracer> = OnceLock::new();

    GLOBAL.get_or_init(|| {
        let config = TracerConfig::from_env().unwrap_or_else(|e| {
            warn!("Ignoring invalid tracer configuration: {}", e);
            TracerConfig::default()
        });
        let metrics = registry::freeze_global();

        if config.enabled {
            info!(
                "Span tracing enabled: {} metrics, top {} roots each",
                metrics.len(),
                config.top_k
            );
        }

        Tracer::new(config, metrics)
    })
}

/// Open a scope on the global tracer
pub fn trace(name: &str) -> Scope<'static> {
    global().trace(name)
}

/// Print the global tracer's report to stdout
pub fn summarize() {
    global().print_summary();
}

/// Start the global tracer and print its report when the guard drops.
///
/// Hold the guard for the lifetime of `main`:
///
/// ```no_run
/// fn main() {
///     let _summary = spike_trace::init();
///     let _scope = spike_trace::trace("main");
///     // ...
/// }
/// ```
pub fn init() -> SummaryGuard {
    SummaryGuard { tracer: global() }
}

/// Prints the global summary on drop when tracing is enabled
#[must_use = "the summary is printed when this guard drops"]
#[derive(Debug)]
pub struct SummaryGuard {
    tracer: &'static Tracer,
}

impl Drop for SummaryGuard {
    fn drop(&mut self) {
        if self.tracer.is_enabled() {
            self.tracer.print_summary();
        }
    }
}
