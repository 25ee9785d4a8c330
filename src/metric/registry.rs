//! Ordered metric registry.
//!
//! Registration order is report order. A process-global registry feeds the
//! global tracer; it is frozen when that tracer starts, since scopes opened
//! before a late registration would have no span for the new metric.

use super::alloc;
use super::definition::MetricDef;
use crate::utils::error::RegistryError;
use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;

/// Ordered list of metric definitions
#[derive(Debug, Default, Clone)]
pub struct MetricRegistry {
    metrics: Vec<Arc<MetricDef>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the builtin metrics
    ///
    /// "Memory Allocated" comes first and is only present when the
    /// counting allocator is installed; "Latency" is always present.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        if alloc::is_installed() {
            registry.register(alloc::allocation_metric()?)?;
        }
        registry.register(latency_metric()?)?;

        Ok(registry)
    }

    /// Append a metric. Names must be unique.
    pub fn register(&mut self, metric: MetricDef) -> Result<Arc<MetricDef>, RegistryError> {
        if self.get(metric.name()).is_some() {
            return Err(RegistryError::DuplicateMetric(metric.name().to_string()));
        }

        debug!("Registered metric '{}' ({})", metric.name(), metric.unit());
        let metric = Arc::new(metric);
        self.metrics.push(Arc::clone(&metric));

        Ok(metric)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MetricDef>> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetricDef>> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Arc<MetricDef>> {
        self.metrics.clone()
    }
}

fn process_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// "Latency" metric: seconds on a monotonic clock since the first sample
pub fn latency_metric() -> Result<MetricDef, RegistryError> {
    MetricDef::builder("Latency", "s", || process_epoch().elapsed().as_secs_f64())
        .prune_pct(15.0)
        .stat_line("{delta:.1} s")
        .child_stat_line("{delta:.1} s ({pct}%)")
        .build()
}

struct GlobalRegistry {
    registry: MetricRegistry,
    frozen: bool,
}

fn global_registry() -> MutexGuard<'static, GlobalRegistry> {
    static GLOBAL: OnceLock<Mutex<GlobalRegistry>> = OnceLock::new();

    GLOBAL
        .get_or_init(|| {
            let registry = MetricRegistry::with_builtins().unwrap_or_else(|e| {
                error!("Failed to load builtin metrics: {}", e);
                MetricRegistry::new()
            });
            Mutex::new(GlobalRegistry {
                registry,
                frozen: false,
            })
        })
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Add a metric to the process-global registry
///
/// Fails once the global tracer has started.
pub fn register_metric(metric: MetricDef) -> Result<(), RegistryError> {
    let mut global = global_registry();

    if global.frozen {
        return Err(RegistryError::Frozen(metric.name().to_string()));
    }

    global.registry.register(metric)?;
    Ok(())
}

/// Snapshot of the process-global registry
pub fn global_metrics() -> Vec<Arc<MetricDef>> {
    global_registry().registry.to_vec()
}

/// Freeze the global registry and return its final contents
pub(crate) fn freeze_global() -> Vec<Arc<MetricDef>> {
    let mut global = global_registry();
    global.frozen = true;
    global.registry.to_vec()
}
