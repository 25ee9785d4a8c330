//! Metric definitions.
//!
//! A metric is one measurable dimension (elapsed time, allocated memory...)
//! with its own sampling function. Every traced scope takes one sample at
//! entry and one at exit for each registered metric.

use super::template::{StatTemplate, DEFAULT_STAT_LINE};
use crate::utils::error::RegistryError;
use log::warn;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Zero-argument sampling function returning a value in the metric's unit
pub type Sampler = Arc<dyn Fn() -> f64 + Send + Sync>;

/// An immutable, registered metric
#[derive(Clone)]
pub struct MetricDef {
    name: String,
    unit: String,
    sampler: Sampler,
    prune_pct: f64,
    stat_line: StatTemplate,
    child_stat_line: StatTemplate,
}

impl MetricDef {
    /// Start building a metric named `name`, measured in `unit`
    pub fn builder(
        name: impl Into<String>,
        unit: impl Into<String>,
        sampler: impl Fn() -> f64 + Send + Sync + 'static,
    ) -> MetricDefBuilder {
        MetricDefBuilder {
            name: name.into(),
            unit: unit.into(),
            sampler: Arc::new(sampler),
            prune_pct: 0.0,
            stat_line: None,
            child_stat_line: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Minimum share of its parent (in percent) a child needs to be shown.
    /// Zero disables pruning.
    pub fn prune_pct(&self) -> f64 {
        self.prune_pct
    }

    pub fn stat_line(&self) -> &StatTemplate {
        &self.stat_line
    }

    pub fn child_stat_line(&self) -> &StatTemplate {
        &self.child_stat_line
    }

    pub fn template_for(&self, is_root: bool) -> &StatTemplate {
        if is_root {
            &self.stat_line
        } else {
            &self.child_stat_line
        }
    }

    /// Take one sample.
    ///
    /// A panicking sampler is contained here so that one broken metric
    /// cannot take down the scopes of the others; the caller gets `None`.
    pub fn sample(&self) -> Option<f64> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.sampler)())) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Sampler for metric '{}' panicked; span skipped", self.name);
                None
            }
        }
    }
}

impl fmt::Debug for MetricDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricDef")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("prune_pct", &self.prune_pct)
            .field("stat_line", &self.stat_line.as_str())
            .field("child_stat_line", &self.child_stat_line.as_str())
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`MetricDef::builder`]
pub struct MetricDefBuilder {
    name: String,
    unit: String,
    sampler: Sampler,
    prune_pct: f64,
    stat_line: Option<String>,
    child_stat_line: Option<String>,
}

impl MetricDefBuilder {
    pub fn prune_pct(mut self, prune_pct: f64) -> Self {
        self.prune_pct = prune_pct;
        self
    }

    /// Stat line for root spans; also used for children unless
    /// [`child_stat_line`](Self::child_stat_line) is set
    pub fn stat_line(mut self, template: impl Into<String>) -> Self {
        self.stat_line = Some(template.into());
        self
    }

    pub fn child_stat_line(mut self, template: impl Into<String>) -> Self {
        self.child_stat_line = Some(template.into());
        self
    }

    pub fn build(self) -> Result<MetricDef, RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        if !self.prune_pct.is_finite() || !(0.0..=100.0).contains(&self.prune_pct) {
            return Err(RegistryError::InvalidPruneThreshold(self.prune_pct));
        }

        let stat_source = self
            .stat_line
            .unwrap_or_else(|| DEFAULT_STAT_LINE.to_string());
        let child_source = self.child_stat_line.unwrap_or_else(|| stat_source.clone());

        let parse = |source: &str| {
            StatTemplate::parse(source).map_err(|source| RegistryError::Template {
                metric: self.name.clone(),
                source,
            })
        };
        let stat_line = parse(&stat_source)?;
        let child_stat_line = parse(&child_source)?;

        Ok(MetricDef {
            name: self.name,
            unit: self.unit,
            sampler: self.sampler,
            prune_pct: self.prune_pct,
            stat_line,
            child_stat_line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let metric = MetricDef::builder("Latency", "s", || 1.0).build().unwrap();

        assert_eq!(metric.name(), "Latency");
        assert_eq!(metric.unit(), "s");
        assert_eq!(metric.prune_pct(), 0.0);
        assert_eq!(metric.stat_line().as_str(), DEFAULT_STAT_LINE);
        assert_eq!(metric.child_stat_line().as_str(), DEFAULT_STAT_LINE);
        assert_eq!(metric.sample(), Some(1.0));
    }

    #[test]
    fn test_child_line_falls_back_to_stat_line() {
        let metric = MetricDef::builder("Latency", "s", || 0.0)
            .stat_line("{delta:.1} s")
            .build()
            .unwrap();
        assert_eq!(metric.template_for(false).as_str(), "{delta:.1} s");

        let metric = MetricDef::builder("Latency", "s", || 0.0)
            .stat_line("{delta:.1} s")
            .child_stat_line("{delta:.1} s ({pct}%)")
            .build()
            .unwrap();
        assert_eq!(metric.template_for(true).as_str(), "{delta:.1} s");
        assert_eq!(metric.template_for(false).as_str(), "{delta:.1} s ({pct}%)");
    }

    #[test]
    fn test_rejects_empty_name() {
        let result = MetricDef::builder("  ", "s", || 0.0).build();
        assert!(matches!(result, Err(RegistryError::EmptyName)));
    }

    #[test]
    fn test_rejects_bad_prune_threshold() {
        for bad in [-1.0, 100.5, f64::NAN, f64::INFINITY] {
            let result = MetricDef::builder("Latency", "s", || 0.0)
                .prune_pct(bad)
                .build();
            assert!(matches!(result, Err(RegistryError::InvalidPruneThreshold(_))));
        }
    }

    #[test]
    fn test_rejects_bad_template() {
        let result = MetricDef::builder("Latency", "s", || 0.0)
            .child_stat_line("{delta:.1} s ({share}%)")
            .build();
        match result {
            Err(RegistryError::Template { metric, .. }) => assert_eq!(metric, "Latency"),
            other => panic!("expected template error, got {:?}", other),
        }
    }

    #[test]
    fn test_panicking_sampler_is_contained() {
        let metric = MetricDef::builder("Broken", "u", || panic!("device lost"))
            .build()
            .unwrap();
        assert_eq!(metric.sample(), None);
    }
}
