//! Report assembly: one section per metric inside a banner.

use super::glyphs;
use super::render::TreeRenderer;
use super::select::select_roots;
use crate::metric::MetricDef;
use crate::span::SpanStore;
use crate::utils::config::BANNER_WIDTH;
use log::debug;

/// Body used for a metric that produced no roots
pub const EMPTY_SECTION: &str = "(None)";

/// Select and render the top `top_k` roots of one metric
pub fn render_metric_section(metric: &MetricDef, store: &mut SpanStore, top_k: usize) -> String {
    let roots = select_roots(store, top_k);
    debug!(
        "Metric '{}': {} of {} requested roots found, {} spans left in pool",
        metric.name(),
        roots.len(),
        top_k,
        store.pool().len()
    );

    let body = if roots.is_empty() {
        format!("{}{}", glyphs::INDENT, EMPTY_SECTION)
    } else {
        let renderer = TreeRenderer::new(store, metric);
        roots
            .iter()
            .enumerate()
            .map(|(i, &root)| renderer.render_root(root, i + 1))
            .collect()
    };

    format!("  Top {} {} Spikes:\n{}\n\n", top_k, metric.name(), body)
}

/// Wrap rendered metric sections in the summary banner
pub fn render_summary<I>(sections: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let line = "=".repeat(BANNER_WIDTH);
    let sections: String = sections.into_iter().collect();

    format!("\n{line}\nTracer Summary:\n\n{sections}{line}\n")
}
