//! ASCII tree rendering of one root span.
//!
//! Output for a root with two visible children looks like:
//!
//! ```text
//!     [ 1]  handle_request ─────────────────────────────────│ 2.4 s
//!             ├── parse ────────────────────────────────────│ 0.5 s (21%)
//!             └── execute ──────────────────────────────────│ 1.8 s (75%)
//! ```
//!
//! Percentages are taken against the parent's delta, which is only final
//! once the whole subtree is connected, so every line is formatted here
//! from the span's recorded components.

use super::glyphs;
use crate::metric::{MetricDef, Percent, StatValues};
use crate::span::{SpanId, SpanNode, SpanStore};
use crate::utils::config::{ROOT_CHILD_INDENT_UNITS, SPACER_COL};

/// Renders span trees of one metric
pub struct TreeRenderer<'a> {
    store: &'a SpanStore,
    metric: &'a MetricDef,
}

impl<'a> TreeRenderer<'a> {
    pub fn new(store: &'a SpanStore, metric: &'a MetricDef) -> Self {
        Self { store, metric }
    }

    /// Render `root` and its visible subtree as section number `section`
    pub fn render_root(&self, root: SpanId, section: usize) -> String {
        let mut out = String::new();
        let node = self.store.node(root);

        let label = format!("{}[{:>2}]  {}", glyphs::INDENT, section, node.name());
        self.push_line(&mut out, &label, node, Percent::Of(100.0), true);

        let prefix = glyphs::INDENT.repeat(ROOT_CHILD_INDENT_UNITS);
        self.render_children(root, &prefix, &mut out);

        out
    }

    /// Children of `id` that survive the metric's prune threshold
    pub fn visible_children(&self, id: SpanId) -> Vec<SpanId> {
        let parent_delta = self.store.node(id).delta();
        let prune_pct = self.metric.prune_pct();

        self.store
            .node(id)
            .children()
            .iter()
            .copied()
            .filter(|&child| {
                is_visible(self.store.node(child).delta(), parent_delta, prune_pct)
            })
            .collect()
    }

    fn render_children(&self, parent: SpanId, prefix: &str, out: &mut String) {
        let visible = self.visible_children(parent);
        let last = visible.len().saturating_sub(1);

        for (i, &child) in visible.iter().enumerate() {
            self.render_child(child, parent, prefix, i == last, out);
        }
    }

    fn render_child(
        &self,
        id: SpanId,
        parent: SpanId,
        prefix: &str,
        is_last: bool,
        out: &mut String,
    ) {
        let node = self.store.node(id);
        let parent_delta = self.store.node(parent).delta();

        let connector = if is_last { glyphs::CORNER } else { glyphs::TEE };
        let label = format!("{}{} {}", prefix, connector, node.name());
        let pct = Percent::of(node.delta(), parent_delta);
        self.push_line(out, &label, node, pct, false);

        let child_prefix = if is_last {
            format!("{}{}", prefix, glyphs::INDENT)
        } else {
            format!("{}{}   ", prefix, glyphs::VERT)
        };
        self.render_children(id, &child_prefix, out);
    }

    fn push_line(
        &self,
        out: &mut String,
        label: &str,
        node: &SpanNode,
        pct: Percent,
        is_root: bool,
    ) {
        let values = StatValues {
            start: node.start(),
            end: node.end(),
            delta: node.delta(),
            unit: self.metric.unit(),
            pct,
        };

        out.push_str(label);
        out.push_str(&build_spacer(label));
        out.push_str(&self.metric.template_for(is_root).render(&values));
        out.push('\n');
    }
}

/// Whether a child survives pruning.
///
/// Pruning is off when `prune_pct` is zero or the parent delta is zero.
pub fn is_visible(child_delta: f64, parent_delta: f64, prune_pct: f64) -> bool {
    prune_pct <= 0.0 || parent_delta == 0.0 || child_delta / parent_delta * 100.0 >= prune_pct
}

/// Dashes from the end of `label` to the stat column, at least one
pub fn build_spacer(label: &str) -> String {
    let width = label.chars().count();
    let reps = SPACER_COL.saturating_sub(width).max(1);
    format!(" {}{} ", glyphs::HORZ.repeat(reps), glyphs::VERT)
}
