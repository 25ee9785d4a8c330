//! Metrics command implementation.
//!
//! Lists the metrics a tracer would record, in report order.

use crate::metric::MetricRegistry;
use std::fmt::Write;

/// Render a listing of every metric in `registry`
pub fn list_metrics(registry: &MetricRegistry) -> String {
    let mut out = String::new();

    if registry.is_empty() {
        out.push_str("No metrics registered\n");
        return out;
    }

    let _ = writeln!(out, "Registered metrics ({}):", registry.len());
    for (i, metric) in registry.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {}. {} [{}]", i + 1, metric.name(), metric.unit());

        if metric.prune_pct() > 0.0 {
            let _ = writeln!(out, "     prune below:  {}%", metric.prune_pct());
        } else {
            let _ = writeln!(out, "     prune below:  off");
        }
        let _ = writeln!(out, "     root line:    {}", metric.stat_line().as_str());
        let _ = writeln!(out, "     child line:   {}", metric.child_stat_line().as_str());
    }

    out
}
