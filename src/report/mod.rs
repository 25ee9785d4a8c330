//! Report generation.
//!
//! This module turns recorded spans into the shutdown summary:
//! - Top-K root selection from each metric's leaf pool
//! - ASCII tree rendering with percentages and pruning
//! - Per-metric sections inside a banner
//! - Writers for stdout and files

pub mod glyphs;
pub mod output;
pub mod render;
pub mod select;
pub mod summary;

// Re-export main functions
pub use output::{validate_output_path, write_report, write_report_file};
pub use render::{build_spacer, is_visible, TreeRenderer};
pub use select::{climb_to_root, select_roots};
pub use summary::{render_metric_section, render_summary, EMPTY_SECTION};
