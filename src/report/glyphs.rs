//! Box-drawing glyphs used by the tree renderer.

pub const INDENT: &str = "    ";
pub const VERT: &str = "│";
pub const HORZ: &str = "─";
pub const TEE: &str = "├──";
pub const CORNER: &str = "└──";
