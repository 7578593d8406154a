//! HTML post-processing shared by every fetch strategy.
//!
//! - [`clean_html`]: regex removal of `<style>`/`<script>` blocks
//! - [`parse_meta`]: title, keywords and description from the head
//! - [`is_usable`]: verification-wall heuristic that gates escalation

mod clean;
mod meta;
pub mod quality;

pub use clean::clean_html;
pub use meta::{parse_meta, PageMeta};
pub use quality::is_usable;
