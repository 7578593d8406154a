use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::CleanOptions;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?>.*?</style>").expect("valid style regex"));

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?>.*?</script>").expect("valid script regex"));

/// Strip `<style>` and/or `<script>` blocks.
///
/// Regex based, not a parser. Removal repeats until nothing matches so that
/// blocks stitched together by an earlier removal are also dropped, which
/// makes the function idempotent.
pub fn clean_html(html: &str, options: CleanOptions) -> String {
    let mut current = html.to_string();

    loop {
        let mut changed = false;

        if options.style {
            if let Cow::Owned(next) = STYLE_BLOCK.replace_all(&current, "") {
                current = next;
                changed = true;
            }
        }

        if options.script {
            if let Cow::Owned(next) = SCRIPT_BLOCK.replace_all(&current, "") {
                current = next;
                changed = true;
            }
        }

        if !changed {
            return current;
        }
    }
}
