//! Heuristic detection of bot-verification walls.
//!
//! The classifier only decides whether escalation should continue. It never
//! drops a result: the escalator still returns the last outcome it got.

use std::sync::LazyLock;

use regex::Regex;
use ::scraper::{Html, Selector};

/// Case-sensitive title fragments used by verification pages.
pub const BLOCKED_TITLE_KEYWORDS: [&str; 4] = ["验证", "verify", "robot", "captcha"];

/// Minimum number of CJK characters or latin words in the body text.
pub const MIN_CONTENT_TOKENS: usize = 100;

static BLOCKED_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(authenticate|security|captcha|verify)/").expect("valid blocked path regex")
});

static CONTENT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\u{4e00}-\u{9fff}]|[a-z\-]+").expect("valid content token regex")
});

static FORM_ACTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form[action]").expect("valid form selector"));
static IMG_SRC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid img selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Whether an extracted page looks like real content.
pub fn is_usable(title: &str, html: &str) -> bool {
    if title.is_empty() {
        return false;
    }

    if BLOCKED_TITLE_KEYWORDS.iter().any(|k| title.contains(k)) {
        return false;
    }

    let document = Html::parse_document(html);

    if has_blocked_target(&document) {
        return false;
    }

    content_tokens(&document) >= MIN_CONTENT_TOKENS
}

fn has_blocked_target(document: &Html) -> bool {
    let actions = document
        .select(&FORM_ACTION)
        .filter_map(|el| el.value().attr("action"));
    let sources = document
        .select(&IMG_SRC)
        .filter_map(|el| el.value().attr("src"));

    actions.chain(sources).any(|target| BLOCKED_PATH.is_match(target))
}

/// Counts tokens in the body text, stopping once the threshold is reached.
fn content_tokens(document: &Html) -> usize {
    let text = document
        .select(&BODY)
        .flat_map(|body| body.text())
        .collect::<Vec<_>>()
        .join(" ");

    CONTENT_TOKEN
        .find_iter(&text)
        .take(MIN_CONTENT_TOKENS)
        .count()
}
