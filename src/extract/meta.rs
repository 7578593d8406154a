use std::sync::LazyLock;

use ::scraper::{Html, Selector};

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static KEYWORDS: LazyLock<Selector> = LazyLock::new(|| selector(r#"head meta[name="keywords"]"#));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"head meta[name="description"]"#));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

/// Title, keywords and description scraped from a document's head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub keywords: Vec<String>,
    pub description: String,
}

pub fn parse_meta(html: &str) -> PageMeta {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string();

    let keywords = document
        .select(&KEYWORDS)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| {
            content
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let description = document
        .select(&DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    PageMeta {
        title,
        keywords,
        description,
    }
}
