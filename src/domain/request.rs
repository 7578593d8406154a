use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One concrete way of fetching a page.
///
/// Declaration order is escalation priority: cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyId {
    /// Plain HTTP GET through a pooled client
    Request,
    /// Headless Chromium, DOMContentLoaded readiness
    #[serde(alias = "playwright")]
    Browser,
    /// Headless Chromium with webdriver masking and XHR-aware readiness
    #[serde(alias = "pyppeteer")]
    Stealth,
}

impl StrategyId {
    pub const ALL: [StrategyId; 3] = [StrategyId::Request, StrategyId::Browser, StrategyId::Stealth];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Request => "request",
            StrategyId::Browser => "browser",
            StrategyId::Stealth => "stealth",
        }
    }

    /// Whether this strategy can wait for XHR-driven content.
    pub fn honors_xhr(&self) -> bool {
        matches!(self, StrategyId::Stealth)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "request" => Ok(StrategyId::Request),
            "browser" | "playwright" => Ok(StrategyId::Browser),
            "stealth" | "pyppeteer" => Ok(StrategyId::Stealth),
            other => Err(format!(
                "Unknown strategy '{}'. Expected one of: request, browser, stealth",
                other
            )),
        }
    }
}

/// Which blocks `clean_html` strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    pub style: bool,
    pub script: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            style: true,
            script: true,
        }
    }
}

/// A single extraction request. Built once per inbound call, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub clean: CleanOptions,
    pub xhr: bool,
    strategies: Vec<StrategyId>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            clean: CleanOptions::default(),
            xhr: false,
            strategies: Vec::new(),
        }
    }

    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = StrategyId>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    pub fn with_xhr(mut self, xhr: bool) -> Self {
        self.xhr = xhr;
        self
    }

    pub fn with_clean(mut self, clean: CleanOptions) -> Self {
        self.clean = clean;
        self
    }

    /// Requested strategies with duplicates removed (first occurrence wins).
    ///
    /// Falls back to `defaults`, then to `[Request]`, so the result is never empty.
    pub fn effective_strategies(&self, defaults: &[StrategyId]) -> Vec<StrategyId> {
        let source = if !self.strategies.is_empty() {
            self.strategies.as_slice()
        } else if !defaults.is_empty() {
            defaults
        } else {
            &[StrategyId::Request]
        };

        let mut seen = Vec::with_capacity(source.len());
        for id in source {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}
