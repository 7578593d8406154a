pub mod escalator;
pub mod http_fetcher;
pub mod parallel;
pub mod sequential;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{FetchRequest, StrategyId};

pub use escalator::FetchEscalator;

/// Raw result of a single fetch attempt, before cleaning and meta parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPage {
    /// Page retrieved; carries the raw HTML
    Html(String),
    /// Expected failure (timeout, rejected status, navigation error)
    Failed(String),
}

impl RawPage {
    pub fn timeout() -> Self {
        RawPage::Failed(Self::timeout_reason().to_string())
    }

    /// Failure reason reported when a budget runs out.
    pub fn timeout_reason() -> &'static str {
        "timeout"
    }
}

/// A fetch strategy. Each backend owns its connections or browsers exclusively.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Budget for one fetch through this backend, passed back into `fetch`.
    fn timeout(&self) -> Duration;

    /// Acquire long-lived resources. Idempotent; `fetch` also calls it lazily.
    async fn initialize(&self) -> Result<()>;

    /// Release every resource. Idempotent and safe before `initialize`.
    async fn close(&self) -> Result<()>;

    /// Fetch the raw page for `request.url` within `budget`.
    ///
    /// Running out of budget yields `RawPage::Failed("timeout")` once every
    /// resource the attempt opened is released. Unexpected errors are
    /// returned as `Err` and turned into failed outcomes by the escalator.
    async fn fetch(&self, request: &FetchRequest, budget: Duration) -> Result<RawPage>;
}

/// How the escalator combines the strategies of one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationPolicy {
    /// Cheapest first, stop at the first usable result
    #[default]
    Sequential,
    /// All strategies at once, keep the highest scoring result
    Race,
}

impl fmt::Display for EscalationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationPolicy::Sequential => f.write_str("sequential"),
            EscalationPolicy::Race => f.write_str("race"),
        }
    }
}

impl FromStr for EscalationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(EscalationPolicy::Sequential),
            "race" | "parallel" => Ok(EscalationPolicy::Race),
            other => Err(format!(
                "Unknown policy '{}'. Expected 'sequential' or 'race'",
                other
            )),
        }
    }
}
