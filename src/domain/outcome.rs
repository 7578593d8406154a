use serde::{Deserialize, Serialize};

use crate::domain::StrategyId;

/// Result of one backend invocation for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub url: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub description: String,
    pub html: String,
    #[serde(rename = "success")]
    pub succeeded: bool,
    #[serde(rename = "reason")]
    pub failure_reason: String,
    #[serde(rename = "adapter")]
    pub strategy: StrategyId,
}

impl FetchOutcome {
    pub fn failed(url: impl Into<String>, strategy: StrategyId, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            keywords: Vec::new(),
            description: String::new(),
            html: String::new(),
            succeeded: false,
            failure_reason: reason.into(),
            strategy,
        }
    }

    /// Amount of content extracted, or of diagnostics on failure.
    pub fn score(&self) -> usize {
        self.title.chars().count() + self.html.chars().count() + self.failure_reason.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_fields() {
        let outcome = FetchOutcome::failed("https://example.com", StrategyId::Browser, "timeout");
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure_reason, "timeout");
        assert_eq!(outcome.strategy, StrategyId::Browser);
        assert!(outcome.html.is_empty());
    }

    #[test]
    fn test_score_counts_characters() {
        let mut outcome = FetchOutcome::failed("https://example.com", StrategyId::Request, "");
        outcome.title = "验证码".into();
        outcome.html = "<p>x</p>".into();
        assert_eq!(outcome.score(), 3 + 8);
    }

    #[test]
    fn test_json_field_names() {
        let outcome = FetchOutcome::failed("https://example.com", StrategyId::Stealth, "timeout");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["reason"], "timeout");
        assert_eq!(json["adapter"], "stealth");
        assert!(json.get("succeeded").is_none());
    }
}
