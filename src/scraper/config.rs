use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one browser-backed strategy and its pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Number of browser instances in the pool (default: 1)
    pub browser_count: usize,

    /// Maximum concurrent pages per browser instance (default: 2)
    pub page_count: usize,

    /// Navigation budget per page in milliseconds (default: 5000)
    pub navigation_timeout_ms: u64,

    /// Overall budget for one fetch through this strategy in milliseconds (default: 8000)
    pub timeout_ms: u64,

    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Chrome/Chromium executable; looked up on PATH when unset
    pub executable: Option<PathBuf>,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser_count: 1,
            page_count: 2,
            navigation_timeout_ms: 5000,
            timeout_ms: 8000,
            headless: true,
            executable: None,
            user_agent: None,
        }
    }
}

impl BrowserConfig {
    /// Get the navigation timeout as a Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Get the strategy budget as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
