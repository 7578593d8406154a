//! Service configuration.
//!
//! Read from `--config <path>` or `~/.config/page-extractor/config.toml`.
//! A missing file means defaults; missing fields fall back to their defaults.
//! Command-line flags and environment variables are applied on top by the CLI.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::StrategyId;
use crate::fetcher::EscalationPolicy;
use crate::scraper::BrowserConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub escalation: EscalationConfig,
    pub request: RequestConfig,
    pub browser: BrowserConfig,
    pub stealth: BrowserConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// How requested strategies are combined
    pub policy: EscalationPolicy,
    /// Strategies used when a request names none
    pub default_strategies: Vec<StrategyId>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            policy: EscalationPolicy::default(),
            default_strategies: vec![StrategyId::Request],
        }
    }
}

/// Lightweight HTTP strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Total request timeout in milliseconds (default: 5000)
    pub timeout_ms: u64,
    /// Redirects followed before giving up (default: 10)
    pub max_redirects: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_redirects: 10,
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the rolling log file; `None` disables file logging
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: Some(PathBuf::from("logs")),
            file_prefix: "extract.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults. An unreadable or invalid file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_config_path() {
                Ok(p) => p,
                Err(ConfigError::NoConfigDir) => return Ok(Self::default()),
                Err(e) => return Err(e),
            },
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(ConfigError::Missing(config_path));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the default config file path: `~/.config/page-extractor/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("page-extractor").join("config.toml"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Config file not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config() {
        let config = Config::parse("").expect("Empty config should work");
        assert_eq!(config, Config::default());
        assert_eq!(config.escalation.policy, EscalationPolicy::Sequential);
        assert_eq!(config.escalation.default_strategies, vec![StrategyId::Request]);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_partial_config() {
        let content = r#"
[escalation]
policy = "race"

[stealth]
browser_count = 2
page_count = 5
executable = "/usr/bin/chromium"
"#;
        let config = Config::parse(content).expect("Partial config should work");

        assert_eq!(config.escalation.policy, EscalationPolicy::Race);
        assert_eq!(config.escalation.default_strategies, vec![StrategyId::Request]);
        assert_eq!(config.stealth.browser_count, 2);
        assert_eq!(config.stealth.page_count, 5);
        assert_eq!(
            config.stealth.executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
        // Untouched sections keep defaults
        assert_eq!(config.browser, BrowserConfig::default());
        assert_eq!(config.request.timeout_ms, 5000);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let content = r#"
[escalation]
default_strategies = ["request", "selenium"]
"#;
        assert!(Config::parse(content).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9100").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
