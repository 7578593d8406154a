use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::StrategyId;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browser pool initialization failed: {0}")]
    PoolInit(String),

    #[error("No backend registered for strategy '{0}'")]
    UnknownStrategy(StrategyId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ExtractError {
    /// Errors that reject the whole request instead of a single URL.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::UnknownStrategy(_)
                | ExtractError::InvalidRequest(_)
                | ExtractError::InvalidUrl(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for ExtractError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ExtractError::Browser(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
