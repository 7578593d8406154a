use std::sync::Arc;

use crate::config::Config;
use crate::domain::StrategyId;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::FetchEscalator;
use crate::scraper::{BrowserBackend, BrowserProfile};

pub struct AppContext {
    pub config: Config,
    pub escalator: Arc<FetchEscalator>,
}

impl AppContext {
    /// Wire up every strategy from `config`. Nothing is launched yet;
    /// backends initialize on first use.
    pub fn new(config: Config) -> Self {
        let escalator = FetchEscalator::new(&config.escalation)
            .with_backend(Arc::new(HttpFetcher::new(config.request.clone())))
            .with_backend(Arc::new(BrowserBackend::chrome(
                StrategyId::Browser,
                BrowserProfile::Plain,
                config.browser.clone(),
            )))
            .with_backend(Arc::new(BrowserBackend::chrome(
                StrategyId::Stealth,
                BrowserProfile::Stealth,
                config.stealth.clone(),
            )));

        Self::from_parts(config, escalator)
    }

    pub fn from_parts(config: Config, escalator: FetchEscalator) -> Self {
        Self {
            config,
            escalator: Arc::new(escalator),
        }
    }

    /// Close every backend. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.escalator.close().await;
    }
}
