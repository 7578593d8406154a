use std::path::PathBuf;
use std::sync::Arc;

use crate::app::{AppContext, ExtractError, Result};
use crate::config::Config;
use crate::domain::{FetchOutcome, FetchRequest, StrategyId};
use crate::fetcher::EscalationPolicy;
use crate::server;

/// Command-line and environment values layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub policy: Option<EscalationPolicy>,
    pub chrome: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(policy) = self.policy {
            config.escalation.policy = policy;
        }
        if let Some(chrome) = self.chrome {
            config.browser.executable = Some(chrome.clone());
            config.stealth.executable = Some(chrome);
        }
    }
}

pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    server::serve(ctx, server::shutdown_signal()).await
}

pub async fn extract(
    ctx: &AppContext,
    url: &str,
    adapters: Vec<StrategyId>,
    xhr: bool,
    include_html: bool,
) -> Result<()> {
    url::Url::parse(url)?;
    let request = FetchRequest::new(url)
        .with_strategies(adapters)
        .with_xhr(xhr);

    let result = ctx.escalator.extract(&request).await;
    ctx.shutdown().await;

    println!("{}", render(&result?, include_html)?);
    Ok(())
}

fn render(outcome: &FetchOutcome, include_html: bool) -> Result<String> {
    let mut value =
        serde_json::to_value(outcome).map_err(|e| ExtractError::Other(e.to_string()))?;
    if !include_html {
        if let Some(fields) = value.as_object_mut() {
            fields.remove("html");
        }
    }
    serde_json::to_string_pretty(&value).map_err(|e| ExtractError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let mut config = Config::default();
        Overrides {
            host: Some("127.0.0.1".into()),
            port: None,
            policy: Some(EscalationPolicy::Race),
            chrome: Some(PathBuf::from("/usr/bin/chromium")),
        }
        .apply(&mut config);

        assert_eq!(config.server.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.escalation.policy, EscalationPolicy::Race);
        assert_eq!(config.browser.executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.stealth.executable, config.browser.executable);
    }

    #[test]
    fn test_render_omits_html_by_default() {
        let mut outcome = FetchOutcome::failed("https://example.com", StrategyId::Request, "");
        outcome.html = "<p>body</p>".into();

        let short = render(&outcome, false).unwrap();
        assert!(!short.contains("\"html\""));
        assert!(short.contains("\"adapter\": \"request\""));

        let full = render(&outcome, true).unwrap();
        assert!(full.contains("<p>body</p>"));
    }
}
