use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{FetchRequest, StrategyId};
use crate::fetcher::{FetchBackend, RawPage};
use crate::scraper::{
    BrowserConfig, BrowserLauncher, BrowserPool, ChromeLauncher, PageOptions, ReadyState,
    ResourceKind,
};

/// Headless Chrome announces itself in its default user agent.
const STEALTH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// How a browser strategy drives its pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserProfile {
    /// Render scripts, skip heavy sub-resources, done at DOMContentLoaded
    Plain,
    /// Also hide automation markers and wait for XHR-driven content on request
    Stealth,
}

impl BrowserProfile {
    pub fn page_options(&self, xhr: bool, user_agent: Option<String>) -> PageOptions {
        match self {
            BrowserProfile::Plain => PageOptions {
                ready: ReadyState::DomContentLoaded,
                allow: vec![ResourceKind::Document, ResourceKind::Script, ResourceKind::Xhr],
                mask_webdriver: false,
                dismiss_dialogs: false,
                user_agent,
            },
            BrowserProfile::Stealth => PageOptions {
                ready: if xhr {
                    ReadyState::NetworkIdle
                } else {
                    ReadyState::DomContentLoaded
                },
                allow: vec![
                    ResourceKind::Document,
                    ResourceKind::Script,
                    ResourceKind::Xhr,
                    ResourceKind::Fetch,
                ],
                mask_webdriver: true,
                dismiss_dialogs: true,
                user_agent: user_agent.or_else(|| Some(STEALTH_USER_AGENT.to_string())),
            },
        }
    }
}

/// Browser-backed strategy with its own pool of instances.
pub struct BrowserBackend {
    id: StrategyId,
    profile: BrowserProfile,
    pool: BrowserPool,
    config: BrowserConfig,
}

impl BrowserBackend {
    pub fn new(
        id: StrategyId,
        profile: BrowserProfile,
        launcher: Arc<dyn BrowserLauncher>,
        config: BrowserConfig,
    ) -> Self {
        Self {
            id,
            profile,
            pool: BrowserPool::new(launcher, &config),
            config,
        }
    }

    /// Backend rendering through locally launched Chrome/Chromium.
    pub fn chrome(id: StrategyId, profile: BrowserProfile, config: BrowserConfig) -> Self {
        let launcher = Arc::new(ChromeLauncher::new(config.clone()));
        Self::new(id, profile, launcher, config)
    }

    pub fn pool(&self) -> &BrowserPool {
        &self.pool
    }
}

#[async_trait]
impl FetchBackend for BrowserBackend {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn initialize(&self) -> Result<()> {
        self.pool.initialize().await
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await
    }

    async fn fetch(&self, request: &FetchRequest, budget: Duration) -> Result<RawPage> {
        let options = self
            .profile
            .page_options(request.xhr, self.config.user_agent.clone());
        self.pool.fetch_one(&request.url, &options, budget).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ExtractError;
    use crate::config::EscalationConfig;
    use crate::fetcher::FetchEscalator;
    use crate::scraper::{BrowserHandle, PageHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PageOptions>>,
        closed: AtomicUsize,
    }

    struct RecordingLauncher(Arc<Recorder>);
    struct RecordingBrowser(Arc<Recorder>);
    struct RecordingPage(Arc<Recorder>);

    #[async_trait]
    impl BrowserLauncher for RecordingLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserHandle>> {
            Ok(Box::new(RecordingBrowser(self.0.clone())))
        }
    }

    #[async_trait]
    impl BrowserHandle for RecordingBrowser {
        async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
            Ok(Box::new(RecordingPage(self.0.clone())))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    #[async_trait]
    impl PageHandle for RecordingPage {
        async fn open(&mut self, url: &str, options: &PageOptions) -> Result<()> {
            if url.contains("unreachable") {
                return Err(ExtractError::Browser("net::ERR_NAME_NOT_RESOLVED".into()));
            }
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            self.0.seen.lock().unwrap().push(options.clone());
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            Ok("<html><title>rendered</title></html>".to_string())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn backend_with(profile: BrowserProfile, config: BrowserConfig) -> (BrowserBackend, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let launcher = Arc::new(RecordingLauncher(recorder.clone()));
        let backend = BrowserBackend::new(StrategyId::Stealth, profile, launcher, config);
        (backend, recorder)
    }

    fn backend(profile: BrowserProfile) -> (BrowserBackend, Arc<Recorder>) {
        backend_with(profile, BrowserConfig::default())
    }

    #[test]
    fn test_plain_profile_blocks_heavy_resources() {
        let options = BrowserProfile::Plain.page_options(true, None);
        assert_eq!(options.ready, ReadyState::DomContentLoaded);
        assert!(options.allows(ResourceKind::Script));
        assert!(!options.allows(ResourceKind::Image));
        assert!(!options.allows(ResourceKind::Stylesheet));
        assert!(!options.mask_webdriver);
        assert!(options.user_agent.is_none());
    }

    #[test]
    fn test_stealth_profile_waits_for_network_when_xhr() {
        let with_xhr = BrowserProfile::Stealth.page_options(true, None);
        assert_eq!(with_xhr.ready, ReadyState::NetworkIdle);
        assert!(with_xhr.allows(ResourceKind::Fetch));
        assert!(with_xhr.mask_webdriver);
        assert!(with_xhr.dismiss_dialogs);
        assert_eq!(with_xhr.user_agent.as_deref(), Some(STEALTH_USER_AGENT));

        let without_xhr = BrowserProfile::Stealth.page_options(false, Some("custom".into()));
        assert_eq!(without_xhr.ready, ReadyState::DomContentLoaded);
        assert_eq!(without_xhr.user_agent.as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn test_fetch_renders_with_profile_options() {
        let (backend, recorder) = backend(BrowserProfile::Stealth);
        let request = FetchRequest::new("https://example.com").with_xhr(true);

        let page = backend.fetch(&request, backend.timeout()).await.unwrap();

        assert_eq!(
            page,
            RawPage::Html("<html><title>rendered</title></html>".to_string())
        );
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].ready, ReadyState::NetworkIdle);
        assert_eq!(backend.id(), StrategyId::Stealth);
        assert_eq!(backend.pool().size().await, 1);
    }

    #[tokio::test]
    async fn test_navigation_error_is_failed_page() {
        let (backend, _) = backend(BrowserProfile::Plain);
        let request = FetchRequest::new("https://unreachable.invalid");

        let page = backend.fetch(&request, backend.timeout()).await.unwrap();

        assert!(matches!(page, RawPage::Failed(reason) if reason.contains("ERR_NAME_NOT_RESOLVED")));
    }

    #[tokio::test]
    async fn test_strategy_timeout_closes_page_before_reporting() {
        let config = BrowserConfig {
            navigation_timeout_ms: 1000,
            timeout_ms: 50,
            ..Default::default()
        };
        let (backend, recorder) = backend_with(BrowserProfile::Stealth, config);
        let escalator = FetchEscalator::new(&EscalationConfig {
            default_strategies: vec![StrategyId::Stealth],
            ..Default::default()
        })
        .with_backend(Arc::new(backend));

        let outcome = escalator
            .extract(&FetchRequest::new("https://slow.example.com"))
            .await
            .unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure_reason, "timeout");
        assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_releases_pool() {
        let (backend, _) = backend(BrowserProfile::Plain);
        backend.initialize().await.unwrap();
        assert_eq!(backend.pool().size().await, 1);

        backend.close().await.unwrap();
        backend.close().await.unwrap();
        assert_eq!(backend.pool().size().await, 0);
    }
}
