use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventJavascriptDialogOpening, EventLifecycleEvent,
    HandleJavaScriptDialogParams, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{ExtractError, Result};
use crate::scraper::{
    BrowserConfig, BrowserHandle, BrowserLauncher, PageHandle, PageOptions, ReadyState,
    ResourceKind,
};

const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-infobars",
    "--disable-popup-blocking",
    "--disable-web-security",
    "--disable-features=TranslateUI",
    "--ignore-certificate-errors",
];

const MASK_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Launches Chrome/Chromium instances through chromiumoxide.
///
/// Each instance gets its own profile directory under the system temp dir,
/// removed again when the instance is closed.
pub struct ChromeLauncher {
    config: BrowserConfig,
    launched: AtomicUsize,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            launched: AtomicUsize::new(0),
        }
    }

    fn profile_dir(&self) -> PathBuf {
        let n = self.launched.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("page-extractor-{}-{}", std::process::id(), n))
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserHandle>> {
        let profile_dir = self.profile_dir();

        let mut builder = LaunchConfig::builder().user_data_dir(&profile_dir);
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        if let Some(ref executable) = self.config.executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }

        let launch_config = builder
            .build()
            .map_err(|e| ExtractError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(launch_config).await.map_err(|e| {
            ExtractError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let alive = Arc::new(AtomicBool::new(true));
        let handler_alive = alive.clone();
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler error");
                }
            }
            handler_alive.store(false, Ordering::SeqCst);
        });

        info!(profile = %profile_dir.display(), "Launched browser instance");

        Ok(Box::new(ChromeBrowser {
            browser: RwLock::new(browser),
            handler,
            alive,
            closed: AtomicBool::new(false),
            profile_dir,
        }))
    }
}

struct ChromeBrowser {
    browser: RwLock<Browser>,
    handler: JoinHandle<()>,
    /// Cleared when the CDP connection ends
    alive: Arc<AtomicBool>,
    closed: AtomicBool,
    profile_dir: PathBuf,
}

#[async_trait]
impl BrowserHandle for ChromeBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        if !self.is_alive() {
            return Err(ExtractError::Browser("browser instance disconnected".to_string()));
        }

        let page = self
            .browser
            .read()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| ExtractError::Browser(format!("Failed to create page: {}", e)))?;

        Ok(Box::new(ChromePage {
            page,
            tasks: Vec::new(),
        }))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = {
            let mut browser = self.browser.write().await;
            match browser.close().await {
                Ok(_) => browser.wait().await.map(|_| ()).map_err(ExtractError::from),
                Err(e) => Err(ExtractError::from(e)),
            }
        };

        self.handler.abort();
        self.alive.store(false, Ordering::SeqCst);
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            debug!(profile = %self.profile_dir.display(), error = %e, "Failed to remove profile dir");
        }

        result
    }

    fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.alive.load(Ordering::SeqCst)
    }
}

struct ChromePage {
    page: Page,
    /// Interception and dialog listeners living as long as the page
    tasks: Vec<JoinHandle<()>>,
}

impl ChromePage {
    async fn intercept(&mut self, options: &PageOptions) -> Result<()> {
        let mut paused = self.page.event_listener::<EventRequestPaused>().await?;
        self.page
            .execute(
                EnableParams::builder()
                    .pattern(RequestPattern::builder().url_pattern("*").build())
                    .build(),
            )
            .await?;

        let page = self.page.clone();
        let allow = options.allow.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let kind = resource_kind(&event.resource_type);
                let result = if allow.contains(&kind) {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                } else {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                };
                if let Err(e) = result {
                    debug!(error = %e, "Failed to resolve paused request");
                }
            }
        }));

        Ok(())
    }

    async fn dismiss_dialogs(&mut self) -> Result<()> {
        let mut dialogs = self
            .page
            .event_listener::<EventJavascriptDialogOpening>()
            .await?;

        let page = self.page.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(dialog) = dialogs.next().await {
                debug!(message = %dialog.message, "Dismissing dialog");
                let _ = page.execute(HandleJavaScriptDialogParams::new(false)).await;
            }
        }));

        Ok(())
    }
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn open(&mut self, url: &str, options: &PageOptions) -> Result<()> {
        if let Some(ref user_agent) = options.user_agent {
            self.page.set_user_agent(user_agent.as_str()).await?;
        }
        if options.mask_webdriver {
            self.page
                .execute(AddScriptToEvaluateOnNewDocumentParams::new(MASK_WEBDRIVER))
                .await?;
        }
        if options.dismiss_dialogs {
            self.dismiss_dialogs().await?;
        }
        self.intercept(options).await?;

        let mut lifecycle = self.page.event_listener::<EventLifecycleEvent>().await?;
        self.page
            .execute(SetLifecycleEventsEnabledParams::new(true))
            .await?;

        let navigation = self.page.execute(NavigateParams::new(url)).await?;
        if let Some(ref error) = navigation.result.error_text {
            return Err(ExtractError::Browser(format!("Navigation failed: {}", error)));
        }

        let frame_id = navigation.result.frame_id.clone();
        let loader_id = navigation.result.loader_id.clone();
        let wanted = lifecycle_event(options.ready);

        while let Some(event) = lifecycle.next().await {
            let same_document = loader_id.as_ref().map_or(true, |id| *id == event.loader_id);
            if event.frame_id == frame_id && same_document && event.name == wanted {
                return Ok(());
            }
        }

        warn!(url, "Page closed before it finished loading");
        Err(ExtractError::Browser("page closed during navigation".to_string()))
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        for task in &self.tasks {
            task.abort();
        }
        self.page.close().await?;
        Ok(())
    }
}

fn lifecycle_event(ready: ReadyState) -> &'static str {
    match ready {
        ReadyState::DomContentLoaded => "DOMContentLoaded",
        ReadyState::NetworkIdle => "networkAlmostIdle",
    }
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Media => ResourceKind::Media,
        _ => ResourceKind::Other,
    }
}
