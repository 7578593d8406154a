//! Headless-browser fetching.
//!
//! Browser strategies render pages in Chromium through a fixed-size pool:
//!
//! ```text
//! FetchRequest → BrowserBackend → BrowserPool (round-robin, per-slot gate) → PageHandle → HTML
//! ```
//!
//! The pool is written against the [`BrowserLauncher`], [`BrowserHandle`] and
//! [`PageHandle`] traits; [`ChromeLauncher`] is the chromiumoxide engine.
//!
//! # Usage
//!
//! ```rust,ignore
//! use page_extractor::scraper::{BrowserBackend, BrowserConfig, BrowserProfile};
//!
//! let backend = BrowserBackend::chrome(StrategyId::Stealth, BrowserProfile::Stealth, config);
//! let request = FetchRequest::new("https://example.com").with_xhr(true);
//! let page = backend.fetch(&request, backend.timeout()).await?;
//! backend.close().await?;
//! ```

mod backend;
mod chrome;
mod config;
mod pool;

pub use backend::{BrowserBackend, BrowserProfile};
pub use chrome::ChromeLauncher;
pub use config::BrowserConfig;
pub use pool::BrowserPool;

use async_trait::async_trait;

use crate::app::Result;

/// When a navigation counts as done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// The DOMContentLoaded event fired
    DomContentLoaded,
    /// Network has been (almost) idle for a moment; for XHR-driven pages
    NetworkIdle,
}

/// Sub-resource kinds a page may be allowed to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Script,
    Xhr,
    Fetch,
    Stylesheet,
    Image,
    Font,
    Media,
    Other,
}

/// Per-navigation behaviour, derived from a [`BrowserProfile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    pub ready: ReadyState,
    /// Sub-resources outside this list are aborted
    pub allow: Vec<ResourceKind>,
    /// Hide `navigator.webdriver` before any page script runs
    pub mask_webdriver: bool,
    /// Dismiss alert/confirm/prompt dialogs as they open
    pub dismiss_dialogs: bool,
    pub user_agent: Option<String>,
}

impl PageOptions {
    pub fn allows(&self, kind: ResourceKind) -> bool {
        self.allow.contains(&kind)
    }
}

/// Starts browser instances for a pool
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserHandle>>;
}

/// One running browser instance, owned by a pool slot
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Open a blank page. Fails when the instance is dead or disconnected.
    async fn new_page(&self) -> Result<Box<dyn PageHandle>>;

    /// Shut the instance down. Safe to call more than once.
    async fn close(&self) -> Result<()>;

    fn is_alive(&self) -> bool;
}

/// A single page (tab) used for exactly one navigation
#[async_trait]
pub trait PageHandle: Send {
    /// Install interception and navigate, returning once `options.ready` is reached.
    async fn open(&mut self, url: &str, options: &PageOptions) -> Result<()>;

    /// Rendered HTML of the current document.
    async fn content(&mut self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}
