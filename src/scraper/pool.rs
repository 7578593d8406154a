use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::app::{ExtractError, Result};
use crate::fetcher::RawPage;
use crate::scraper::{BrowserConfig, BrowserHandle, BrowserLauncher, PageHandle, PageOptions};

/// Fixed-size pool of browser instances.
///
/// Requests are spread round-robin over the slots. Each slot has its own
/// gate of `page_count` permits, so at most `browser_count * page_count`
/// pages are open at once. A slot whose browser cannot open a page is
/// relaunched in place, once per call.
pub struct BrowserPool {
    launcher: Arc<dyn BrowserLauncher>,
    browser_count: usize,
    page_count: usize,
    navigation_timeout: Duration,
    slots: RwLock<Vec<Arc<PoolSlot>>>,
    next: AtomicUsize,
}

struct PoolSlot {
    index: usize,
    browser: RwLock<SlotBrowser>,
    gate: Semaphore,
    in_flight: AtomicUsize,
}

struct SlotBrowser {
    /// Bumped on every replacement
    generation: u64,
    handle: Arc<dyn BrowserHandle>,
}

impl PoolSlot {
    fn new(index: usize, handle: Arc<dyn BrowserHandle>, page_count: usize) -> Self {
        Self {
            index,
            browser: RwLock::new(SlotBrowser {
                generation: 0,
                handle,
            }),
            gate: Semaphore::new(page_count),
            in_flight: AtomicUsize::new(0),
        }
    }

    async fn current(&self) -> (u64, Arc<dyn BrowserHandle>) {
        let browser = self.browser.read().await;
        (browser.generation, browser.handle.clone())
    }
}

/// Counts a page against its slot for as long as it lives.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Closes the page on every exit path.
///
/// `close` does it inline; if the fetch future is dropped first (an outer
/// timeout), the close runs on a spawned task instead.
struct PageGuard(Option<Box<dyn PageHandle>>);

impl PageGuard {
    async fn load(&mut self, url: &str, options: &PageOptions) -> Result<String> {
        let page = self
            .0
            .as_mut()
            .ok_or_else(|| ExtractError::Browser("page already closed".to_string()))?;
        page.open(url, options).await?;
        page.content().await
    }

    async fn close(mut self) {
        if let Some(page) = self.0.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Failed to close page");
            }
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.0.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}

impl BrowserPool {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: &BrowserConfig) -> Self {
        Self {
            launcher,
            browser_count: config.browser_count.max(1),
            page_count: config.page_count.max(1),
            navigation_timeout: config.navigation_timeout(),
            slots: RwLock::new(Vec::new()),
            next: AtomicUsize::new(0),
        }
    }

    /// Launch `browser_count` instances if the pool is empty.
    ///
    /// On a failed launch the instances started so far are closed again and
    /// the pool stays empty.
    pub async fn initialize(&self) -> Result<()> {
        let mut slots = self.slots.write().await;
        if !slots.is_empty() {
            return Ok(());
        }

        let mut launched: Vec<Arc<PoolSlot>> = Vec::with_capacity(self.browser_count);
        for index in 0..self.browser_count {
            match self.launcher.launch().await {
                Ok(handle) => {
                    launched.push(Arc::new(PoolSlot::new(
                        index,
                        Arc::from(handle),
                        self.page_count,
                    )));
                }
                Err(e) => {
                    error!(slot = index, error = %e, "Failed to launch browser instance");
                    for slot in &launched {
                        let (_, handle) = slot.current().await;
                        let _ = handle.close().await;
                    }
                    return Err(ExtractError::PoolInit(e.to_string()));
                }
            }
        }

        info!(
            browsers = self.browser_count,
            pages_per_browser = self.page_count,
            "Browser pool ready"
        );
        *slots = launched;
        Ok(())
    }

    /// Render `url` on the next slot within `budget`.
    ///
    /// The budget covers the wait for a free page on that slot plus the
    /// navigation; the navigation is further capped by the navigation
    /// timeout. Running out of either yields `RawPage::Failed("timeout")`,
    /// and the page is closed before that is returned. Other navigation
    /// errors are returned as failures too. Only pool-level problems
    /// (launch failure, a slot that stays dead after one replacement) are
    /// errors.
    pub async fn fetch_one(
        &self,
        url: &str,
        options: &PageOptions,
        budget: Duration,
    ) -> Result<RawPage> {
        let deadline = Instant::now() + budget;
        let slot = self.next_slot().await?;

        let _permit = match timeout_at(deadline, slot.gate.acquire()).await {
            Ok(permit) => {
                permit.map_err(|_| ExtractError::Browser("browser pool closed".to_string()))?
            }
            Err(_) => {
                warn!(url, slot = slot.index, "Timed out waiting for a free page");
                return Ok(RawPage::timeout());
            }
        };
        let _in_flight = InFlight::enter(&slot.in_flight);

        let mut page = PageGuard(Some(self.open_page(&slot).await?));
        let limit = deadline.min(Instant::now() + self.navigation_timeout);
        let result = timeout_at(limit, page.load(url, options)).await;
        page.close().await;

        match result {
            Ok(Ok(html)) => Ok(RawPage::Html(html)),
            Ok(Err(e)) => {
                error!(url, slot = slot.index, error = %e, "Navigation failed");
                Ok(RawPage::Failed(e.to_string()))
            }
            Err(_) => {
                warn!(url, slot = slot.index, "Navigation timed out");
                Ok(RawPage::timeout())
            }
        }
    }

    /// Close every instance. Idempotent; a later fetch initializes again.
    pub async fn close(&self) -> Result<()> {
        let slots = std::mem::take(&mut *self.slots.write().await);
        if slots.is_empty() {
            return Ok(());
        }

        let mut first_error = None;
        for slot in slots {
            slot.gate.close();
            let (_, handle) = slot.current().await;
            if let Err(e) = handle.close().await {
                warn!(slot = slot.index, error = %e, "Failed to close browser instance");
                first_error.get_or_insert(e);
            }
        }

        info!("Browser pool closed");
        first_error.map_or(Ok(()), Err)
    }

    /// Number of live slots (0 before initialization and after close).
    pub async fn size(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Pages currently open on slot `index`.
    pub async fn in_flight(&self, index: usize) -> Option<usize> {
        self.slots
            .read()
            .await
            .get(index)
            .map(|slot| slot.in_flight.load(Ordering::SeqCst))
    }

    async fn next_slot(&self) -> Result<Arc<PoolSlot>> {
        if let Some(slot) = self.pick().await {
            return Ok(slot);
        }

        self.initialize().await?;
        self.pick()
            .await
            .ok_or_else(|| ExtractError::Browser("browser pool closed".to_string()))
    }

    async fn pick(&self) -> Option<Arc<PoolSlot>> {
        let slots = self.slots.read().await;
        if slots.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % slots.len();
        Some(slots[index].clone())
    }

    /// Open a page on the slot's browser, replacing a dead browser once.
    async fn open_page(&self, slot: &PoolSlot) -> Result<Box<dyn PageHandle>> {
        let (generation, browser) = slot.current().await;

        let first_error = if browser.is_alive() {
            match browser.new_page().await {
                Ok(page) => return Ok(page),
                Err(e) => e,
            }
        } else {
            ExtractError::Browser("browser instance disconnected".to_string())
        };

        warn!(
            slot = slot.index,
            error = %first_error,
            "Page creation failed, replacing browser instance"
        );
        let browser = self.replace(slot, generation).await?;

        browser.new_page().await.map_err(|e| {
            ExtractError::Browser(format!(
                "page creation failed after replacing browser: {}",
                e
            ))
        })
    }

    /// Swap the slot's browser for a fresh one, unless another caller already did.
    async fn replace(&self, slot: &PoolSlot, failed_generation: u64) -> Result<Arc<dyn BrowserHandle>> {
        let mut current = slot.browser.write().await;
        if current.generation != failed_generation {
            return Ok(current.handle.clone());
        }

        if let Err(e) = current.handle.close().await {
            debug!(slot = slot.index, error = %e, "Failed to close dead browser instance");
        }

        let fresh: Arc<dyn BrowserHandle> = Arc::from(self.launcher.launch().await?);
        current.generation += 1;
        current.handle = fresh.clone();

        info!(
            slot = slot.index,
            generation = current.generation,
            "Browser instance replaced"
        );
        Ok(fresh)
    }
}
