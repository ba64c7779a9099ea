use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pagestate_core::{fetch_error, FetchError, Page, PageBase};
use pagestate_logging::ps_debug;

#[derive(Debug, thiserror::Error)]
#[error("simulated failure for page {0}")]
pub(crate) struct SimulatedFailure(pub u32);

/// Serves `0..total` in pages of `page_size`, after a fixed latency.
pub(crate) struct InMemorySource {
    total: u32,
    page_size: u32,
    base: PageBase,
    latency: Duration,
    flaky_page: Option<u32>,
    flaked: AtomicBool,
}

impl InMemorySource {
    pub fn new(total: u32, page_size: u32, base: PageBase, latency: Duration) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
            base,
            latency,
            flaky_page: None,
            flaked: AtomicBool::new(false),
        }
    }

    pub fn with_flaky_page(mut self, page: Option<u32>) -> Self {
        self.flaky_page = page;
        self
    }

    fn slice(&self, page: u32) -> Result<Page<u32>, FetchError> {
        if self.flaky_page == Some(page) && !self.flaked.swap(true, Ordering::SeqCst) {
            return Err(fetch_error(SimulatedFailure(page)));
        }
        let index = page.saturating_sub(self.base.offset());
        let start = index.saturating_mul(self.page_size).min(self.total);
        let end = start.saturating_add(self.page_size).min(self.total);
        ps_debug!("Serving page {} (items {}..{})", page, start, end);
        Ok(Page::new((start..end).collect(), end < self.total))
    }

    async fn answer(&self, page: u32) -> Result<Page<u32>, FetchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.slice(page)
    }
}

#[async_trait::async_trait]
impl pagestate_engine::AsyncPageSource<Page<u32>> for InMemorySource {
    async fn first_page(&self, page: u32) -> Result<Page<u32>, FetchError> {
        self.answer(page).await
    }

    async fn next_page(&self, page: u32) -> Result<Page<u32>, FetchError> {
        self.answer(page).await
    }
}
