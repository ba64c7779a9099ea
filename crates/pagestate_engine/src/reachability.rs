use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pagestate_core::{fetch_error, FetchError, Unreachable};
use pagestate_logging::ps_debug;

use crate::AsyncPageSource;

/// Answers whether the network can currently be reached.
pub trait Reachability: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Reachability flag set by whoever watches the network.
#[derive(Debug)]
pub struct StaticReachability {
    reachable: AtomicBool,
}

impl StaticReachability {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }
}

impl Default for StaticReachability {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Reachability for StaticReachability {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }
}

/// Fails requests with [`Unreachable`] without calling the inner source while offline.
pub struct ReachabilityGate<S> {
    inner: S,
    reachability: Arc<dyn Reachability>,
}

impl<S> ReachabilityGate<S> {
    pub fn new(inner: S, reachability: Arc<dyn Reachability>) -> Self {
        Self {
            inner,
            reachability,
        }
    }

    fn check(&self, page: u32) -> Result<(), FetchError> {
        if self.reachability.is_reachable() {
            Ok(())
        } else {
            ps_debug!("Network unreachable; short-circuiting page {}", page);
            Err(fetch_error(Unreachable))
        }
    }
}

#[async_trait::async_trait]
impl<S, P> AsyncPageSource<P> for ReachabilityGate<S>
where
    S: AsyncPageSource<P>,
    P: Send + 'static,
{
    async fn first_page(&self, page: u32) -> Result<P, FetchError> {
        self.check(page)?;
        self.inner.first_page(page).await
    }

    async fn next_page(&self, page: u32) -> Result<P, FetchError> {
        self.check(page)?;
        self.inner.next_page(page).await
    }
}
