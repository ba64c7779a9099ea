use std::time::Duration;

use pagestate_core::{is_unreachable, FetchError, LoadKind, PageRequest};
use pagestate_logging::ps_warn;

use crate::AsyncPageSource;

/// Re-issues a failed request once before reporting the failure.
///
/// Reachability failures are reported straight away.
pub struct RetryOnce<S> {
    inner: S,
    delay: Option<Duration>,
}

impl<S> RetryOnce<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, delay: None }
    }

    /// Waits `delay` before the second attempt.
    pub fn with_delay(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay: Some(delay),
        }
    }
}

async fn attempt<S, P>(
    inner: &S,
    delay: Option<Duration>,
    request: PageRequest,
) -> Result<P, FetchError>
where
    S: AsyncPageSource<P>,
    P: Send + 'static,
{
    match inner.fetch(request).await {
        Err(err) if !is_unreachable(&err) => {
            ps_warn!(
                "{:?} load for page {} failed, retrying once: {}",
                request.kind,
                request.page,
                err
            );
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            inner.fetch(request).await
        }
        other => other,
    }
}

#[async_trait::async_trait]
impl<S, P> AsyncPageSource<P> for RetryOnce<S>
where
    S: AsyncPageSource<P>,
    P: Send + 'static,
{
    async fn first_page(&self, page: u32) -> Result<P, FetchError> {
        let request = PageRequest {
            kind: LoadKind::First,
            page,
        };
        attempt(&self.inner, self.delay, request).await
    }

    async fn next_page(&self, page: u32) -> Result<P, FetchError> {
        let request = PageRequest {
            kind: LoadKind::More,
            page,
        };
        attempt(&self.inner, self.delay, request).await
    }
}
