use std::sync::Arc;

use pagestate_core::{FetchError, LoadKind, PageRequest, PageSource, Reply};
use pagestate_logging::ps_trace;
use tokio::runtime::Handle;

/// Async data source: the two page operations a list needs.
#[async_trait::async_trait]
pub trait AsyncPageSource<P: Send + 'static>: Send + Sync {
    async fn first_page(&self, page: u32) -> Result<P, FetchError>;

    async fn next_page(&self, page: u32) -> Result<P, FetchError>;

    async fn fetch(&self, request: PageRequest) -> Result<P, FetchError> {
        match request.kind {
            LoadKind::First => self.first_page(request.page).await,
            LoadKind::More => self.next_page(request.page).await,
        }
    }
}

#[async_trait::async_trait]
impl<P, S> AsyncPageSource<P> for Arc<S>
where
    P: Send + 'static,
    S: AsyncPageSource<P> + ?Sized,
{
    async fn first_page(&self, page: u32) -> Result<P, FetchError> {
        (**self).first_page(page).await
    }

    async fn next_page(&self, page: u32) -> Result<P, FetchError> {
        (**self).next_page(page).await
    }
}

/// Runs an [`AsyncPageSource`] on a tokio runtime and answers through the reply.
pub struct RuntimePageSource<P: Send + 'static> {
    source: Arc<dyn AsyncPageSource<P>>,
    handle: Handle,
}

impl<P: Send + 'static> RuntimePageSource<P> {
    pub fn new(source: Arc<dyn AsyncPageSource<P>>, handle: Handle) -> Self {
        Self { source, handle }
    }
}

impl<P: Send + 'static> PageSource<P> for RuntimePageSource<P> {
    fn request(&self, request: PageRequest, reply: Reply<P>) {
        let source = Arc::clone(&self.source);
        self.handle.spawn(async move {
            let result = source.fetch(request).await;
            ps_trace!(
                "{:?} load for page {} finished (ok: {})",
                request.kind,
                request.page,
                result.is_ok()
            );
            reply.complete(result);
        });
    }
}
