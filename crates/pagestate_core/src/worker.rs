use std::sync::{mpsc, Arc};

use pagestate_logging::{ps_debug, ps_warn};

use crate::{fetch_error, Abandoned, FetchError, PagingCursorConfig};

/// Which of the two source operations a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    First,
    More,
}

/// A single page request issued by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub kind: LoadKind,
    /// Page index in the source's numbering (already offset by the page base).
    pub page: u32,
}

/// Completion of one request, tagged with the kind of request it answers.
#[derive(Debug, Clone)]
pub struct LoadOutcome<P> {
    pub kind: LoadKind,
    pub result: Result<P, FetchError>,
}

/// Carries completions back to the context that owns the machine.
pub trait CompletionSink<P>: Send + Sync {
    fn deliver(&self, outcome: LoadOutcome<P>);
}

pub struct ChannelCompletionSink<P> {
    tx: mpsc::Sender<LoadOutcome<P>>,
}

impl<P> ChannelCompletionSink<P> {
    pub fn new(tx: mpsc::Sender<LoadOutcome<P>>) -> Self {
        Self { tx }
    }
}

impl<P: Send> CompletionSink<P> for ChannelCompletionSink<P> {
    fn deliver(&self, outcome: LoadOutcome<P>) {
        if self.tx.send(outcome).is_err() {
            ps_warn!("Dropping page completion: receiving machine is gone");
        }
    }
}

/// One-shot answer handle for a [`PageRequest`].
///
/// Completing consumes the handle, so a request is answered exactly once.
/// Dropping it unanswered completes the request with [`Abandoned`].
pub struct Reply<P> {
    request: PageRequest,
    sink: Option<Arc<dyn CompletionSink<P>>>,
}

impl<P> Reply<P> {
    pub fn request(&self) -> PageRequest {
        self.request
    }

    pub fn complete(mut self, result: Result<P, FetchError>) {
        self.deliver(result);
    }

    pub fn succeed(self, payload: P) {
        self.complete(Ok(payload));
    }

    pub fn fail<E>(self, err: E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.complete(Err(fetch_error(err)));
    }

    fn deliver(&mut self, result: Result<P, FetchError>) {
        if let Some(sink) = self.sink.take() {
            sink.deliver(LoadOutcome {
                kind: self.request.kind,
                result,
            });
        }
    }
}

impl<P> Drop for Reply<P> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            ps_warn!(
                "{:?} request for page {} dropped without an answer",
                self.request.kind,
                self.request.page
            );
            self.deliver(Err(fetch_error(Abandoned)));
        }
    }
}

/// Data source behind the worker.
///
/// Implementations may answer from any thread, at any later time, but must
/// answer each request through its [`Reply`].
pub trait PageSource<P>: Send + Sync {
    fn request(&self, request: PageRequest, reply: Reply<P>);
}

/// What the worker reports upward for each completed request.
#[derive(Debug)]
pub enum WorkerReport<P> {
    FirstLoadSucceeded(P),
    MoreLoadSucceeded(P),
    FirstLoadFailed(FetchError),
    MoreLoadFailed(FetchError),
}

/// Owns the page cursor and issues first/more requests to a [`PageSource`].
pub struct PagingCursorWorker<P> {
    config: PagingCursorConfig,
    loading_more_time: u32,
    in_flight: usize,
    source: Arc<dyn PageSource<P>>,
    sink: Arc<dyn CompletionSink<P>>,
}

impl<P> PagingCursorWorker<P> {
    pub fn new(
        source: Arc<dyn PageSource<P>>,
        config: PagingCursorConfig,
        sink: Arc<dyn CompletionSink<P>>,
    ) -> Self {
        Self {
            config,
            loading_more_time: 0,
            in_flight: 0,
            source,
            sink,
        }
    }

    pub fn config(&self) -> PagingCursorConfig {
        self.config
    }

    pub fn is_one_time_load(&self) -> bool {
        self.config.one_time_load()
    }

    /// Index of the last page handed out, in the source's numbering.
    pub fn current_page(&self) -> u32 {
        self.loading_more_time + self.config.page_base().offset()
    }

    /// Requests issued whose completion has not come back through [`complete`](Self::complete).
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn request_first_load(&mut self) {
        let request = PageRequest {
            kind: LoadKind::First,
            page: self.config.page_base().offset(),
        };
        self.issue(request);
    }

    pub fn request_more_load(&mut self) {
        let request = PageRequest {
            kind: LoadKind::More,
            page: self.current_page() + 1,
        };
        self.issue(request);
    }

    /// Applies a completion to the cursor and turns it into a report.
    ///
    /// A finished first load resets the cursor whether or not it succeeded;
    /// only a successful more-load advances it.
    pub fn complete(&mut self, outcome: LoadOutcome<P>) -> WorkerReport<P> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match (outcome.kind, outcome.result) {
            (LoadKind::First, Ok(payload)) => {
                self.loading_more_time = 0;
                WorkerReport::FirstLoadSucceeded(payload)
            }
            (LoadKind::First, Err(err)) => {
                self.loading_more_time = 0;
                WorkerReport::FirstLoadFailed(err)
            }
            (LoadKind::More, Ok(payload)) => {
                self.loading_more_time += 1;
                WorkerReport::MoreLoadSucceeded(payload)
            }
            (LoadKind::More, Err(err)) => WorkerReport::MoreLoadFailed(err),
        }
    }

    fn issue(&mut self, request: PageRequest) {
        ps_debug!(
            "Requesting {:?} load for page {} (in flight before: {})",
            request.kind,
            request.page,
            self.in_flight
        );
        self.in_flight += 1;
        let reply = Reply {
            request,
            sink: Some(Arc::clone(&self.sink)),
        };
        self.source.request(request, reply);
    }
}
