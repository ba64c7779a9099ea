use std::sync::{mpsc, Arc};

use pagestate_logging::{ps_debug, ps_trace, ps_warn};

use crate::observer::WeakObserver;
use crate::{
    ChannelCompletionSink, CompletionSink, FetchError, LoadOutcome, ObserverRegistry, PagePayload,
    PageSource, PageState, PageStateError, PageStateObserver, PagingCursorConfig,
    PagingCursorWorker, WorkerReport,
};

/// Transition engine for a paged list.
///
/// All methods run on the single context that owns the machine. Commands
/// return right after the intermediate transition; the source's answer is
/// applied later by [`process_completions`](Self::process_completions) or
/// [`handle_completion`](Self::handle_completion).
pub struct PageStateMachine<P> {
    state: PageState<P>,
    no_more: bool,
    open: bool,
    worker: PagingCursorWorker<P>,
    observers: ObserverRegistry<P>,
    inbox: Option<mpsc::Receiver<LoadOutcome<P>>>,
}

impl<P> PageStateMachine<P>
where
    P: PagePayload + Send + 'static,
{
    /// Builds a machine that queues completions in its own inbox.
    pub fn new(source: Arc<dyn PageSource<P>>, config: PagingCursorConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let sink: Arc<dyn CompletionSink<P>> = Arc::new(ChannelCompletionSink::new(tx));
        let mut machine = Self::with_sink(source, config, sink);
        machine.inbox = Some(rx);
        machine
    }

    /// Builds a machine whose completions go to `sink`; the owner feeds them
    /// back through [`handle_completion`](Self::handle_completion).
    pub fn with_sink(
        source: Arc<dyn PageSource<P>>,
        config: PagingCursorConfig,
        sink: Arc<dyn CompletionSink<P>>,
    ) -> Self {
        Self {
            state: PageState::Initial,
            no_more: false,
            open: true,
            worker: PagingCursorWorker::new(source, config, sink),
            observers: ObserverRegistry::new(),
            inbox: None,
        }
    }

    pub fn state(&self) -> &PageState<P> {
        &self.state
    }

    /// Set exactly when the current state is `Error`.
    pub fn current_error(&self) -> Option<&PageStateError> {
        self.state.error()
    }

    pub fn is_no_more(&self) -> bool {
        self.no_more
    }

    /// Overrides the memoized "no more pages" flag.
    pub fn set_no_more(&mut self, no_more: bool) {
        ps_debug!("No-more flag forced to {}", no_more);
        self.no_more = no_more;
    }

    pub fn current_page(&self) -> u32 {
        self.worker.current_page()
    }

    pub fn is_one_time_load(&self) -> bool {
        self.worker.is_one_time_load()
    }

    pub fn in_flight(&self) -> usize {
        self.worker.in_flight()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        if !self.open {
            ps_debug!("Page state gate opened");
        }
        self.open = true;
    }

    /// Closes the gate. With an error, the machine first switches to `Error`.
    ///
    /// While closed, commands are ignored and completions only move the cursor.
    /// An error is applied even when the gate is already closed.
    pub fn close(&mut self, error: Option<FetchError>) {
        if let Some(err) = error {
            self.switch_state(PageState::Error(PageStateError::classify(err)));
        }
        if !self.open {
            ps_trace!("Page state gate already closed");
            return;
        }
        self.open = false;
        ps_debug!("Page state gate closed in state {}", self.state);
    }

    pub fn subscribe<O>(&mut self, observer: &Arc<O>)
    where
        O: PageStateObserver<P> + 'static,
    {
        self.observers.subscribe(observer);
    }

    pub fn subscribe_weak(&mut self, observer: WeakObserver<P>) {
        self.observers.subscribe_weak(observer);
    }

    pub fn unsubscribe<O>(&mut self, observer: &Arc<O>) -> bool
    where
        O: ?Sized,
    {
        self.observers.unsubscribe(observer)
    }

    pub fn unsubscribe_weak(&mut self, observer: &WeakObserver<P>) -> bool {
        self.observers.unsubscribe_weak(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Pull-to-refresh: reload the first page while the list stays visible.
    pub fn refresh(&mut self) {
        if !self.accepts("refresh") {
            return;
        }
        self.switch_state(PageState::Loading);
        self.worker.request_first_load();
    }

    /// Initial load of an empty list.
    pub fn start_loading(&mut self) {
        if !self.accepts("start_loading") {
            return;
        }
        self.switch_state(PageState::InitialLoading);
        self.worker.request_first_load();
    }

    pub fn load_more(&mut self) {
        if !self.accepts("load_more") {
            return;
        }
        if self.worker.is_one_time_load() {
            self.no_more = true;
            self.switch_state(PageState::NoMore);
            return;
        }
        if self.no_more {
            self.switch_state(PageState::NoMore);
            return;
        }
        self.switch_state(PageState::LoadingMore);
        self.worker.request_more_load();
    }

    /// Applies every completion waiting in the inbox. Returns how many were applied.
    ///
    /// Machines built with [`with_sink`](Self::with_sink) have no inbox and return 0.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let next = self.inbox.as_ref().and_then(|rx| rx.try_recv().ok());
            let Some(outcome) = next else {
                break;
            };
            self.handle_completion(outcome);
            applied += 1;
        }
        applied
    }

    pub fn handle_completion(&mut self, outcome: LoadOutcome<P>) {
        let report = self.worker.complete(outcome);
        if !self.open {
            ps_trace!("Gate closed; completion only updated the cursor");
            return;
        }
        match report {
            WorkerReport::FirstLoadSucceeded(payload) => {
                self.no_more = !payload.has_more();
                let next = if payload.is_empty() {
                    PageState::Empty
                } else {
                    PageState::Finish(payload)
                };
                self.switch_state(next);
            }
            WorkerReport::MoreLoadSucceeded(payload) => {
                // Pages are not merged here; the list layer appends.
                self.no_more = !payload.has_more();
                self.switch_state(PageState::Finish(payload));
            }
            WorkerReport::FirstLoadFailed(err) | WorkerReport::MoreLoadFailed(err) => {
                let err = PageStateError::classify(err);
                ps_warn!("Page load failed: {}", err);
                self.switch_state(PageState::Error(err));
            }
        }
    }

    fn accepts(&self, command: &str) -> bool {
        if !self.open {
            ps_trace!("Ignoring {} while the gate is closed", command);
        }
        self.open
    }

    /// Commits `next` unless it has the same tag as the current state.
    fn switch_state(&mut self, next: PageState<P>) -> bool {
        if self.state == next {
            ps_trace!("Suppressed no-op transition to {}", next);
            return false;
        }

        let observers = self.observers.snapshot();
        for observer in &observers {
            observer.on_will_switch(&next, &self.state);
        }
        let old = std::mem::replace(&mut self.state, next);
        ps_debug!("Page state {} -> {}", old, self.state);
        for observer in &observers {
            observer.on_did_switch(&self.state, &old);
        }
        drop(observers);

        self.observers.compact();
        true
    }
}
