use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pagestate_core::{
    CompletionSink, FetchError, LoadOutcome, PagePayload, PageSource, PageStateMachine,
    PageStateObserver, PagingCursorConfig, WeakObserver,
};
use pagestate_logging::{ps_debug, ps_info, ps_warn};
use tokio::runtime::Runtime;

use crate::fetch::{AsyncPageSource, RuntimePageSource};
use crate::{DriverError, DriverSettings, DriverSnapshot};

const FETCH_WORKERS: usize = 2;

enum DriverEvent<P> {
    Refresh,
    StartLoading,
    LoadMore,
    SetNoMore(bool),
    Open,
    Close(Option<FetchError>),
    Subscribe(WeakObserver<P>),
    Unsubscribe(WeakObserver<P>),
    Completed(LoadOutcome<P>),
    Shutdown,
}

/// Routes source completions into the driver's event channel.
struct DriverSink<P> {
    tx: mpsc::Sender<DriverEvent<P>>,
}

impl<P: Send> CompletionSink<P> for DriverSink<P> {
    fn deliver(&self, outcome: LoadOutcome<P>) {
        if self.tx.send(DriverEvent::Completed(outcome)).is_err() {
            ps_warn!("Dropping page completion: driver has stopped");
        }
    }
}

struct Shared<P> {
    snapshot: Mutex<DriverSnapshot<P>>,
    changed: Condvar,
}

impl<P> Shared<P> {
    fn publish(&self, snapshot: DriverSnapshot<P>) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
        self.changed.notify_all();
    }
}

/// Runs a [`PageStateMachine`] on its own thread.
///
/// Commands and source completions share one channel, so they are applied
/// in arrival order and observers are always called on the driver thread.
pub struct PageStateDriver<P> {
    tx: mpsc::Sender<DriverEvent<P>>,
    shared: Arc<Shared<P>>,
    thread: Option<JoinHandle<()>>,
}

impl<P> PageStateDriver<P>
where
    P: PagePayload + Clone + Send + 'static,
{
    /// Drives an async source on a runtime owned by the driver.
    pub fn new(
        source: Arc<dyn AsyncPageSource<P>>,
        config: PagingCursorConfig,
        settings: DriverSettings,
    ) -> Result<Self, DriverError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(FETCH_WORKERS)
            .thread_name("pagestate-fetch")
            .enable_time()
            .build()
            .map_err(DriverError::Runtime)?;
        let source: Arc<dyn PageSource<P>> =
            Arc::new(RuntimePageSource::new(source, runtime.handle().clone()));
        Self::spawn(source, config, settings, Some(runtime))
    }

    /// Drives a source that answers through its own means.
    pub fn with_source(
        source: Arc<dyn PageSource<P>>,
        config: PagingCursorConfig,
        settings: DriverSettings,
    ) -> Result<Self, DriverError> {
        Self::spawn(source, config, settings, None)
    }

    fn spawn(
        source: Arc<dyn PageSource<P>>,
        config: PagingCursorConfig,
        settings: DriverSettings,
        runtime: Option<Runtime>,
    ) -> Result<Self, DriverError> {
        let (tx, rx) = mpsc::channel();
        let sink: Arc<dyn CompletionSink<P>> = Arc::new(DriverSink { tx: tx.clone() });
        let machine = PageStateMachine::with_sink(source, config, sink);
        let shared = Arc::new(Shared {
            snapshot: Mutex::new(snapshot_of(&machine)),
            changed: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("pagestate-driver".to_string())
            .spawn(move || run(machine, rx, &thread_shared, settings, runtime))
            .map_err(DriverError::Spawn)?;
        ps_info!(
            "Page state driver started (guard_in_flight: {})",
            settings.guard_in_flight
        );

        Ok(Self {
            tx,
            shared,
            thread: Some(thread),
        })
    }

    pub fn refresh(&self) -> Result<(), DriverError> {
        self.send(DriverEvent::Refresh)
    }

    pub fn start_loading(&self) -> Result<(), DriverError> {
        self.send(DriverEvent::StartLoading)
    }

    pub fn load_more(&self) -> Result<(), DriverError> {
        self.send(DriverEvent::LoadMore)
    }

    pub fn set_no_more(&self, no_more: bool) -> Result<(), DriverError> {
        self.send(DriverEvent::SetNoMore(no_more))
    }

    pub fn open(&self) -> Result<(), DriverError> {
        self.send(DriverEvent::Open)
    }

    pub fn close(&self, error: Option<FetchError>) -> Result<(), DriverError> {
        self.send(DriverEvent::Close(error))
    }

    /// Observers are notified on the driver thread and held weakly.
    pub fn subscribe<O>(&self, observer: &Arc<O>) -> Result<(), DriverError>
    where
        O: PageStateObserver<P> + 'static,
    {
        let weak = Arc::downgrade(observer);
        let weak: WeakObserver<P> = weak;
        self.send(DriverEvent::Subscribe(weak))
    }

    pub fn unsubscribe<O>(&self, observer: &Arc<O>) -> Result<(), DriverError>
    where
        O: PageStateObserver<P> + 'static,
    {
        let weak = Arc::downgrade(observer);
        let weak: WeakObserver<P> = weak;
        self.send(DriverEvent::Unsubscribe(weak))
    }

    /// State as of the last event the driver applied.
    pub fn snapshot(&self) -> DriverSnapshot<P> {
        self.shared
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until `done` accepts a published snapshot, or `timeout` elapses.
    pub fn wait_for<F>(&self, timeout: Duration, mut done: F) -> Option<DriverSnapshot<P>>
    where
        F: FnMut(&DriverSnapshot<P>) -> bool,
    {
        let guard = self
            .shared
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, result) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |snapshot| !done(snapshot))
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() {
            None
        } else {
            Some(guard.clone())
        }
    }

    /// Stops the driver thread and waits for it to exit.
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        let _ = self.tx.send(DriverEvent::Shutdown);
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| DriverError::Panicked),
            None => Ok(()),
        }
    }

    fn send(&self, event: DriverEvent<P>) -> Result<(), DriverError> {
        self.tx.send(event).map_err(|_| DriverError::Stopped)
    }
}

impl<P> Drop for PageStateDriver<P> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.tx.send(DriverEvent::Shutdown);
        }
    }
}

fn snapshot_of<P>(machine: &PageStateMachine<P>) -> DriverSnapshot<P>
where
    P: PagePayload + Clone + Send + 'static,
{
    DriverSnapshot {
        state: machine.state().clone(),
        no_more: machine.is_no_more(),
        current_page: machine.current_page(),
        in_flight: machine.in_flight(),
        open: machine.is_open(),
    }
}

fn run<P>(
    mut machine: PageStateMachine<P>,
    rx: mpsc::Receiver<DriverEvent<P>>,
    shared: &Shared<P>,
    settings: DriverSettings,
    runtime: Option<Runtime>,
) where
    P: PagePayload + Clone + Send + 'static,
{
    while let Ok(event) = rx.recv() {
        match event {
            DriverEvent::Refresh => {
                if admits(&machine, settings, "refresh") {
                    machine.refresh();
                }
            }
            DriverEvent::StartLoading => {
                if admits(&machine, settings, "start_loading") {
                    machine.start_loading();
                }
            }
            DriverEvent::LoadMore => {
                // Without a fetch, load_more only settles on NoMore.
                let fetches = !machine.is_one_time_load() && !machine.is_no_more();
                if !fetches || admits(&machine, settings, "load_more") {
                    machine.load_more();
                }
            }
            DriverEvent::SetNoMore(no_more) => machine.set_no_more(no_more),
            DriverEvent::Open => machine.open(),
            DriverEvent::Close(error) => machine.close(error),
            DriverEvent::Subscribe(observer) => machine.subscribe_weak(observer),
            DriverEvent::Unsubscribe(observer) => {
                machine.unsubscribe_weak(&observer);
            }
            DriverEvent::Completed(outcome) => machine.handle_completion(outcome),
            DriverEvent::Shutdown => break,
        }
        shared.publish(snapshot_of(&machine));
    }

    ps_debug!("Page state driver stopping in state {}", machine.state());
    drop(machine);
    if let Some(runtime) = runtime {
        runtime.shutdown_background();
    }
}

fn admits<P>(machine: &PageStateMachine<P>, settings: DriverSettings, command: &str) -> bool
where
    P: PagePayload + Clone + Send + 'static,
{
    if settings.guard_in_flight && machine.in_flight() > 0 {
        ps_debug!(
            "Dropping {}: {} request(s) still in flight",
            command,
            machine.in_flight()
        );
        return false;
    }
    true
}
