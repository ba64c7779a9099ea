#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::thread;

use pagestate_core::{
    fetch_error, FetchError, Page, PageRequest, PageSource, PageState, PageStateObserver,
    PageStateTag, Reply, Unreachable,
};
use pagestate_engine::AsyncPageSource;

pub type TestPage = Page<u32>;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pagestate_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("flaky source failure")]
pub struct Flaky;

/// Async source with `last_page + 1` single-item pages that fails its first
/// `failures` calls.
pub struct FlakySource {
    calls: AtomicUsize,
    failures: usize,
    unreachable: bool,
    last_page: u32,
}

impl FlakySource {
    pub fn new(last_page: u32) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures: 0,
            unreachable: false,
            last_page,
        }
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::new(5)
        }
    }

    pub fn unreachable(failures: usize) -> Self {
        Self {
            unreachable: true,
            ..Self::failing(failures)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, page: u32) -> Result<TestPage, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(if self.unreachable {
                fetch_error(Unreachable)
            } else {
                fetch_error(Flaky)
            });
        }
        Ok(Page::new(vec![page], page < self.last_page))
    }
}

#[async_trait::async_trait]
impl AsyncPageSource<TestPage> for FlakySource {
    async fn first_page(&self, page: u32) -> Result<TestPage, FetchError> {
        self.answer(page)
    }

    async fn next_page(&self, page: u32) -> Result<TestPage, FetchError> {
        self.answer(page)
    }
}

/// Source that keeps every reply until the test answers it.
#[derive(Default)]
pub struct HoldingSource {
    held: Mutex<Vec<Reply<TestPage>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl HoldingSource {
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn take_held(&self) -> Vec<Reply<TestPage>> {
        self.held.lock().unwrap().drain(..).collect()
    }
}

impl PageSource<TestPage> for HoldingSource {
    fn request(&self, request: PageRequest, reply: Reply<TestPage>) {
        self.requests.lock().unwrap().push(request);
        self.held.lock().unwrap().push(reply);
    }
}

/// Source that drops every reply without answering it.
#[derive(Default)]
pub struct DroppingSource {
    calls: AtomicUsize,
}

impl DroppingSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageSource<TestPage> for DroppingSource {
    fn request(&self, _request: PageRequest, reply: Reply<TestPage>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        drop(reply);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub old: PageStateTag,
    pub new: PageStateTag,
    pub thread: Option<String>,
}

/// Records did-switch notifications with the thread they ran on.
#[derive(Default)]
pub struct ThreadRecorder {
    switches: Mutex<Vec<Switch>>,
}

impl ThreadRecorder {
    pub fn switches(&self) -> Vec<Switch> {
        self.switches.lock().unwrap().clone()
    }
}

impl PageStateObserver<TestPage> for ThreadRecorder {
    fn on_will_switch(&self, _new: &PageState<TestPage>, _old: &PageState<TestPage>) {}

    fn on_did_switch(&self, new: &PageState<TestPage>, old: &PageState<TestPage>) {
        self.switches.lock().unwrap().push(Switch {
            old: old.tag(),
            new: new.tag(),
            thread: thread::current().name().map(str::to_string),
        });
    }
}
