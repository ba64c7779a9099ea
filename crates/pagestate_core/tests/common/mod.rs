#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use pagestate_core::{
    Page, PageRequest, PageSource, PageState, PageStateMachine, PageStateObserver, PageStateTag,
    PagingCursorConfig, Reply, Unreachable,
};

pub type TestPage = Page<u32>;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pagestate_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("test error {code}")]
pub struct TestError {
    pub code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed { has_more: bool, empty: bool },
    Fail,
    FailUnreachable,
    /// Keeps the reply so the test can answer it later.
    Hold,
    /// Drops the reply without answering.
    Drop,
}

/// Source that answers synchronously according to its current behaviour.
pub struct StubSource {
    behaviour: Mutex<Behaviour>,
    requests: Mutex<Vec<PageRequest>>,
    held: Mutex<Vec<Reply<TestPage>>>,
}

impl StubSource {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Mutex::new(behaviour),
            requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(Behaviour::Succeed {
            has_more: true,
            empty: false,
        })
    }

    pub fn set(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn take_held(&self) -> Vec<Reply<TestPage>> {
        self.held.lock().unwrap().drain(..).collect()
    }
}

pub fn page(has_more: bool, empty: bool, first_item: u32) -> TestPage {
    let items = if empty {
        Vec::new()
    } else {
        vec![first_item, first_item + 1]
    };
    Page::new(items, has_more)
}

impl PageSource<TestPage> for StubSource {
    fn request(&self, request: PageRequest, reply: Reply<TestPage>) {
        self.requests.lock().unwrap().push(request);
        let behaviour = *self.behaviour.lock().unwrap();
        match behaviour {
            Behaviour::Succeed { has_more, empty } => {
                reply.succeed(page(has_more, empty, request.page * 10))
            }
            Behaviour::Fail => reply.fail(TestError { code: 0 }),
            Behaviour::FailUnreachable => reply.fail(Unreachable),
            Behaviour::Hold => self.held.lock().unwrap().push(reply),
            Behaviour::Drop => drop(reply),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Will,
    Did,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seen {
    pub phase: Phase,
    pub new: PageStateTag,
    pub old: PageStateTag,
}

pub fn will(new: PageStateTag, old: PageStateTag) -> Seen {
    Seen {
        phase: Phase::Will,
        new,
        old,
    }
}

pub fn did(new: PageStateTag, old: PageStateTag) -> Seen {
    Seen {
        phase: Phase::Did,
        new,
        old,
    }
}

/// Records every notification it receives, plus the last states passed in full.
#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<Seen>>,
    last_did: Mutex<Option<PageState<TestPage>>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last_did(&self) -> Option<PageState<TestPage>> {
        self.last_did.lock().unwrap().clone()
    }
}

impl PageStateObserver<TestPage> for RecordingObserver {
    fn on_will_switch(&self, new: &PageState<TestPage>, old: &PageState<TestPage>) {
        self.seen.lock().unwrap().push(will(new.tag(), old.tag()));
    }

    fn on_did_switch(&self, new: &PageState<TestPage>, old: &PageState<TestPage>) {
        self.seen.lock().unwrap().push(did(new.tag(), old.tag()));
        *self.last_did.lock().unwrap() = Some(new.clone());
    }
}

pub fn machine_with(
    source: &Arc<StubSource>,
    config: PagingCursorConfig,
) -> PageStateMachine<TestPage> {
    let source: Arc<dyn PageSource<TestPage>> = source.clone();
    PageStateMachine::new(source, config)
}
