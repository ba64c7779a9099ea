mod common;

use std::sync::{Arc, Mutex};

use common::{
    init_logging, machine_with, Behaviour, RecordingObserver, StubSource, TestError, TestPage,
};
use pagestate_core::{
    fetch_error, PageStateError, PageStateTag, PagingCursorConfig, StateHandlers, Unreachable,
};
use pretty_assertions::assert_eq;

#[test]
fn closed_gate_ignores_commands() {
    init_logging();
    let source = StubSource::succeeding();
    let mut machine = machine_with(&source, PagingCursorConfig::default());
    let observer = RecordingObserver::new();
    machine.subscribe(&observer);

    machine.close(None);
    machine.refresh();
    machine.start_loading();
    machine.load_more();

    assert!(!machine.is_open());
    assert_eq!(machine.state().tag(), PageStateTag::Initial);
    assert_eq!(source.call_count(), 0);
    assert!(observer.seen().is_empty());

    machine.open();
    machine.refresh();
    assert_eq!(machine.state().tag(), PageStateTag::Loading);
    assert_eq!(source.call_count(), 1);
}

#[test]
fn close_with_error_forces_error_state() {
    init_logging();
    let source = StubSource::succeeding();
    let mut machine = machine_with(&source, PagingCursorConfig::default());

    machine.close(Some(fetch_error(TestError { code: 3 })));

    assert_eq!(machine.state().tag(), PageStateTag::Error);
    let cause = machine
        .current_error()
        .and_then(PageStateError::cause)
        .expect("wrapped cause");
    assert_eq!(cause.downcast_ref::<TestError>(), Some(&TestError { code: 3 }));

    machine.load_more();
    assert_eq!(machine.state().tag(), PageStateTag::Error);
}

#[test]
fn close_with_error_on_closed_gate_still_forces_error() {
    init_logging();
    let source = StubSource::succeeding();
    let mut machine = machine_with(&source, PagingCursorConfig::default());
    let observer = RecordingObserver::new();
    machine.subscribe(&observer);

    machine.close(None);
    machine.close(Some(fetch_error(TestError { code: 9 })));

    assert!(!machine.is_open());
    assert_eq!(machine.state().tag(), PageStateTag::Error);
    assert_eq!(observer.seen().len(), 2);
    let cause = machine
        .current_error()
        .and_then(PageStateError::cause)
        .expect("wrapped cause");
    assert_eq!(cause.downcast_ref::<TestError>(), Some(&TestError { code: 9 }));
}

#[test]
fn close_with_unreachable_error_reports_no_network() {
    init_logging();
    let source = StubSource::succeeding();
    let mut machine = machine_with(&source, PagingCursorConfig::default());

    machine.close(Some(fetch_error(Unreachable)));

    assert!(matches!(
        machine.current_error(),
        Some(PageStateError::NoNetwork)
    ));
}

#[test]
fn completions_while_closed_move_cursor_only() {
    init_logging();
    let source = StubSource::new(Behaviour::Succeed {
        has_more: false,
        empty: false,
    });
    let mut machine = machine_with(&source, PagingCursorConfig::default());

    machine.load_more();
    machine.close(None);
    machine.process_completions();

    assert_eq!(machine.state().tag(), PageStateTag::LoadingMore);
    assert_eq!(machine.current_page(), 1);
    assert!(!machine.is_no_more());
}

#[test]
fn handlers_fire_for_their_target_state() {
    init_logging();
    let source = StubSource::succeeding();
    let mut machine = machine_with(&source, PagingCursorConfig::default());
    let handlers = Arc::new(StateHandlers::<TestPage>::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let will_log = log.clone();
    handlers.apply_any_will_switch(move |state| {
        will_log.lock().unwrap().push(format!("any-will {state}"));
    });
    let did_log = log.clone();
    handlers.apply_any_did_switch(move |state| {
        did_log.lock().unwrap().push(format!("any-did {state}"));
    });
    let finish_log = log.clone();
    handlers.apply(PageStateTag::Finish, move |state| {
        let items = state.payload().map(|page| page.items.len()).unwrap_or(0);
        finish_log
            .lock()
            .unwrap()
            .push(format!("finish with {items} items"));
    });
    machine.subscribe(&handlers);

    machine.start_loading();
    machine.process_completions();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "any-will initialLoading",
            "any-did initialLoading",
            "any-will finish",
            "any-did finish",
            "finish with 2 items",
        ]
    );
}

#[test]
fn registering_again_replaces_handler() {
    init_logging();
    let source = StubSource::new(Behaviour::Fail);
    let mut machine = machine_with(&source, PagingCursorConfig::default());
    let handlers = Arc::new(StateHandlers::<TestPage>::new());
    let hits = Arc::new(Mutex::new(Vec::new()));

    let first = hits.clone();
    handlers.apply(PageStateTag::Error, move |_| first.lock().unwrap().push("first"));
    let second = hits.clone();
    handlers.apply(PageStateTag::Error, move |_| second.lock().unwrap().push("second"));
    machine.subscribe(&handlers);

    machine.start_loading();
    machine.process_completions();
    assert_eq!(*hits.lock().unwrap(), vec!["second"]);

    assert!(handlers.remove(PageStateTag::Error));
    assert!(!handlers.remove(PageStateTag::Error));
    machine.refresh();
    machine.process_completions();
    assert_eq!(*hits.lock().unwrap(), vec!["second"]);
}

#[test]
fn handler_may_register_another_handler() {
    init_logging();
    let source = StubSource::succeeding();
    let mut machine = machine_with(&source, PagingCursorConfig::default());
    let handlers = Arc::new(StateHandlers::<TestPage>::new());
    let hits = Arc::new(Mutex::new(0));

    let inner = Arc::downgrade(&handlers);
    let counter = hits.clone();
    handlers.apply(PageStateTag::InitialLoading, move |_| {
        if let Some(handlers) = inner.upgrade() {
            let counter = counter.clone();
            handlers.apply(PageStateTag::Finish, move |_| *counter.lock().unwrap() += 1);
        }
    });
    machine.subscribe(&handlers);

    machine.start_loading();
    machine.process_completions();

    assert_eq!(*hits.lock().unwrap(), 1);
}
