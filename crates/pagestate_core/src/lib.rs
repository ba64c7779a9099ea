//! Page state core: list pagination state machine, paging cursor worker and observers.
mod config;
mod handlers;
mod machine;
mod observer;
mod state;
mod worker;

pub use config::{PageBase, PagingCursorConfig};
pub use handlers::StateHandlers;
pub use machine::PageStateMachine;
pub use observer::{ObserverRegistry, PageStateObserver, SharedObserver, WeakObserver};
pub use state::{
    fetch_error, is_unreachable, Abandoned, FetchError, Page, PagePayload, PageState,
    PageStateError, PageStateTag, Unreachable,
};
pub use worker::{
    ChannelCompletionSink, CompletionSink, LoadKind, LoadOutcome, PageRequest, PageSource,
    PagingCursorWorker, Reply, WorkerReport,
};
