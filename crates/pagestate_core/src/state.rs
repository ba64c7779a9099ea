use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque failure reported by a page source. Passed through the worker untouched.
pub type FetchError = Arc<dyn Error + Send + Sync + 'static>;

/// Wraps any error into a [`FetchError`].
pub fn fetch_error<E>(err: E) -> FetchError
where
    E: Error + Send + Sync + 'static,
{
    Arc::new(err)
}

/// Marker error a source reports when the network is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("network unreachable")]
pub struct Unreachable;

/// Completion of a request whose [`Reply`](crate::Reply) was dropped unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("page request abandoned by its source")]
pub struct Abandoned;

/// Returns true when `err` signals a reachability failure rather than a generic one.
pub fn is_unreachable(err: &FetchError) -> bool {
    err.is::<Unreachable>()
        || matches!(
            err.downcast_ref::<PageStateError>(),
            Some(PageStateError::NoNetwork)
        )
}

/// Cause carried by [`PageState::Error`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum PageStateError {
    #[error("page fetch failed: {0}")]
    Wrapper(#[source] FetchError),
    #[error("no network connection")]
    NoNetwork,
}

impl PageStateError {
    /// Picks the error variant for a raw source failure.
    pub fn classify(err: FetchError) -> Self {
        if is_unreachable(&err) {
            Self::NoNetwork
        } else {
            Self::Wrapper(err)
        }
    }

    /// The wrapped source error, if any.
    pub fn cause(&self) -> Option<&FetchError> {
        match self {
            Self::Wrapper(err) => Some(err),
            Self::NoNetwork => None,
        }
    }
}

/// The two questions the machine asks of a loaded page.
pub trait PagePayload {
    fn has_more(&self) -> bool;
    fn is_empty(&self) -> bool;
}

/// A page of list items together with the source's "more available" signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// A page with no items and nothing after it.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }
}

impl<T> PagePayload for Page<T> {
    fn has_more(&self) -> bool {
        self.has_more
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Discriminant of a [`PageState`], ignoring payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStateTag {
    Initial,
    InitialLoading,
    LoadingMore,
    Loading,
    Empty,
    Finish,
    NoMore,
    Error,
}

impl PageStateTag {
    pub const ALL: [PageStateTag; 8] = [
        PageStateTag::Initial,
        PageStateTag::InitialLoading,
        PageStateTag::LoadingMore,
        PageStateTag::Loading,
        PageStateTag::Empty,
        PageStateTag::Finish,
        PageStateTag::NoMore,
        PageStateTag::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageStateTag::Initial => "initial",
            PageStateTag::InitialLoading => "initialLoading",
            PageStateTag::LoadingMore => "loadingMore",
            PageStateTag::Loading => "loading",
            PageStateTag::Empty => "empty",
            PageStateTag::Finish => "finish",
            PageStateTag::NoMore => "noMore",
            PageStateTag::Error => "error",
        }
    }
}

impl fmt::Display for PageStateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a paged list.
///
/// Equality compares tags only: two `Finish` states are equal whatever pages
/// they carry, and so are two `Error` states. The machine relies on this to
/// drop repeated transitions.
#[derive(Debug, Clone)]
pub enum PageState<P> {
    Initial,
    InitialLoading,
    LoadingMore,
    /// Pull-to-refresh in progress.
    Loading,
    Empty,
    Finish(P),
    NoMore,
    Error(PageStateError),
}

impl<P> PageState<P> {
    pub fn tag(&self) -> PageStateTag {
        match self {
            PageState::Initial => PageStateTag::Initial,
            PageState::InitialLoading => PageStateTag::InitialLoading,
            PageState::LoadingMore => PageStateTag::LoadingMore,
            PageState::Loading => PageStateTag::Loading,
            PageState::Empty => PageStateTag::Empty,
            PageState::Finish(_) => PageStateTag::Finish,
            PageState::NoMore => PageStateTag::NoMore,
            PageState::Error(_) => PageStateTag::Error,
        }
    }

    pub fn error(&self) -> Option<&PageStateError> {
        match self {
            PageState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            PageState::Finish(payload) => Some(payload),
            _ => None,
        }
    }

    /// True for the three states that wait on a fetch.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            PageState::InitialLoading | PageState::LoadingMore | PageState::Loading
        )
    }
}

impl<P> Default for PageState<P> {
    fn default() -> Self {
        PageState::Initial
    }
}

impl<P> PartialEq for PageState<P> {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }
}

impl<P> Eq for PageState<P> {}

impl<P> PartialEq<PageStateTag> for PageState<P> {
    fn eq(&self, other: &PageStateTag) -> bool {
        self.tag() == *other
    }
}

impl<P> fmt::Display for PageState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tag(), f)
    }
}
