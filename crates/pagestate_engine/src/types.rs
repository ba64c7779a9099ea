use std::io;

use pagestate_core::PageState;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to build the driver runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("failed to spawn the driver thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("page state driver has stopped")]
    Stopped,
    #[error("page state driver thread panicked")]
    Panicked,
}

/// Copy of the machine's observable state, published after every event.
#[derive(Debug, Clone)]
pub struct DriverSnapshot<P> {
    pub state: PageState<P>,
    pub no_more: bool,
    pub current_page: u32,
    pub in_flight: usize,
    pub open: bool,
}

impl<P> Default for DriverSnapshot<P> {
    fn default() -> Self {
        Self {
            state: PageState::Initial,
            no_more: false,
            current_page: 0,
            in_flight: 0,
            open: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverSettings {
    /// Drop load commands while a request is still pending.
    pub guard_in_flight: bool,
}

impl DriverSettings {
    pub fn guarded() -> Self {
        Self {
            guard_in_flight: true,
        }
    }
}
