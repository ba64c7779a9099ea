use std::sync::{Mutex, PoisonError};

use pagestate_core::{Page, PageState, PageStateObserver};
use pagestate_logging::{ps_info, ps_warn};

/// Accumulates list rows the way a list view would: a first page replaces
/// the rows, a later page is appended.
#[derive(Default)]
pub(crate) struct ListCollector {
    rows: Mutex<Vec<u32>>,
}

impl ListCollector {
    pub fn rows(&self) -> Vec<u32> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PageStateObserver<Page<u32>> for ListCollector {
    fn on_will_switch(&self, new: &PageState<Page<u32>>, old: &PageState<Page<u32>>) {
        ps_info!("List state {} -> {}", old, new);
    }

    fn on_did_switch(&self, new: &PageState<Page<u32>>, old: &PageState<Page<u32>>) {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        match new {
            PageState::Finish(page) if matches!(old, PageState::LoadingMore) => {
                rows.extend_from_slice(&page.items);
            }
            PageState::Finish(page) => {
                rows.clear();
                rows.extend_from_slice(&page.items);
            }
            PageState::Empty => rows.clear(),
            PageState::Error(err) => ps_warn!("List load failed: {}", err),
            _ => {}
        }
    }
}
