use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{PageState, PageStateObserver, PageStateTag};

type Handler<P> = Arc<dyn Fn(&PageState<P>) + Send + Sync>;

struct HandlerTable<P> {
    per_state: HashMap<PageStateTag, Handler<P>>,
    any_will_switch: Option<Handler<P>>,
    any_did_switch: Option<Handler<P>>,
}

/// Observer that routes transitions to closures registered per target state.
///
/// Holds at most one handler per [`PageStateTag`]; registering again replaces
/// the previous one. Per-state handlers run on did-switch, after the generic
/// any-did-switch handler.
pub struct StateHandlers<P> {
    table: Mutex<HandlerTable<P>>,
}

impl<P> Default for StateHandlers<P> {
    fn default() -> Self {
        Self {
            table: Mutex::new(HandlerTable {
                per_state: HashMap::new(),
                any_will_switch: None,
                any_did_switch: None,
            }),
        }
    }
}

impl<P> StateHandlers<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<F>(&self, tag: PageStateTag, handler: F)
    where
        F: Fn(&PageState<P>) + Send + Sync + 'static,
    {
        self.lock().per_state.insert(tag, Arc::new(handler));
    }

    pub fn apply_any_will_switch<F>(&self, handler: F)
    where
        F: Fn(&PageState<P>) + Send + Sync + 'static,
    {
        self.lock().any_will_switch = Some(Arc::new(handler));
    }

    pub fn apply_any_did_switch<F>(&self, handler: F)
    where
        F: Fn(&PageState<P>) + Send + Sync + 'static,
    {
        self.lock().any_did_switch = Some(Arc::new(handler));
    }

    pub fn remove(&self, tag: PageStateTag) -> bool {
        self.lock().per_state.remove(&tag).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HandlerTable<P>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> PageStateObserver<P> for StateHandlers<P> {
    fn on_will_switch(&self, new: &PageState<P>, _old: &PageState<P>) {
        // Handlers run outside the lock so they may register further handlers.
        let handler = self.lock().any_will_switch.clone();
        if let Some(handler) = handler {
            handler(new);
        }
    }

    fn on_did_switch(&self, new: &PageState<P>, _old: &PageState<P>) {
        let (any, specific) = {
            let table = self.lock();
            (
                table.any_did_switch.clone(),
                table.per_state.get(&new.tag()).cloned(),
            )
        };
        if let Some(handler) = any {
            handler(new);
        }
        if let Some(handler) = specific {
            handler(new);
        }
    }
}
