use std::sync::{Arc, Weak};

use crate::PageState;

/// Receives the will/did pair around every effective transition.
pub trait PageStateObserver<P>: Send + Sync {
    fn on_will_switch(&self, new: &PageState<P>, old: &PageState<P>);
    fn on_did_switch(&self, new: &PageState<P>, old: &PageState<P>);
}

pub type SharedObserver<P> = Arc<dyn PageStateObserver<P>>;
pub type WeakObserver<P> = Weak<dyn PageStateObserver<P>>;

/// Subscription list holding observers without owning them.
///
/// Dropped observers are skipped on dispatch and compacted away later.
pub struct ObserverRegistry<P> {
    observers: Vec<WeakObserver<P>>,
}

impl<P> Default for ObserverRegistry<P> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<P: 'static> ObserverRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a weak handle. Subscribing the same observer twice doubles its notifications.
    pub fn subscribe<O>(&mut self, observer: &Arc<O>)
    where
        O: PageStateObserver<P> + 'static,
    {
        let weak = Arc::downgrade(observer);
        let weak: WeakObserver<P> = weak;
        self.observers.push(weak);
    }

    pub fn subscribe_weak(&mut self, observer: WeakObserver<P>) {
        self.observers.push(observer);
    }

    /// Removes the first subscription of `observer`, then drops dead entries.
    pub fn unsubscribe<O>(&mut self, observer: &Arc<O>) -> bool
    where
        O: ?Sized,
    {
        self.remove_first(Arc::as_ptr(observer) as *const ())
    }

    pub fn unsubscribe_weak(&mut self, observer: &WeakObserver<P>) -> bool {
        self.remove_first(Weak::as_ptr(observer) as *const ())
    }

    /// Live observers in subscription order.
    ///
    /// Dispatch goes through this snapshot, so the list itself is never
    /// mutated while observers run.
    pub fn snapshot(&self) -> Vec<SharedObserver<P>> {
        self.observers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Drops handles whose observer is gone. Returns how many were removed.
    pub fn compact(&mut self) -> usize {
        let before = self.observers.len();
        self.observers.retain(|weak| weak.strong_count() > 0);
        before - self.observers.len()
    }

    /// Number of subscriptions whose observer is still alive.
    pub fn len(&self) -> usize {
        self.observers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_first(&mut self, target: *const ()) -> bool {
        let position = self
            .observers
            .iter()
            .position(|weak| std::ptr::addr_eq(Weak::as_ptr(weak), target));
        let removed = match position {
            Some(index) => {
                self.observers.remove(index);
                true
            }
            None => false,
        };
        self.compact();
        removed
    }
}
