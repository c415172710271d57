//! Per-store change observers.
//!
//! # Responsibility
//! - Hold the callbacks registered for one store, keyed by subscription id.
//! - Deliver one owned snapshot per observer after each mutation.
//!
//! # Invariants
//! - Callbacks run without any registry or store lock held.
//! - `drop_context` runs exactly once, after the last in-flight delivery to
//!   that observer has returned.

use log::{debug, info, warn};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use toodle_core::Item;

use crate::ctypes::{ItemListC, SubscriptionId};

/// Receives an owned snapshot; the receiver must release it with
/// `toodle_item_list_destroy`. `items` is null when the mutation succeeded
/// but its snapshot could not be read.
pub type ItemsCallback = extern "C" fn(context: *mut c_void, items: *mut ItemListC);

/// Releases an observer context once the store no longer references it.
pub type DropContextCallback = extern "C" fn(context: *mut c_void);

struct Observer {
    id: SubscriptionId,
    callback: ItemsCallback,
    context: *mut c_void,
    drop_context: Option<DropContextCallback>,
}

// The registering side guarantees the context may be used from any thread.
unsafe impl Send for Observer {}
unsafe impl Sync for Observer {}

impl Observer {
    fn deliver(&self, items: Option<&[Item]>) {
        let list = items.map_or(ptr::null_mut(), ItemListC::from_items);
        (self.callback)(self.context, list);
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        if let Some(drop_context) = self.drop_context {
            drop_context(self.context);
        }
        debug!(
            "event=observer_drop module=ffi status=ok subscription={}",
            self.id.0
        );
    }
}

#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<Observer>>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Arc<Observer>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds an observer; ownership of `context` moves to the registry.
    pub fn register(
        &self,
        callback: ItemsCallback,
        context: *mut c_void,
        drop_context: Option<DropContextCallback>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.observers().push(Arc::new(Observer {
            id,
            callback,
            context,
            drop_context,
        }));
        info!("event=observer_register module=ffi status=ok subscription={}", id.0);
        id
    }

    /// Removes one observer; `false` when the id is unknown.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut observers = self.observers();
            observers
                .iter()
                .position(|observer| observer.id == id)
                .map(|index| observers.remove(index))
        };
        // Dropped outside the lock: the last reference runs `drop_context`.
        let removed = removed.is_some();
        info!(
            "event=observer_unregister module=ffi status={} subscription={}",
            if removed { "ok" } else { "unknown" },
            id.0
        );
        removed
    }

    /// Drops every observer, e.g. when the store closes.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.observers());
        drop(drained);
    }

    pub fn len(&self) -> usize {
        self.observers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `items` to every observer registered at call time.
    ///
    /// Returns how many observers were notified.
    pub fn notify(&self, items: &[Item]) -> usize {
        let targets = self.observers().clone();
        for observer in &targets {
            observer.deliver(Some(items));
        }
        debug!(
            "event=observer_notify module=ffi status=ok observers={} items={}",
            targets.len(),
            items.len()
        );
        targets.len()
    }

    /// Tells every observer that a mutation happened whose snapshot could not
    /// be read, by delivering a null list.
    pub fn notify_unavailable(&self) -> usize {
        let targets = self.observers().clone();
        for observer in &targets {
            observer.deliver(None);
        }
        warn!(
            "event=observer_notify module=ffi status=snapshot_unavailable observers={}",
            targets.len()
        );
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::ObserverRegistry;
    use crate::ctypes::ItemListC;
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toodle_core::Item;

    extern "C" fn count_and_release(context: *mut c_void, items: *mut ItemListC) {
        let counter = unsafe { &*(context as *const AtomicUsize) };
        counter.fetch_add(unsafe { (*items).len }, Ordering::SeqCst);
        unsafe { ItemListC::destroy(items) };
    }

    extern "C" fn count_nulls(context: *mut c_void, items: *mut ItemListC) {
        if items.is_null() {
            let counter = unsafe { &*(context as *const AtomicUsize) };
            counter.fetch_add(1, Ordering::SeqCst);
        } else {
            unsafe { ItemListC::destroy(items) };
        }
    }

    extern "C" fn free_counter(context: *mut c_void) {
        drop(unsafe { Box::from_raw(context as *mut AtomicUsize) });
    }

    #[test]
    fn notify_reaches_every_observer_until_unregistered() {
        let registry = ObserverRegistry::new();
        let first = Box::into_raw(Box::new(AtomicUsize::new(0)));
        let second = Box::into_raw(Box::new(AtomicUsize::new(0)));
        let first_id = registry.register(count_and_release, first.cast(), None);
        registry.register(count_and_release, second.cast(), None);

        assert_eq!(registry.notify(&[Item::new("a"), Item::new("b")]), 2);
        assert!(registry.unregister(first_id));
        assert!(!registry.unregister(first_id));
        assert_eq!(registry.notify(&[Item::new("c")]), 1);

        unsafe {
            assert_eq!((*first).load(Ordering::SeqCst), 2);
            assert_eq!((*second).load(Ordering::SeqCst), 3);
        }
        registry.clear();
        assert!(registry.is_empty());
        unsafe {
            drop(Box::from_raw(first));
            drop(Box::from_raw(second));
        }
    }

    #[test]
    fn unreadable_snapshot_still_reaches_every_observer() {
        let registry = ObserverRegistry::new();
        let nulls = Box::into_raw(Box::new(AtomicUsize::new(0)));
        registry.register(count_nulls, nulls.cast(), None);
        registry.register(count_nulls, nulls.cast(), None);

        assert_eq!(registry.notify_unavailable(), 2);
        assert_eq!(registry.notify(&[Item::new("a")]), 2);
        unsafe { assert_eq!((*nulls).load(Ordering::SeqCst), 2) };

        registry.clear();
        unsafe { drop(Box::from_raw(nulls)) };
    }

    #[test]
    fn clear_releases_contexts() {
        let registry = ObserverRegistry::new();
        let context = Box::into_raw(Box::new(AtomicUsize::new(0)));
        registry.register(count_and_release, context.cast(), Some(free_counter));
        assert_eq!(registry.len(), 1);
        registry.clear();
        assert!(registry.is_empty());
    }
}
