//! Change subscriptions.
//!
//! # Responsibility
//! - Hand a boxed Rust closure to the native observer registry.
//! - Turn each native snapshot into owned items and release it before the
//!   closure runs.
//!
//! # Invariants
//! - The boxed closure is freed exactly once: by the native registry when
//!   registration succeeded, by this module when it failed.
//! - A panic in the closure never unwinds into native code.

use log::{debug, error};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

use toodle_core::Item;
use toodle_ffi::{
    toodle_register_observer, toodle_unregister_observer, ItemListC, StoreHandle, SubscriptionId,
};

use crate::collection::ItemCollection;
use crate::envelope::ResultEnvelope;
use crate::error::{ClientError, ClientResult};
use crate::handle::Handle;

/// Receives one snapshot per successful mutation, on the mutating thread.
///
/// `Err(ClientError::SnapshotUnavailable)` stands in for a snapshot the
/// store could not read; the mutation itself went through.
pub type ChangeCallback = Box<dyn Fn(ClientResult<Vec<Item>>) + Send + Sync + 'static>;

pub struct ChangeNotifier;

impl ChangeNotifier {
    /// Subscribes `callback` to every successful create and update on the
    /// store behind `handle`.
    ///
    /// The callback runs synchronously inside the mutating call, after the
    /// store lock is released. Hand work off to another thread rather than
    /// blocking there.
    pub fn register<F>(handle: &Handle, callback: F) -> ClientResult<Subscription>
    where
        F: Fn(ClientResult<Vec<Item>>) + Send + Sync + 'static,
    {
        let store = handle.id()?;
        let boxed: Box<ChangeCallback> = Box::new(Box::new(callback));
        let context = Box::into_raw(boxed) as *mut c_void;
        let envelope = ResultEnvelope::new(unsafe {
            toodle_register_observer(store, Some(deliver), context, Some(release_context))
        });
        match envelope.into_result() {
            Ok(id) => {
                debug!(
                    "event=subscribe module=client status=ok handle={} subscription={}",
                    store.0, id.0
                );
                Ok(Subscription {
                    store,
                    id: Some(id),
                })
            }
            Err(err) => {
                release_context(context);
                Err(err)
            }
        }
    }
}

/// Live registration; dropping it unregisters.
#[derive(Debug)]
pub struct Subscription {
    store: StoreHandle,
    id: Option<SubscriptionId>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Stops delivery. Returns `false` when already unregistered or when
    /// the store was closed first, which ends every subscription.
    pub fn unregister(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        let removed = toodle_unregister_observer(self.store, id);
        debug!(
            "event=unsubscribe module=client status={} handle={} subscription={}",
            if removed { "ok" } else { "already_gone" },
            self.store.0,
            id.0
        );
        removed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

extern "C" fn deliver(context: *mut c_void, items: *mut ItemListC) {
    let callback = unsafe { &*(context as *const ChangeCallback) };
    let snapshot = if items.is_null() {
        Err(ClientError::SnapshotUnavailable)
    } else {
        unsafe { ItemCollection::from_raw(items) }.and_then(ItemCollection::into_items)
    };
    if catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
        error!("event=observer_deliver module=client status=error reason=callback_panicked");
    }
}

extern "C" fn release_context(context: *mut c_void) {
    drop(unsafe { Box::from_raw(context as *mut ChangeCallback) });
}
