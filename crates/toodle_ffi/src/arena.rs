//! Process-wide arena of open stores.
//!
//! The managed side only ever holds a `StoreHandle` id. The arena owns the
//! `Toodle` behind it, so a stale or forged id resolves to a `store_closed`
//! error instead of a dangling pointer.
//!
//! # Invariants
//! - Ids are never reused within a process.
//! - A closed slot never yields its store again, even to callers that looked
//!   it up before the close.
//! - Calls on one store are serialized by the slot's mutex.
//! - Mutations of one store take turns on a second, delivery mutex, held
//!   from before the store lock until every observer has its snapshot.
//!   Observers therefore see snapshots in mutation order, and reads stay
//!   possible from inside a callback.

use log::{info, warn};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ctypes::StoreHandle;
use crate::error::{FfiError, FfiResult};
use crate::observers::ObserverRegistry;
use crate::store::Toodle;

pub(crate) static ARENA: Lazy<StoreArena> = Lazy::new(StoreArena::new);

thread_local! {
    /// Stores whose delivery turn the current thread holds.
    static DELIVERING: RefCell<Vec<StoreHandle>> = RefCell::new(Vec::new());
}

pub(crate) struct StoreSlot {
    handle: StoreHandle,
    store: Mutex<Option<Toodle>>,
    delivery: Mutex<()>,
    pub(crate) observers: ObserverRegistry,
}

/// Exclusive right to mutate a store and deliver the resulting snapshot.
pub(crate) struct DeliveryTurn<'slot> {
    handle: StoreHandle,
    _guard: MutexGuard<'slot, ()>,
}

impl Drop for DeliveryTurn<'_> {
    fn drop(&mut self) {
        DELIVERING.with(|delivering| {
            let mut delivering = delivering.borrow_mut();
            if let Some(index) = delivering.iter().rposition(|handle| *handle == self.handle) {
                delivering.remove(index);
            }
        });
    }
}

impl StoreSlot {
    /// Waits for this store's delivery turn.
    ///
    /// A thread already holding the turn (a callback mutating the store that
    /// is notifying it) gets `ReentrantMutation` instead of a deadlock.
    pub(crate) fn delivery_turn(&self) -> FfiResult<DeliveryTurn<'_>> {
        let reentrant =
            DELIVERING.with(|delivering| delivering.borrow().contains(&self.handle));
        if reentrant {
            return Err(FfiError::ReentrantMutation(self.handle));
        }
        let guard = self
            .delivery
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        DELIVERING.with(|delivering| delivering.borrow_mut().push(self.handle));
        Ok(DeliveryTurn {
            handle: self.handle,
            _guard: guard,
        })
    }

    /// Runs `f` with exclusive access to the open store.
    pub(crate) fn with_store<T>(&self, f: impl FnOnce(&Toodle) -> FfiResult<T>) -> FfiResult<T> {
        let guard = self
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(store) => f(store),
            None => Err(FfiError::StoreClosed(self.handle)),
        }
    }

    fn close(&self) {
        let store = self
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(store);
        self.observers.clear();
    }
}

pub(crate) struct StoreArena {
    slots: Mutex<HashMap<StoreHandle, Arc<StoreSlot>>>,
    next_id: AtomicU64,
}

impl StoreArena {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<StoreHandle, Arc<StoreSlot>>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn insert(&self, store: Toodle) -> StoreHandle {
        let handle = StoreHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        let slot = Arc::new(StoreSlot {
            handle,
            store: Mutex::new(Some(store)),
            delivery: Mutex::new(()),
            observers: ObserverRegistry::new(),
        });
        self.slots().insert(handle, slot);
        info!("event=store_handle module=ffi status=open handle={}", handle.0);
        handle
    }

    pub(crate) fn get(&self, handle: StoreHandle) -> FfiResult<Arc<StoreSlot>> {
        self.slots()
            .get(&handle)
            .cloned()
            .ok_or(FfiError::StoreClosed(handle))
    }

    /// Closes and forgets `handle`; `false` when it was not open.
    pub(crate) fn remove(&self, handle: StoreHandle) -> bool {
        let slot = self.slots().remove(&handle);
        match slot {
            Some(slot) => {
                slot.close();
                info!("event=store_handle module=ffi status=closed handle={}", handle.0);
                true
            }
            None => {
                warn!(
                    "event=store_handle module=ffi status=ignored handle={} reason=not_open",
                    handle.0
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StoreArena;
    use crate::error::FfiError;
    use crate::store::Toodle;

    #[test]
    fn closed_handles_resolve_to_store_closed() {
        let arena = StoreArena::new();
        let handle = arena.insert(Toodle::open(":memory:").unwrap());
        let slot = arena.get(handle).unwrap();

        assert!(arena.remove(handle));
        assert!(!arena.remove(handle));

        assert!(matches!(arena.get(handle), Err(FfiError::StoreClosed(h)) if h == handle));
        // A slot looked up before the close must not hand out the store.
        let err = slot.with_store(|store| store.items()).unwrap_err();
        assert!(matches!(err, FfiError::StoreClosed(_)));
    }

    #[test]
    fn delivery_turn_is_not_reentrant_on_one_thread() {
        let arena = StoreArena::new();
        let first = arena.get(arena.insert(Toodle::open(":memory:").unwrap())).unwrap();
        let second = arena.get(arena.insert(Toodle::open(":memory:").unwrap())).unwrap();

        let turn = first.delivery_turn().unwrap();
        assert!(matches!(
            first.delivery_turn(),
            Err(FfiError::ReentrantMutation(_))
        ));
        // Another store is independent.
        drop(second.delivery_turn().unwrap());
        drop(turn);
        assert!(first.delivery_turn().is_ok());
    }

    #[test]
    fn handles_are_unique() {
        let arena = StoreArena::new();
        let first = arena.insert(Toodle::open(":memory:").unwrap());
        let second = arena.insert(Toodle::open(":memory:").unwrap());
        assert_ne!(first, second);
        assert_ne!(first.0, 0);
    }
}
