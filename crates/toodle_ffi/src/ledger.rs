//! Registry of heap allocations handed to the managed side.
//!
//! Every pointer returned across the boundary is recorded here and removed
//! on release.
//!
//! # Invariants
//! - Releasing a pointer twice is forbidden. The ledger only tracks
//!   addresses, so once the allocator hands the same address out again a
//!   stale release is indistinguishable from a valid one. A release the
//!   ledger does not recognize is a caller bug: it is logged, refused, and
//!   fails a debug assertion.

use log::error;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Allocation {
    Item,
    ItemList,
    Label,
    LabelList,
}

impl Allocation {
    fn name(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::ItemList => "item_list",
            Self::Label => "label",
            Self::LabelList => "label_list",
        }
    }
}

static LIVE: Lazy<Mutex<HashSet<(Allocation, usize)>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn live() -> std::sync::MutexGuard<'static, HashSet<(Allocation, usize)>> {
    LIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Records `ptr` as issued and returns it unchanged.
pub(crate) fn issue<T>(kind: Allocation, ptr: *mut T) -> *mut T {
    if !ptr.is_null() {
        live().insert((kind, ptr as usize));
    }
    ptr
}

/// Removes `ptr` from the ledger; `false` means the caller must not free it.
pub(crate) fn retire<T>(kind: Allocation, ptr: *mut T) -> bool {
    if ptr.is_null() {
        return false;
    }
    let known = live().remove(&(kind, ptr as usize));
    if !known {
        error!(
            "event=release module=ffi status=rejected kind={} reason=unknown_or_released",
            kind.name()
        );
        debug_assert!(false, "release of unknown or already released {}", kind.name());
    }
    known
}

/// Outstanding allocations of `kind`.
pub(crate) fn live_count(kind: Allocation) -> usize {
    live().iter().filter(|(live_kind, _)| *live_kind == kind).count()
}
