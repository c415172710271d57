//! `extern "C"` entry points.
//!
//! # FFI contract
//! - Every call is synchronous and returns after the store work is done.
//! - Fallible calls return a `ResultC` (or an error string, null on
//!   success); panics are caught and reported as `panic` errors.
//! - Pointers returned to the caller are owned by the caller until passed
//!   to the matching `*_destroy` function, exactly once.
//! - Store handles are ids; using a closed handle yields `store_closed`.
//! - Change observers run on the thread that performed the mutation, after
//!   the store lock is released and before the mutating call returns.
//!   Deliveries for one store never overlap and follow mutation order.
//!   An observer may read its store but must not mutate it; doing so fails
//!   with `reentrant_mutation`.

use log::{error, warn};
use std::ffi::{c_char, c_void, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::time::Instant;

use toodle_core::{default_log_level, init_logging, DateUpdate, Item, ItemId, ItemUpdate};

use crate::arena::{StoreSlot, ARENA};
use crate::ctypes::{
    c_char_to_string, live_item_records, optional_c_char_to_string, optional_date,
    string_to_c_char, ItemC, ItemListC, LabelC, LabelListC, NullableValue, ResultC, StoreHandle,
    SubscriptionId,
};
use crate::error::{FfiError, FfiResult};
use crate::ledger::{self, Allocation};
use crate::observers::{DropContextCallback, ItemsCallback};
use crate::store::Toodle;

/// `toodle_update_item` flag: clear the due date when `due_date` is null.
pub const TOODLE_CLEAR_DUE_DATE: u32 = 1;
/// `toodle_update_item` flag: clear the completion date when
/// `completion_date` is null.
pub const TOODLE_CLEAR_COMPLETION_DATE: u32 = 1 << 1;

const KNOWN_UPDATE_FLAGS: u32 = TOODLE_CLEAR_DUE_DATE | TOODLE_CLEAR_COMPLETION_DATE;

fn guarded<T: NullableValue>(entry: &'static str, f: impl FnOnce() -> FfiResult<T>) -> ResultC<T> {
    ResultC::from_result(run_guarded(entry, f))
}

fn guarded_status(entry: &'static str, f: impl FnOnce() -> FfiResult<()>) -> *mut c_char {
    match run_guarded(entry, f) {
        Ok(()) => std::ptr::null_mut(),
        Err(err) => string_to_c_char(err.to_wire()),
    }
}

fn run_guarded<T>(entry: &'static str, f: impl FnOnce() -> FfiResult<T>) -> FfiResult<T> {
    let started_at = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(f)).unwrap_or(Err(FfiError::Panicked(entry)));
    if let Err(err) = &result {
        let duration_ms = started_at.elapsed().as_millis();
        match err {
            FfiError::Panicked(_) | FfiError::Internal(_) | FfiError::Db(_) => error!(
                "event=ffi_call module=ffi status=error entry={entry} error_code={} duration_ms={duration_ms}",
                err.code()
            ),
            _ => warn!(
                "event=ffi_call module=ffi status=error entry={entry} error_code={} duration_ms={duration_ms}",
                err.code()
            ),
        }
    }
    result
}

unsafe fn parse_item_id(uuid: *const c_char) -> FfiResult<ItemId> {
    let raw = c_char_to_string(uuid, "uuid")?;
    ItemId::from_str(raw.trim())
        .map_err(|_| FfiError::InvalidArgument(format!("`{raw}` is not a valid item uuid")))
}

unsafe fn date_update(value: *const i64, clear: bool, field: &str) -> FfiResult<DateUpdate> {
    match (optional_date(value), clear) {
        (Some(_), true) => Err(FfiError::InvalidArgument(format!(
            "`{field}` is both provided and flagged for clearing"
        ))),
        (Some(seconds), false) => Ok(DateUpdate::Set(seconds)),
        (None, true) => Ok(DateUpdate::Clear),
        (None, false) => Ok(DateUpdate::Unchanged),
    }
}

/// Runs a mutation, then hands a fresh snapshot to every observer.
///
/// The snapshot is read under the same lock as the mutation, so it reflects
/// the store exactly as the mutation left it. The delivery turn is held
/// across both, so concurrent mutations notify in the order they applied.
/// When the snapshot cannot be read the mutation still stands and every
/// observer receives a null list instead.
fn mutate_and_notify(
    slot: &StoreSlot,
    mutation: impl FnOnce(&Toodle) -> FfiResult<Item>,
) -> FfiResult<Item> {
    let _turn = slot.delivery_turn()?;
    let (item, snapshot) = slot.with_store(|store| {
        let item = mutation(store)?;
        if slot.observers.is_empty() {
            return Ok((item, None));
        }
        Ok((item, Some(store.items())))
    })?;
    match snapshot {
        Some(Ok(items)) => {
            slot.observers.notify(&items);
        }
        Some(Err(err)) => {
            error!(
                "event=snapshot module=ffi status=error error_code={}",
                err.code()
            );
            slot.observers.notify_unavailable();
        }
        None => {}
    }
    Ok(item)
}

/// Returns the library version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn toodle_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

/// Starts file logging. A null `level` selects the build's default level.
/// Returns null on success, or an owned error string.
#[no_mangle]
pub unsafe extern "C" fn toodle_init_logging(
    level: *const c_char,
    log_dir: *const c_char,
) -> *mut c_char {
    guarded_status("toodle_init_logging", || {
        let level = optional_c_char_to_string(level, "level")?
            .unwrap_or_else(|| default_log_level().to_string());
        let log_dir = c_char_to_string(log_dir, "log_dir")?;
        init_logging(&level, &log_dir).map_err(FfiError::InvalidArgument)
    })
}

/// Opens (creating if needed) the store at `path`.
#[no_mangle]
pub unsafe extern "C" fn toodle_open(path: *const c_char) -> ResultC<StoreHandle> {
    guarded("toodle_open", || {
        let path = c_char_to_string(path, "path")?;
        let store = Toodle::open(&path)?;
        Ok(ARENA.insert(store))
    })
}

/// Closes a store. Returns `false` when the handle was not open; calling it
/// again is harmless. Observers of the store are dropped.
#[no_mangle]
pub extern "C" fn toodle_destroy(handle: StoreHandle) -> bool {
    catch_unwind(|| ARENA.remove(handle)).unwrap_or(false)
}

/// Creates an item and returns it. Notifies observers on success.
#[no_mangle]
pub unsafe extern "C" fn toodle_create_item(
    handle: StoreHandle,
    name: *const c_char,
    due_date: *const i64,
) -> ResultC<*mut ItemC> {
    guarded("toodle_create_item", || {
        let name = c_char_to_string(name, "name")?;
        let due_date = optional_date(due_date);
        let slot = ARENA.get(handle)?;
        let item = mutate_and_notify(&slot, |store| store.create_item(name, due_date))?;
        Ok(ItemC::from_item(&item).into_raw())
    })
}

/// Updates an item and returns it. Notifies observers on success.
///
/// - `name`: null keeps the current name.
/// - `due_date` / `completion_date`: non-null sets the date; null keeps it,
///   unless the matching `TOODLE_CLEAR_*` bit is set in `flags`, which
///   clears it.
#[no_mangle]
pub unsafe extern "C" fn toodle_update_item(
    handle: StoreHandle,
    uuid: *const c_char,
    name: *const c_char,
    due_date: *const i64,
    completion_date: *const i64,
    flags: u32,
) -> ResultC<*mut ItemC> {
    guarded("toodle_update_item", || {
        if flags & !KNOWN_UPDATE_FLAGS != 0 {
            return Err(FfiError::InvalidArgument(format!(
                "unknown update flags {:#x}",
                flags & !KNOWN_UPDATE_FLAGS
            )));
        }
        let id = parse_item_id(uuid)?;
        let update = ItemUpdate {
            name: optional_c_char_to_string(name, "name")?,
            due_date: date_update(due_date, flags & TOODLE_CLEAR_DUE_DATE != 0, "due_date")?,
            completion_date: date_update(
                completion_date,
                flags & TOODLE_CLEAR_COMPLETION_DATE != 0,
                "completion_date",
            )?,
        };
        let slot = ARENA.get(handle)?;
        let item = mutate_and_notify(&slot, |store| store.update_item(id, &update))?;
        Ok(ItemC::from_item(&item).into_raw())
    })
}

/// Fetches one item; an unknown uuid is an `item_not_found` error.
#[no_mangle]
pub unsafe extern "C" fn toodle_get_item(
    handle: StoreHandle,
    uuid: *const c_char,
) -> ResultC<*mut ItemC> {
    guarded("toodle_get_item", || {
        let id = parse_item_id(uuid)?;
        let item = ARENA.get(handle)?.with_store(|store| store.get_item(id))?;
        Ok(ItemC::from_item(&item).into_raw())
    })
}

/// Returns a snapshot of all items as a direct response.
#[no_mangle]
pub unsafe extern "C" fn toodle_get_all_items(handle: StoreHandle) -> ResultC<*mut ItemListC> {
    guarded("toodle_get_all_items", || {
        let items = ARENA.get(handle)?.with_store(|store| store.items())?;
        Ok(ItemListC::from_items(&items))
    })
}

/// Delivers a snapshot of all items to `callback`, exactly once, before
/// returning. The callback is private to this request and never receives
/// change notifications. Returns null on success or an owned error string;
/// on error the callback is not invoked.
#[no_mangle]
pub unsafe extern "C" fn toodle_fetch_all_items(
    handle: StoreHandle,
    callback: Option<ItemsCallback>,
    context: *mut c_void,
) -> *mut c_char {
    guarded_status("toodle_fetch_all_items", || {
        let callback = callback.ok_or(FfiError::NullArgument("callback"))?;
        let items = ARENA.get(handle)?.with_store(|store| store.items())?;
        callback(context, ItemListC::from_items(&items));
        Ok(())
    })
}

/// Registers a change observer on one store.
///
/// On success the store owns `context` and calls `drop_context` (when
/// provided) once it is no longer used. On error ownership stays with the
/// caller.
#[no_mangle]
pub unsafe extern "C" fn toodle_register_observer(
    handle: StoreHandle,
    callback: Option<ItemsCallback>,
    context: *mut c_void,
    drop_context: Option<DropContextCallback>,
) -> ResultC<SubscriptionId> {
    guarded("toodle_register_observer", || {
        let callback = callback.ok_or(FfiError::NullArgument("callback"))?;
        let slot = ARENA.get(handle)?;
        // Registering under the store lock orders it against a concurrent close.
        slot.with_store(|_| Ok(slot.observers.register(callback, context, drop_context)))
    })
}

/// Removes an observer. Returns `false` for an unknown subscription or a
/// closed store.
#[no_mangle]
pub extern "C" fn toodle_unregister_observer(
    handle: StoreHandle,
    subscription: SubscriptionId,
) -> bool {
    catch_unwind(|| match ARENA.get(handle) {
        Ok(slot) => slot.observers.unregister(subscription),
        Err(_) => false,
    })
    .unwrap_or(false)
}

/// Releases one item returned by `toodle_create_item`, `toodle_update_item`
/// or `toodle_get_item`. Null is ignored. Releasing the same pointer twice is
/// forbidden; it is caught only while the address has not been reused, and
/// then fails a debug assertion.
#[no_mangle]
pub unsafe extern "C" fn toodle_item_destroy(item: *mut ItemC) {
    ItemC::destroy(item);
}

/// Releases a snapshot list: every record first, then the list itself.
/// Null is ignored. Releasing the same list twice is forbidden, as for
/// `toodle_item_destroy`.
#[no_mangle]
pub unsafe extern "C" fn toodle_item_list_destroy(list: *mut ItemListC) {
    ItemListC::destroy(list);
}

/// Number of records in `list`; 0 for null.
#[no_mangle]
pub unsafe extern "C" fn toodle_item_list_count(list: *const ItemListC) -> usize {
    if list.is_null() {
        return 0;
    }
    (*list).len
}

/// Borrows record `index` of `list`, or null when out of bounds. The record
/// is released together with its list and must not be destroyed on its own.
#[no_mangle]
pub unsafe extern "C" fn toodle_item_list_entry_at(
    list: *const ItemListC,
    index: usize,
) -> *const ItemC {
    if list.is_null() {
        return std::ptr::null();
    }
    (*list)
        .records()
        .get(index)
        .map_or(std::ptr::null(), |record| record as *const ItemC)
}

/// Creates a label, or updates the color of an existing one.
#[no_mangle]
pub unsafe extern "C" fn toodle_create_label(
    handle: StoreHandle,
    name: *const c_char,
    color: *const c_char,
) -> ResultC<*mut LabelC> {
    guarded("toodle_create_label", || {
        let name = c_char_to_string(name, "name")?;
        let color = c_char_to_string(color, "color")?;
        let label = ARENA
            .get(handle)?
            .with_store(|store| store.create_label(&name, &color))?;
        Ok(LabelC::from_label(&label).into_raw())
    })
}

/// Returns all labels sorted by name.
#[no_mangle]
pub unsafe extern "C" fn toodle_get_all_labels(handle: StoreHandle) -> ResultC<*mut LabelListC> {
    guarded("toodle_get_all_labels", || {
        let labels = ARENA.get(handle)?.with_store(|store| store.all_labels())?;
        Ok(LabelListC::from_labels(&labels))
    })
}

/// Returns the labels attached to one item.
#[no_mangle]
pub unsafe extern "C" fn toodle_get_item_labels(
    handle: StoreHandle,
    uuid: *const c_char,
) -> ResultC<*mut LabelListC> {
    guarded("toodle_get_item_labels", || {
        let id = parse_item_id(uuid)?;
        let labels = ARENA
            .get(handle)?
            .with_store(|store| store.item_labels(id))?;
        Ok(LabelListC::from_labels(&labels))
    })
}

/// Attaches an existing label to an item. Returns null on success or an
/// owned error string.
#[no_mangle]
pub unsafe extern "C" fn toodle_add_item_label(
    handle: StoreHandle,
    uuid: *const c_char,
    label: *const c_char,
) -> *mut c_char {
    guarded_status("toodle_add_item_label", || {
        let id = parse_item_id(uuid)?;
        let label = c_char_to_string(label, "label")?;
        ARENA
            .get(handle)?
            .with_store(|store| store.add_item_label(id, &label))
    })
}

/// Detaches a label from an item; detaching a label the item does not carry
/// is a no-op. Returns null on success or an owned error string.
#[no_mangle]
pub unsafe extern "C" fn toodle_remove_item_label(
    handle: StoreHandle,
    uuid: *const c_char,
    label: *const c_char,
) -> *mut c_char {
    guarded_status("toodle_remove_item_label", || {
        let id = parse_item_id(uuid)?;
        let label = c_char_to_string(label, "label")?;
        ARENA
            .get(handle)?
            .with_store(|store| store.remove_item_label(id, &label))
    })
}

/// Replaces the item's labels with the `count` names in `labels`.
///
/// `labels` may be null only when `count` is 0. Every name must refer to an
/// existing label; otherwise nothing changes. Returns null on success or an
/// owned error string.
#[no_mangle]
pub unsafe extern "C" fn toodle_set_item_labels(
    handle: StoreHandle,
    uuid: *const c_char,
    labels: *const *const c_char,
    count: usize,
) -> *mut c_char {
    guarded_status("toodle_set_item_labels", || {
        let id = parse_item_id(uuid)?;
        let names = if count == 0 {
            Vec::new()
        } else {
            if labels.is_null() {
                return Err(FfiError::NullArgument("labels"));
            }
            std::slice::from_raw_parts(labels, count)
                .iter()
                .map(|name| c_char_to_string(*name, "labels"))
                .collect::<FfiResult<Vec<_>>>()?
        };
        ARENA
            .get(handle)?
            .with_store(|store| store.set_item_labels(id, &names))
    })
}

/// Returns the items carrying `label`, in insertion order. An unknown label
/// yields an empty list.
#[no_mangle]
pub unsafe extern "C" fn toodle_get_items_with_label(
    handle: StoreHandle,
    label: *const c_char,
) -> ResultC<*mut ItemListC> {
    guarded("toodle_get_items_with_label", || {
        let label = c_char_to_string(label, "label")?;
        let items = ARENA
            .get(handle)?
            .with_store(|store| store.items_with_label(&label))?;
        Ok(ItemListC::from_items(&items))
    })
}

#[no_mangle]
pub unsafe extern "C" fn toodle_label_destroy(label: *mut LabelC) {
    LabelC::destroy(label);
}

#[no_mangle]
pub unsafe extern "C" fn toodle_label_list_destroy(list: *mut LabelListC) {
    LabelListC::destroy(list);
}

/// Releases a string returned in an error envelope or status result.
#[no_mangle]
pub unsafe extern "C" fn toodle_string_destroy(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}

/// Number of item records currently allocated on the native side.
#[no_mangle]
pub extern "C" fn toodle_live_item_records() -> usize {
    live_item_records()
}

/// Number of item lists handed out and not yet released.
#[no_mangle]
pub extern "C" fn toodle_live_item_lists() -> usize {
    ledger::live_count(Allocation::ItemList)
}
