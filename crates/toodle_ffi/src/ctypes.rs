//! `#[repr(C)]` transfer structures.
//!
//! # Invariants
//! - Field order is part of the ABI; JNA and Swift bind positionally.
//! - Optional dates are nullable pointers to a boxed `i64`; null is the only
//!   encoding of "absent".
//! - An `ItemListC` carries exactly one count, `len`.
//! - A `ResultC` carries exactly one of `value` and `error`.
//! - Every pointer handed out is released exactly once. A second release is
//!   a caller bug, caught only while the address has not been reused.

use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use toodle_core::{Item, Label};

use crate::error::{FfiError, FfiResult};
use crate::ledger::{self, Allocation};

static LIVE_RECORDS: AtomicUsize = AtomicUsize::new(0);

/// Opaque store reference; `0` is never issued.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreHandle(pub u64);

/// Observer registration reference; `0` is never issued.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Payload types that have a distinguished "not present" value.
pub trait NullableValue: Copy {
    fn null() -> Self;
    fn is_null_value(&self) -> bool;
}

impl<T> NullableValue for *mut T {
    fn null() -> Self {
        ptr::null_mut()
    }

    fn is_null_value(&self) -> bool {
        self.is_null()
    }
}

impl NullableValue for StoreHandle {
    fn null() -> Self {
        StoreHandle(0)
    }

    fn is_null_value(&self) -> bool {
        self.0 == 0
    }
}

impl NullableValue for SubscriptionId {
    fn null() -> Self {
        SubscriptionId(0)
    }

    fn is_null_value(&self) -> bool {
        self.0 == 0
    }
}

/// Success-or-error envelope returned by every fallible entry point.
///
/// `error` is non-null exactly when the call failed; it is an owned string
/// released with `toodle_string_destroy`.
#[repr(C)]
#[derive(Debug)]
pub struct ResultC<T: NullableValue> {
    pub value: T,
    pub error: *mut c_char,
}

impl<T: NullableValue> ResultC<T> {
    pub fn ok(value: T) -> Self {
        debug_assert!(!value.is_null_value(), "success envelope without payload");
        Self {
            value,
            error: ptr::null_mut(),
        }
    }

    pub fn err(error: &FfiError) -> Self {
        Self {
            value: T::null(),
            error: string_to_c_char(error.to_wire()),
        }
    }

    pub fn from_result(result: FfiResult<T>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::err(&err),
        }
    }
}

/// One item, positional layout `uuid, name, due_date, completion_date`.
#[repr(C)]
#[derive(Debug)]
pub struct ItemC {
    pub uuid: *mut c_char,
    pub name: *mut c_char,
    pub due_date: *mut i64,
    pub completion_date: *mut i64,
}

impl ItemC {
    pub fn from_item(item: &Item) -> Self {
        LIVE_RECORDS.fetch_add(1, Ordering::SeqCst);
        Self {
            uuid: string_to_c_char(item.uuid.hyphenated().to_string()),
            name: string_to_c_char(item.name.clone()),
            due_date: optional_date_to_ptr(item.due_date),
            completion_date: optional_date_to_ptr(item.completion_date),
        }
    }

    /// Frees every allocation behind the fields and nulls them.
    ///
    /// A record whose `uuid` is already null has been released; releasing it
    /// again does nothing.
    ///
    /// # Safety
    /// The fields must have been produced by `from_item` and not modified.
    pub unsafe fn release(&mut self) {
        if self.uuid.is_null() {
            return;
        }
        drop(CString::from_raw(self.uuid));
        if !self.name.is_null() {
            drop(CString::from_raw(self.name));
        }
        if !self.due_date.is_null() {
            drop(Box::from_raw(self.due_date));
        }
        if !self.completion_date.is_null() {
            drop(Box::from_raw(self.completion_date));
        }
        self.uuid = ptr::null_mut();
        self.name = ptr::null_mut();
        self.due_date = ptr::null_mut();
        self.completion_date = ptr::null_mut();
        LIVE_RECORDS.fetch_sub(1, Ordering::SeqCst);
    }

    /// Boxes a record and records it as issued.
    pub fn into_raw(self) -> *mut ItemC {
        ledger::issue(Allocation::Item, Box::into_raw(Box::new(self)))
    }

    /// Releases a record produced by `into_raw`.
    ///
    /// # Safety
    /// `item` must be null or a pointer returned by `into_raw` that has not
    /// been released yet.
    pub unsafe fn destroy(item: *mut ItemC) {
        if !ledger::retire(Allocation::Item, item) {
            return;
        }
        let mut boxed = Box::from_raw(item);
        boxed.release();
    }
}

/// Contiguous run of `len` records.
#[repr(C)]
#[derive(Debug)]
pub struct ItemListC {
    /// Null when `len == 0`.
    pub items: *mut ItemC,
    pub len: usize,
}

impl ItemListC {
    /// Builds a snapshot list and records it as issued.
    pub fn from_items(items: &[Item]) -> *mut ItemListC {
        let records = items.iter().map(ItemC::from_item).collect::<Vec<_>>();
        let len = records.len();
        let items = if len == 0 {
            ptr::null_mut()
        } else {
            Box::into_raw(records.into_boxed_slice()) as *mut ItemC
        };
        ledger::issue(Allocation::ItemList, Box::into_raw(Box::new(ItemListC { items, len })))
    }

    /// Borrows the first `len` records.
    ///
    /// # Safety
    /// `self` must come from `from_items` and must not have been destroyed.
    pub unsafe fn records(&self) -> &[ItemC] {
        if self.items.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.items, self.len)
    }

    /// Releases every record in order, then the array, then the list.
    ///
    /// # Safety
    /// `list` must be null or a pointer returned by `from_items` that has not
    /// been released yet.
    pub unsafe fn destroy(list: *mut ItemListC) {
        if !ledger::retire(Allocation::ItemList, list) {
            return;
        }
        let list = Box::from_raw(list);
        if list.items.is_null() {
            return;
        }
        let slice = ptr::slice_from_raw_parts_mut(list.items, list.len);
        for record in (*slice).iter_mut() {
            record.release();
        }
        drop(Box::from_raw(slice));
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct LabelC {
    pub name: *mut c_char,
    pub color: *mut c_char,
}

impl LabelC {
    pub fn from_label(label: &Label) -> Self {
        Self {
            name: string_to_c_char(label.name.clone()),
            color: string_to_c_char(label.color.clone()),
        }
    }

    /// # Safety
    /// Fields must come from `from_label`.
    unsafe fn release(&mut self) {
        if !self.name.is_null() {
            drop(CString::from_raw(self.name));
            self.name = ptr::null_mut();
        }
        if !self.color.is_null() {
            drop(CString::from_raw(self.color));
            self.color = ptr::null_mut();
        }
    }

    pub fn into_raw(self) -> *mut LabelC {
        ledger::issue(Allocation::Label, Box::into_raw(Box::new(self)))
    }

    /// # Safety
    /// `label` must be null or a pointer returned by `into_raw` that has not
    /// been released yet.
    pub unsafe fn destroy(label: *mut LabelC) {
        if !ledger::retire(Allocation::Label, label) {
            return;
        }
        Box::from_raw(label).release();
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct LabelListC {
    pub labels: *mut LabelC,
    pub len: usize,
}

impl LabelListC {
    pub fn from_labels(labels: &[Label]) -> *mut LabelListC {
        let records = labels.iter().map(LabelC::from_label).collect::<Vec<_>>();
        let len = records.len();
        let labels = if len == 0 {
            ptr::null_mut()
        } else {
            Box::into_raw(records.into_boxed_slice()) as *mut LabelC
        };
        ledger::issue(
            Allocation::LabelList,
            Box::into_raw(Box::new(LabelListC { labels, len })),
        )
    }

    /// # Safety
    /// `self` must come from `from_labels` and must not have been destroyed.
    pub unsafe fn records(&self) -> &[LabelC] {
        if self.labels.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.labels, self.len)
    }

    /// # Safety
    /// `list` must be null or a pointer returned by `from_labels` that has
    /// not been released yet.
    pub unsafe fn destroy(list: *mut LabelListC) {
        if !ledger::retire(Allocation::LabelList, list) {
            return;
        }
        let list = Box::from_raw(list);
        if list.labels.is_null() {
            return;
        }
        let slice = ptr::slice_from_raw_parts_mut(list.labels, list.len);
        for record in (*slice).iter_mut() {
            record.release();
        }
        drop(Box::from_raw(slice));
    }
}

/// Number of `ItemC` records whose fields are still allocated.
pub fn live_item_records() -> usize {
    LIVE_RECORDS.load(Ordering::SeqCst)
}

/// Converts an owned string into a C string the caller must release.
///
/// Interior NUL bytes cannot be represented and are dropped.
pub fn string_to_c_char(value: String) -> *mut c_char {
    let value = if value.contains('\0') {
        value.replace('\0', "")
    } else {
        value
    };
    match CString::new(value) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Copies a required C string argument.
///
/// # Safety
/// `value` must be null or point to a NUL-terminated string.
pub unsafe fn c_char_to_string(value: *const c_char, field: &'static str) -> FfiResult<String> {
    if value.is_null() {
        return Err(FfiError::NullArgument(field));
    }
    CStr::from_ptr(value)
        .to_str()
        .map(str::to_owned)
        .map_err(|_| FfiError::InvalidUtf8(field))
}

/// Copies an optional C string argument; null maps to `None`.
///
/// # Safety
/// `value` must be null or point to a NUL-terminated string.
pub unsafe fn optional_c_char_to_string(
    value: *const c_char,
    field: &'static str,
) -> FfiResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    c_char_to_string(value, field).map(Some)
}

/// Reads a nullable date argument.
///
/// # Safety
/// `value` must be null or point to a readable `i64`.
pub unsafe fn optional_date(value: *const i64) -> Option<i64> {
    if value.is_null() {
        None
    } else {
        Some(*value)
    }
}

fn optional_date_to_ptr(value: Option<i64>) -> *mut i64 {
    value.map_or(ptr::null_mut(), |seconds| Box::into_raw(Box::new(seconds)))
}

#[cfg(test)]
mod tests {
    use super::{optional_date, ItemC, ItemListC, NullableValue, ResultC, StoreHandle};
    use crate::error::FfiError;
    use std::ffi::CStr;
    use std::ptr;
    use toodle_core::Item;

    #[test]
    fn absent_dates_become_null_pointers() {
        let item = Item::new("undated");
        let mut record = ItemC::from_item(&item);
        assert!(record.due_date.is_null());
        assert!(record.completion_date.is_null());
        unsafe { record.release() };
    }

    #[test]
    fn epoch_zero_stays_a_value() {
        let item = Item::new("epoch").with_due_date(Some(0));
        let mut record = ItemC::from_item(&item);
        assert!(!record.due_date.is_null());
        assert_eq!(unsafe { optional_date(record.due_date) }, Some(0));
        unsafe { record.release() };
    }

    #[test]
    fn releasing_a_record_twice_is_a_no_op() {
        let mut record = ItemC::from_item(&Item::new("twice"));
        unsafe {
            record.release();
            record.release();
        }
        assert!(record.uuid.is_null());
        assert!(record.name.is_null());
    }

    #[test]
    fn list_len_matches_records() {
        let items = vec![Item::new("a"), Item::new("b"), Item::new("c")];
        let list = ItemListC::from_items(&items);
        unsafe {
            let records = (*list).records();
            assert_eq!(records.len(), 3);
            let name = CStr::from_ptr(records[1].name).to_str().unwrap();
            assert_eq!(name, "b");
            ItemListC::destroy(list);
        }
    }

    #[test]
    fn empty_list_has_null_items() {
        let list = ItemListC::from_items(&[]);
        unsafe {
            assert!((*list).items.is_null());
            assert!((*list).records().is_empty());
            ItemListC::destroy(list);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "release of unknown or already released item_list")]
    fn releasing_an_unissued_list_is_fatal() {
        let mut fake = ItemListC {
            items: ptr::null_mut(),
            len: 0,
        };
        unsafe { ItemListC::destroy(&mut fake) };
    }

    #[test]
    fn envelope_populates_exactly_one_side() {
        let ok = ResultC::ok(StoreHandle(3));
        assert!(ok.error.is_null());
        assert!(!ok.value.is_null_value());

        let err = ResultC::<StoreHandle>::err(&FfiError::InvalidArgument("bad".to_string()));
        assert!(err.value.is_null_value());
        assert!(!err.error.is_null());
        unsafe { crate::api::toodle_string_destroy(err.error) };
    }
}
