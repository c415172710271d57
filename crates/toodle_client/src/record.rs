//! Owned native item record.

use std::ffi::{c_char, CStr};
use std::ptr::NonNull;

use toodle_core::{Item, ItemId};
use toodle_ffi::{toodle_item_destroy, ItemC};

use crate::error::{ClientError, ClientResult};

/// Sole owner of one standalone `ItemC`; dropping it destroys the record.
#[derive(Debug)]
pub struct ItemRecord {
    raw: NonNull<ItemC>,
}

// The native allocation is not tied to the thread that received it.
unsafe impl Send for ItemRecord {}

impl ItemRecord {
    /// Takes ownership of `raw`.
    ///
    /// # Safety
    /// `raw` must be a standalone record returned by the native side and not
    /// owned by anyone else.
    pub(crate) unsafe fn from_raw(raw: *mut ItemC) -> ClientResult<Self> {
        NonNull::new(raw)
            .map(|raw| Self { raw })
            .ok_or_else(|| ClientError::Contract("null item record".to_string()))
    }

    pub fn to_item(&self) -> ClientResult<Item> {
        unsafe { read_item(self.raw.as_ref()) }
    }
}

impl Drop for ItemRecord {
    fn drop(&mut self) {
        unsafe { toodle_item_destroy(self.raw.as_ptr()) };
    }
}

/// Copies one transfer record into an owned `Item`.
///
/// # Safety
/// `record` must be a live record produced by the native side.
pub(crate) unsafe fn read_item(record: &ItemC) -> ClientResult<Item> {
    let uuid = read_string(record.uuid, "uuid")?;
    let uuid = ItemId::parse_str(&uuid)
        .map_err(|_| ClientError::Contract(format!("`{uuid}` is not a uuid")))?;
    Ok(Item {
        uuid,
        name: read_string(record.name, "name")?,
        due_date: read_date(record.due_date),
        completion_date: read_date(record.completion_date),
    })
}

pub(crate) unsafe fn read_string(value: *const c_char, field: &str) -> ClientResult<String> {
    if value.is_null() {
        return Err(ClientError::Contract(format!("record field `{field}` is null")));
    }
    CStr::from_ptr(value)
        .to_str()
        .map(str::to_owned)
        .map_err(|_| ClientError::Contract(format!("record field `{field}` is not UTF-8")))
}

unsafe fn read_date(value: *const i64) -> Option<i64> {
    if value.is_null() {
        None
    } else {
        Some(*value)
    }
}
