//! Owned native item snapshot.
//!
//! # Invariants
//! - `ItemListC::len` is the only count trusted; any other count is checked
//!   against it.
//! - Records are read through a slice of exactly `len` entries.
//! - Closing releases every record, then the list, exactly once.

use std::ptr::NonNull;

use toodle_core::Item;
use toodle_ffi::{toodle_item_list_destroy, ItemC, ItemListC};

use crate::error::{ClientError, ClientResult};
use crate::record::read_item;

#[derive(Debug)]
pub struct ItemCollection {
    raw: Option<NonNull<ItemListC>>,
}

// The list is owned by this guard alone and may be released on any thread.
unsafe impl Send for ItemCollection {}

impl ItemCollection {
    /// Takes ownership of a native list.
    ///
    /// # Safety
    /// `raw` must be a list returned by the native side and owned by nobody
    /// else.
    pub unsafe fn from_raw(raw: *mut ItemListC) -> ClientResult<Self> {
        NonNull::new(raw)
            .map(|raw| Self { raw: Some(raw) })
            .ok_or_else(|| ClientError::Contract("null item list".to_string()))
    }

    /// Takes ownership of a native list whose count was also reported
    /// through a second channel.
    ///
    /// On disagreement the list is released and `CountMismatch` returned.
    ///
    /// # Safety
    /// Same as [`ItemCollection::from_raw`].
    pub unsafe fn from_raw_checked(raw: *mut ItemListC, declared: usize) -> ClientResult<Self> {
        let mut collection = Self::from_raw(raw)?;
        let authoritative = collection.len();
        if authoritative != declared {
            collection.close();
            return Err(ClientError::CountMismatch {
                authoritative,
                declared,
            });
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.raw.map_or(0, |raw| unsafe { raw.as_ref() }.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.raw.is_none()
    }

    /// Copies the records into owned items. Fails once closed.
    pub fn items(&self) -> ClientResult<Vec<Item>> {
        self.records()?
            .iter()
            .map(|record| unsafe { read_item(record) })
            .collect()
    }

    /// Copies the records out and releases the native list.
    pub fn into_items(mut self) -> ClientResult<Vec<Item>> {
        let items = self.items();
        self.close();
        items
    }

    /// Releases every record and the list. Later calls do nothing.
    pub fn close(&mut self) {
        if let Some(raw) = self.raw.take() {
            unsafe { toodle_item_list_destroy(raw.as_ptr()) };
        }
    }

    fn records(&self) -> ClientResult<&[ItemC]> {
        let raw = self
            .raw
            .ok_or_else(|| ClientError::Contract("item collection is closed".to_string()))?;
        Ok(unsafe { raw.as_ref().records() })
    }
}

impl Drop for ItemCollection {
    fn drop(&mut self) {
        self.close();
    }
}
