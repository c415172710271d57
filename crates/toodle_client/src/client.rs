//! Store façade for managed callers.
//!
//! # Responsibility
//! - Marshal domain values into native arguments and back.
//! - Own the store handle and every native allocation a call returns.
//!
//! # Invariants
//! - Optional dates travel as nullable pointers; `0` is a real timestamp.
//! - After `close`, every call fails with `ClientError::Closed` without
//!   reaching the native side.

use log::{debug, info};
use std::any::Any;
use std::ffi::{c_void, CString};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::ptr;

use toodle_core::{DateUpdate, Item, ItemId, ItemUpdate, Label};
use toodle_ffi::{
    toodle_add_item_label, toodle_create_item, toodle_create_label, toodle_fetch_all_items,
    toodle_get_all_items, toodle_get_all_labels, toodle_get_item, toodle_get_item_labels,
    toodle_get_items_with_label, toodle_init_logging, toodle_label_destroy,
    toodle_label_list_destroy, toodle_remove_item_label, toodle_set_item_labels,
    toodle_update_item,
    ItemListC, LabelC, LabelListC, TOODLE_CLEAR_COMPLETION_DATE, TOODLE_CLEAR_DUE_DATE,
};

use crate::collection::ItemCollection;
use crate::envelope::{status_to_result, ResultEnvelope};
use crate::error::{ClientError, ClientResult};
use crate::handle::Handle;
use crate::notifier::{ChangeNotifier, Subscription};
use crate::record::{read_string, ItemRecord};

pub struct StoreClient {
    handle: Handle,
}

impl StoreClient {
    /// Opens the store at `path`. Fails without producing a client.
    pub fn open(path: &str) -> ClientResult<Self> {
        let handle = Handle::open(path)?;
        info!("event=client_open module=client status=ok");
        Ok(Self { handle })
    }

    /// Starts native file logging; see `toodle_core::init_logging`.
    pub fn init_logging(level: &str, log_dir: &str) -> ClientResult<()> {
        let level = c_string(level, "level")?;
        let log_dir = c_string(log_dir, "log_dir")?;
        status_to_result(unsafe { toodle_init_logging(level.as_ptr(), log_dir.as_ptr()) })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Closes the store. Returns `true` only for the call that closed it.
    pub fn close(&mut self) -> bool {
        self.handle.close()
    }

    /// Creates an item; observers are notified before this returns.
    pub fn create(&self, name: &str, due_date: Option<i64>) -> ClientResult<Item> {
        let store = self.handle.id()?;
        let name = c_string(name, "name")?;
        let record = ResultEnvelope::new(unsafe {
            toodle_create_item(store, name.as_ptr(), date_ptr(&due_date))
        })
        .into_result()?;
        let item = unsafe { ItemRecord::from_raw(record) }?.to_item()?;
        debug!(
            "event=item_create module=client status=ok item_id={}",
            item.uuid
        );
        Ok(item)
    }

    /// Replaces name and both dates. `None` clears a date.
    pub fn update(
        &self,
        uuid: ItemId,
        name: &str,
        due_date: Option<i64>,
        completion_date: Option<i64>,
    ) -> ClientResult<Item> {
        self.update_fields(uuid, &ItemUpdate::replace(name, due_date, completion_date))
    }

    /// Applies a partial update; unchanged fields keep their stored values.
    pub fn update_fields(&self, uuid: ItemId, update: &ItemUpdate) -> ClientResult<Item> {
        let store = self.handle.id()?;
        let uuid = c_string(&uuid.to_string(), "uuid")?;
        let name = update
            .name
            .as_deref()
            .map(|name| c_string(name, "name"))
            .transpose()?;
        let (due_date, clear_due) = date_arg(update.due_date, TOODLE_CLEAR_DUE_DATE);
        let (completion_date, clear_completion) =
            date_arg(update.completion_date, TOODLE_CLEAR_COMPLETION_DATE);
        let record = ResultEnvelope::new(unsafe {
            toodle_update_item(
                store,
                uuid.as_ptr(),
                name.as_ref().map_or(ptr::null(), |name| name.as_ptr()),
                date_ptr(&due_date),
                date_ptr(&completion_date),
                clear_due | clear_completion,
            )
        })
        .into_result()?;
        unsafe { ItemRecord::from_raw(record) }?.to_item()
    }

    /// Fetches one item. An unknown uuid is `Ok(None)`.
    pub fn get(&self, uuid: ItemId) -> ClientResult<Option<Item>> {
        let store = self.handle.id()?;
        let uuid = c_string(&uuid.to_string(), "uuid")?;
        let envelope = ResultEnvelope::new(unsafe { toodle_get_item(store, uuid.as_ptr()) });
        match envelope.into_result() {
            Ok(record) => unsafe { ItemRecord::from_raw(record) }?.to_item().map(Some),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Returns every item in insertion order.
    pub fn get_all(&self) -> ClientResult<Vec<Item>> {
        self.get_all_collection()?.into_items()
    }

    /// Returns the native snapshot itself; the caller releases it.
    pub fn get_all_collection(&self) -> ClientResult<ItemCollection> {
        let store = self.handle.id()?;
        let list = ResultEnvelope::new(unsafe { toodle_get_all_items(store) }).into_result()?;
        unsafe { ItemCollection::from_raw(list) }
    }

    /// Hands a snapshot of every item to `receiver`, which runs exactly once
    /// before this returns. The receiver owns the collection.
    ///
    /// A panic in `receiver` is carried across the native call and resumed
    /// here.
    pub fn get_all_with<F, R>(&self, receiver: F) -> ClientResult<R>
    where
        F: FnOnce(ItemCollection) -> R,
    {
        let store = self.handle.id()?;
        let mut request = FetchRequest::<F, R> {
            receiver: Some(receiver),
            outcome: None,
        };
        let status = unsafe {
            toodle_fetch_all_items(
                store,
                Some(deliver_fetch::<F, R>),
                &mut request as *mut FetchRequest<F, R> as *mut c_void,
            )
        };
        status_to_result(status)?;
        match request.outcome {
            Some(Ok(Ok(value))) => Ok(value),
            Some(Ok(Err(panic))) => resume_unwind(panic),
            Some(Err(err)) => Err(err),
            None => Err(ClientError::Contract(
                "fetch completed without delivering a snapshot".to_string(),
            )),
        }
    }

    /// Subscribes to change notifications; see [`ChangeNotifier::register`].
    pub fn subscribe<F>(&self, callback: F) -> ClientResult<Subscription>
    where
        F: Fn(ClientResult<Vec<Item>>) + Send + Sync + 'static,
    {
        ChangeNotifier::register(&self.handle, callback)
    }

    /// Creates a label or recolors an existing one.
    pub fn create_label(&self, name: &str, color: &str) -> ClientResult<Label> {
        let store = self.handle.id()?;
        let name = c_string(name, "name")?;
        let color = c_string(color, "color")?;
        let raw = ResultEnvelope::new(unsafe {
            toodle_create_label(store, name.as_ptr(), color.as_ptr())
        })
        .into_result()?;
        let label = unsafe { read_label(&*raw) };
        unsafe { toodle_label_destroy(raw) };
        label
    }

    /// Every label, sorted by name.
    pub fn labels(&self) -> ClientResult<Vec<Label>> {
        let store = self.handle.id()?;
        let list = ResultEnvelope::new(unsafe { toodle_get_all_labels(store) }).into_result()?;
        unsafe { take_labels(list) }
    }

    pub fn item_labels(&self, uuid: ItemId) -> ClientResult<Vec<Label>> {
        let store = self.handle.id()?;
        let uuid = c_string(&uuid.to_string(), "uuid")?;
        let list = ResultEnvelope::new(unsafe { toodle_get_item_labels(store, uuid.as_ptr()) })
            .into_result()?;
        unsafe { take_labels(list) }
    }

    /// Attaches an existing label to an item.
    pub fn add_label(&self, uuid: ItemId, label: &str) -> ClientResult<()> {
        let store = self.handle.id()?;
        let uuid = c_string(&uuid.to_string(), "uuid")?;
        let label = c_string(label, "label")?;
        status_to_result(unsafe { toodle_add_item_label(store, uuid.as_ptr(), label.as_ptr()) })
    }

    /// Detaches a label from an item; a label the item lacks is ignored.
    pub fn remove_label(&self, uuid: ItemId, label: &str) -> ClientResult<()> {
        let store = self.handle.id()?;
        let uuid = c_string(&uuid.to_string(), "uuid")?;
        let label = c_string(label, "label")?;
        status_to_result(unsafe { toodle_remove_item_label(store, uuid.as_ptr(), label.as_ptr()) })
    }

    /// Makes `labels` the item's exact label set. Unknown names fail with
    /// `NotFound` and leave the current set in place.
    pub fn set_labels(&self, uuid: ItemId, labels: &[&str]) -> ClientResult<()> {
        let store = self.handle.id()?;
        let uuid = c_string(&uuid.to_string(), "uuid")?;
        let names = labels
            .iter()
            .map(|label| c_string(label, "labels"))
            .collect::<ClientResult<Vec<_>>>()?;
        let pointers = names.iter().map(|name| name.as_ptr()).collect::<Vec<_>>();
        status_to_result(unsafe {
            toodle_set_item_labels(store, uuid.as_ptr(), pointers.as_ptr(), pointers.len())
        })
    }

    /// Items carrying `label`, in insertion order.
    pub fn items_with_label(&self, label: &str) -> ClientResult<Vec<Item>> {
        let store = self.handle.id()?;
        let label = c_string(label, "label")?;
        let list = ResultEnvelope::new(unsafe { toodle_get_items_with_label(store, label.as_ptr()) })
            .into_result()?;
        unsafe { ItemCollection::from_raw(list) }?.into_items()
    }
}

struct FetchRequest<F, R> {
    receiver: Option<F>,
    outcome: Option<ClientResult<Result<R, Box<dyn Any + Send>>>>,
}

extern "C" fn deliver_fetch<F, R>(context: *mut c_void, items: *mut ItemListC)
where
    F: FnOnce(ItemCollection) -> R,
{
    let request = unsafe { &mut *(context as *mut FetchRequest<F, R>) };
    let collection = unsafe { ItemCollection::from_raw(items) };
    let Some(receiver) = request.receiver.take() else {
        return;
    };
    request.outcome = Some(
        collection.map(|collection| catch_unwind(AssertUnwindSafe(|| receiver(collection)))),
    );
}

fn c_string(value: &str, field: &str) -> ClientResult<CString> {
    CString::new(value)
        .map_err(|_| ClientError::InvalidArgument(format!("`{field}` contains a NUL byte")))
}

fn date_ptr(value: &Option<i64>) -> *const i64 {
    value.as_ref().map_or(ptr::null(), |value| value as *const i64)
}

/// Splits a date update into its pointer value and clear flag.
fn date_arg(update: DateUpdate, clear_flag: u32) -> (Option<i64>, u32) {
    match update {
        DateUpdate::Unchanged => (None, 0),
        DateUpdate::Clear => (None, clear_flag),
        DateUpdate::Set(seconds) => (Some(seconds), 0),
    }
}

unsafe fn read_label(label: &LabelC) -> ClientResult<Label> {
    Ok(Label {
        name: read_string(label.name, "name")?,
        color: read_string(label.color, "color")?,
    })
}

/// Copies a label list out and releases it.
unsafe fn take_labels(list: *mut LabelListC) -> ClientResult<Vec<Label>> {
    if list.is_null() {
        return Err(ClientError::Contract("null label list".to_string()));
    }
    let labels: ClientResult<Vec<Label>> = (*list)
        .records()
        .iter()
        .map(|label| read_label(label))
        .collect();
    toodle_label_list_destroy(list);
    labels
}
