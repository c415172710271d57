//! Native store instance behind one handle.
//!
//! # Responsibility
//! - Own the SQLite connection of one open store.
//! - Run item and label use-cases through core services.
//!
//! # Invariants
//! - Every call builds repositories over the same connection; nothing is
//!   cached between calls.

use log::info;
use rusqlite::Connection;
use toodle_core::db::open_store;
use toodle_core::{
    Item, ItemId, ItemService, ItemUpdate, Label, LabelRepository, SqliteItemRepository,
    SqliteLabelRepository, StoreConfig,
};

use crate::error::{FfiError, FfiResult};

pub struct Toodle {
    conn: Connection,
}

impl Toodle {
    /// Opens the store at `path` (`":memory:"` for a transient store).
    pub fn open(path: &str) -> FfiResult<Self> {
        let config = StoreConfig::from_path(path)?;
        let conn = open_store(&config)?;
        info!(
            "event=store_open module=ffi status=ok mode={}",
            config.location.mode()
        );
        Ok(Self { conn })
    }

    fn with_item_service<T>(
        &self,
        f: impl FnOnce(&ItemService<SqliteItemRepository<'_>>) -> FfiResult<T>,
    ) -> FfiResult<T> {
        let repo = SqliteItemRepository::try_new(&self.conn)?;
        f(&ItemService::new(repo))
    }

    fn labels(&self) -> FfiResult<SqliteLabelRepository<'_>> {
        Ok(SqliteLabelRepository::try_new(&self.conn)?)
    }

    pub fn create_item(&self, name: String, due_date: Option<i64>) -> FfiResult<Item> {
        self.with_item_service(|service| Ok(service.create_item(name, due_date)?))
    }

    pub fn update_item(&self, id: ItemId, update: &ItemUpdate) -> FfiResult<Item> {
        self.with_item_service(|service| Ok(service.update_item(id, update)?))
    }

    pub fn get_item(&self, id: ItemId) -> FfiResult<Item> {
        self.with_item_service(|service| {
            service.get_item(id)?.ok_or(FfiError::ItemNotFound(id))
        })
    }

    pub fn items(&self) -> FfiResult<Vec<Item>> {
        self.with_item_service(|service| Ok(service.list_items()?))
    }

    pub fn create_label(&self, name: &str, color: &str) -> FfiResult<Label> {
        let label = Label::new(name, color).map_err(|err| FfiError::Validation(err.to_string()))?;
        self.labels()?.create_label(&label)?;
        Ok(label)
    }

    pub fn all_labels(&self) -> FfiResult<Vec<Label>> {
        Ok(self.labels()?.list_labels()?)
    }

    pub fn add_item_label(&self, id: ItemId, label: &str) -> FfiResult<()> {
        Ok(self.labels()?.add_item_label(id, label)?)
    }

    pub fn remove_item_label(&self, id: ItemId, label: &str) -> FfiResult<()> {
        Ok(self.labels()?.remove_item_label(id, label)?)
    }

    pub fn set_item_labels(&self, id: ItemId, labels: &[String]) -> FfiResult<()> {
        Ok(self.labels()?.set_item_labels(id, labels)?)
    }

    pub fn item_labels(&self, id: ItemId) -> FfiResult<Vec<Label>> {
        Ok(self.labels()?.labels_for_item(id)?)
    }

    pub fn items_with_label(&self, label: &str) -> FfiResult<Vec<Item>> {
        Ok(self.labels()?.items_with_label(label)?)
    }
}
