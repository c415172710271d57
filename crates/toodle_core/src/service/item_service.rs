//! Item use-case service.
//!
//! # Responsibility
//! - Create, update and read items through an `ItemRepository`.
//! - Resolve partial updates against the stored row.
//!
//! # Invariants
//! - Every write returns the item as stored after the write.
//! - `DateUpdate::Unchanged` never touches the stored date.

use crate::model::item::{DateUpdate, Item, ItemId, ItemUpdate};
use crate::repo::item_repo::{ItemRepository, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// A write succeeded but its read-back did not.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent item state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service for items.
pub struct ItemService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> ItemService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an item with an optional due date and no completion date.
    pub fn create_item(&self, name: impl Into<String>, due_date: Option<i64>) -> ServiceResult<Item> {
        let item = Item::new(name).with_due_date(due_date);
        let id = self.repo.create_item(&item)?;
        info!(
            "event=item_create module=service status=ok item={id} has_due_date={}",
            due_date.is_some()
        );
        self.read_back(id)
    }

    /// Applies a partial update and returns the stored result.
    ///
    /// A no-op update still verifies that the item exists.
    pub fn update_item(&self, id: ItemId, update: &ItemUpdate) -> ServiceResult<Item> {
        let mut item = self
            .repo
            .get_item(id)?
            .ok_or(ServiceError::ItemNotFound(id))?;
        if update.is_noop() {
            return Ok(item);
        }

        item.apply(update);
        self.repo.update_item(&item)?;
        info!(
            "event=item_update module=service status=ok item={id} rename={} due={} completion={}",
            update.name.is_some(),
            date_update_label(update.due_date),
            date_update_label(update.completion_date)
        );
        self.read_back(id)
    }

    /// Marks an item completed at `completed_at` (seconds since epoch).
    pub fn complete_item(&self, id: ItemId, completed_at: i64) -> ServiceResult<Item> {
        let update = ItemUpdate {
            completion_date: DateUpdate::Set(completed_at),
            ..ItemUpdate::default()
        };
        self.update_item(id, &update)
    }

    pub fn get_item(&self, id: ItemId) -> ServiceResult<Option<Item>> {
        Ok(self.repo.get_item(id)?)
    }

    pub fn list_items(&self) -> ServiceResult<Vec<Item>> {
        Ok(self.repo.list_items()?)
    }

    fn read_back(&self, id: ItemId) -> ServiceResult<Item> {
        self.repo
            .get_item(id)?
            .ok_or(ServiceError::InconsistentState("written item is missing on read-back"))
    }
}

fn date_update_label(update: DateUpdate) -> &'static str {
    match update {
        DateUpdate::Unchanged => "unchanged",
        DateUpdate::Clear => "clear",
        DateUpdate::Set(_) => "set",
    }
}
