//! Item repository contract and SQLite implementation.
//!
//! # Invariants
//! - `list_items` returns rows in insertion order.
//! - Dates round-trip through nullable INTEGER columns; `NULL` means absent.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemValidationError};
use crate::model::label::LabelValidationError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    due_date,
    completion_date
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item and label persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    InvalidLabel(LabelValidationError),
    Db(DbError),
    NotFound(ItemId),
    LabelNotFound(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidLabel(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::LabelNotFound(name) => write!(f, "label not found: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidLabel(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::LabelNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<LabelValidationError> for RepoError {
    fn from(value: LabelValidationError) -> Self {
        Self::InvalidLabel(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for item persistence.
pub trait ItemRepository {
    fn create_item(&self, item: &Item) -> RepoResult<ItemId>;
    /// Writes every mutable field of `item`.
    fn update_item(&self, item: &Item) -> RepoResult<()>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn list_items(&self) -> RepoResult<Vec<Item>>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Wraps a connection whose schema is already at the latest version.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &Item) -> RepoResult<ItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO items (uuid, name, due_date, completion_date, seq)
             VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM items));",
            params![
                item.uuid.to_string(),
                item.name.as_str(),
                item.due_date,
                item.completion_date,
            ],
        )?;

        Ok(item.uuid)
    }

    fn update_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        let changed = self.conn.execute(
            "UPDATE items
             SET
                name = ?1,
                due_date = ?2,
                completion_date = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                item.name.as_str(),
                item.due_date,
                item.completion_date,
                item.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(item.uuid));
        }

        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self) -> RepoResult<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} ORDER BY seq ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }
}

pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let version = schema_version(conn)?;
    let latest = latest_version();
    if version != latest {
        return Err(RepoError::InvalidData(format!(
            "store schema version {version} does not match expected {latest}"
        )));
    }
    Ok(())
}

pub(crate) fn item_exists(conn: &Connection, id: ItemId) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM items WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in items.uuid"))
    })?;

    let item = Item {
        uuid,
        name: row.get("name")?,
        due_date: row.get("due_date")?,
        completion_date: row.get("completion_date")?,
    };
    item.validate()
        .map_err(|err| RepoError::InvalidData(format!("item {uuid}: {err}")))?;
    Ok(item)
}
