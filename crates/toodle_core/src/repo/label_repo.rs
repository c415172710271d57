//! Label repository contract and SQLite implementation.
//!
//! # Invariants
//! - Label names are stored normalized (trimmed, lowercase).
//! - Attaching a label twice is a no-op.
//! - Replacing an item's label set is all-or-nothing.

use crate::model::item::{Item, ItemId};
use crate::model::label::{normalize_label_name, Label};
use crate::repo::item_repo::{
    ensure_schema_ready, item_exists, parse_item_row, RepoError, RepoResult, ITEM_SELECT_SQL,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait LabelRepository {
    /// Inserts a label or updates the color of an existing one.
    fn create_label(&self, label: &Label) -> RepoResult<()>;
    fn get_label(&self, name: &str) -> RepoResult<Option<Label>>;
    /// Returns all labels sorted by name.
    fn list_labels(&self) -> RepoResult<Vec<Label>>;
    fn add_item_label(&self, item: ItemId, label_name: &str) -> RepoResult<()>;
    fn remove_item_label(&self, item: ItemId, label_name: &str) -> RepoResult<()>;
    fn labels_for_item(&self, item: ItemId) -> RepoResult<Vec<Label>>;
    /// Makes `label_names` the item's exact label set.
    ///
    /// Fails with `LabelNotFound` before touching anything when one of the
    /// names is unknown.
    fn set_item_labels(&self, item: ItemId, label_names: &[String]) -> RepoResult<()>;
    /// Items carrying `label_name`, in insertion order; empty for an unknown
    /// label.
    fn items_with_label(&self, label_name: &str) -> RepoResult<Vec<Item>>;
}

pub struct SqliteLabelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLabelRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn require_item(&self, item: ItemId) -> RepoResult<()> {
        if !item_exists(self.conn, item)? {
            return Err(RepoError::NotFound(item));
        }
        Ok(())
    }
}

impl LabelRepository for SqliteLabelRepository<'_> {
    fn create_label(&self, label: &Label) -> RepoResult<()> {
        label.validate()?;
        self.conn.execute(
            "INSERT INTO labels (name, color) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET color = excluded.color;",
            params![label.name.as_str(), label.color.as_str()],
        )?;
        Ok(())
    }

    fn get_label(&self, name: &str) -> RepoResult<Option<Label>> {
        let label = self
            .conn
            .query_row(
                "SELECT name, color FROM labels WHERE name = ?1;",
                [normalize_label_name(name)],
                |row| Ok(label_from_row(row)),
            )
            .optional()?;
        label.transpose()
    }

    fn list_labels(&self) -> RepoResult<Vec<Label>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, color FROM labels ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(label_from_row(row)?);
        }
        Ok(labels)
    }

    fn add_item_label(&self, item: ItemId, label_name: &str) -> RepoResult<()> {
        self.require_item(item)?;
        let name = normalize_label_name(label_name);
        if self.get_label(&name)?.is_none() {
            return Err(RepoError::LabelNotFound(name));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO item_labels (item_uuid, label_name) VALUES (?1, ?2);",
            params![item.to_string(), name],
        )?;
        Ok(())
    }

    fn remove_item_label(&self, item: ItemId, label_name: &str) -> RepoResult<()> {
        self.require_item(item)?;
        self.conn.execute(
            "DELETE FROM item_labels WHERE item_uuid = ?1 AND label_name = ?2;",
            params![item.to_string(), normalize_label_name(label_name)],
        )?;
        Ok(())
    }

    fn labels_for_item(&self, item: ItemId) -> RepoResult<Vec<Label>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.name, l.color
             FROM item_labels il
             JOIN labels l ON l.name = il.label_name
             WHERE il.item_uuid = ?1
             ORDER BY l.name ASC;",
        )?;
        let mut rows = stmt.query([item.to_string()])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(label_from_row(row)?);
        }
        Ok(labels)
    }

    fn set_item_labels(&self, item: ItemId, label_names: &[String]) -> RepoResult<()> {
        self.require_item(item)?;
        let mut names = label_names
            .iter()
            .map(|name| normalize_label_name(name))
            .collect::<Vec<_>>();
        names.sort();
        names.dedup();
        for name in &names {
            if self.get_label(name)?.is_none() {
                return Err(RepoError::LabelNotFound(name.clone()));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM item_labels WHERE item_uuid = ?1;",
            [item.to_string()],
        )?;
        for name in &names {
            tx.execute(
                "INSERT INTO item_labels (item_uuid, label_name) VALUES (?1, ?2);",
                params![item.to_string(), name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn items_with_label(&self, label_name: &str) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE uuid IN (SELECT item_uuid FROM item_labels WHERE label_name = ?1)
             ORDER BY seq ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([normalize_label_name(label_name)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }
}

fn label_from_row(row: &Row<'_>) -> RepoResult<Label> {
    let label = Label {
        name: row.get(0)?,
        color: row.get(1)?,
    };
    label
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("label `{}`: {err}", label.name)))?;
    Ok(label)
}
