//! Item domain model.
//!
//! # Responsibility
//! - Define the canonical item record and its write-side validation.
//! - Define the three-state date update used by partial updates.
//!
//! # Invariants
//! - `uuid` is assigned once and never changes.
//! - A due date of `Some(0)` (the epoch) is a real date, distinct from `None`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of an item.
pub type ItemId = Uuid;

const MAX_NAME_CHARS: usize = 1024;

/// Canonical stored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub uuid: ItemId,
    pub name: String,
    /// Seconds since epoch.
    pub due_date: Option<i64>,
    /// Seconds since epoch.
    pub completion_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyName,
    NameTooLong { chars: usize, max: usize },
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "item name cannot be empty"),
            Self::NameTooLong { chars, max } => {
                write!(f, "item name has {chars} chars; at most {max} allowed")
            }
        }
    }
}

impl Error for ItemValidationError {}

impl Item {
    /// Creates an item with a freshly generated id and no dates.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(uuid: ItemId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            due_date: None,
            completion_date: None,
        }
    }

    pub fn with_due_date(mut self, due_date: Option<i64>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }

    /// Checks write-side invariants.
    ///
    /// # Errors
    /// - `EmptyName` when the name is blank after trimming.
    /// - `NameTooLong` when the name exceeds the length cap.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.name.trim().is_empty() {
            return Err(ItemValidationError::EmptyName);
        }
        let chars = self.name.chars().count();
        if chars > MAX_NAME_CHARS {
            return Err(ItemValidationError::NameTooLong {
                chars,
                max: MAX_NAME_CHARS,
            });
        }
        Ok(())
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, update: &ItemUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        self.due_date = update.due_date.apply(self.due_date);
        self.completion_date = update.completion_date.apply(self.completion_date);
    }
}

/// Update instruction for one optional date.
///
/// Absence of a value is ambiguous on its own ("keep" or "clear"), so the two
/// are separate variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateUpdate {
    #[default]
    Unchanged,
    Clear,
    Set(i64),
}

impl DateUpdate {
    pub fn apply(self, current: Option<i64>) -> Option<i64> {
        match self {
            Self::Unchanged => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }

    /// Maps a full-replacement value: `None` clears, `Some` sets.
    pub fn replace_with(value: Option<i64>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }
}

/// Partial update of an item's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    /// `None` keeps the current name.
    pub name: Option<String>,
    pub due_date: DateUpdate,
    pub completion_date: DateUpdate,
}

impl ItemUpdate {
    /// Renames the item and leaves both dates untouched.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Replaces every mutable field; absent dates are cleared.
    pub fn replace(
        name: impl Into<String>,
        due_date: Option<i64>,
        completion_date: Option<i64>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            due_date: DateUpdate::replace_with(due_date),
            completion_date: DateUpdate::replace_with(completion_date),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.name.is_none()
            && self.due_date == DateUpdate::Unchanged
            && self.completion_date == DateUpdate::Unchanged
    }
}
