//! Error taxonomy at the native boundary.
//!
//! Every error crosses the boundary as one owned UTF-8 string shaped
//! `<code>: <message>`, so the managed side can branch on `code` without
//! parsing prose.

use std::error::Error;
use std::fmt::{Display, Formatter};
use toodle_core::db::DbError;
use toodle_core::{ConfigError, ItemId, RepoError, ServiceError};

use crate::ctypes::StoreHandle;

pub type FfiResult<T> = Result<T, FfiError>;

#[derive(Debug)]
pub enum FfiError {
    NullArgument(&'static str),
    InvalidUtf8(&'static str),
    InvalidArgument(String),
    StoreClosed(StoreHandle),
    Config(ConfigError),
    Db(DbError),
    Validation(String),
    ItemNotFound(ItemId),
    LabelNotFound(String),
    /// A mutation was issued from inside a change callback of the same store.
    ReentrantMutation(StoreHandle),
    Internal(String),
    Panicked(&'static str),
}

impl FfiError {
    /// Stable machine-readable code sent ahead of the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NullArgument(_) => "null_argument",
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::StoreClosed(_) => "store_closed",
            Self::Config(_) => "config",
            Self::Db(_) => "storage",
            Self::Validation(_) => "validation",
            Self::ItemNotFound(_) => "item_not_found",
            Self::LabelNotFound(_) => "label_not_found",
            Self::ReentrantMutation(_) => "reentrant_mutation",
            Self::Internal(_) => "internal",
            Self::Panicked(_) => "panic",
        }
    }

    /// `<code>: <message>` form written into error envelopes.
    pub fn to_wire(&self) -> String {
        format!("{}: {self}", self.code())
    }
}

impl Display for FfiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NullArgument(name) => write!(f, "`{name}` must not be null"),
            Self::InvalidUtf8(name) => write!(f, "`{name}` is not valid UTF-8"),
            Self::InvalidArgument(message) => write!(f, "{message}"),
            Self::StoreClosed(handle) => write!(f, "store handle {} is closed", handle.0),
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::LabelNotFound(name) => write!(f, "label not found: {name}"),
            Self::ReentrantMutation(handle) => write!(
                f,
                "store handle {} cannot be mutated from inside its change callback",
                handle.0
            ),
            Self::Internal(message) => write!(f, "{message}"),
            Self::Panicked(entry) => write!(f, "`{entry}` panicked; the call had no effect"),
        }
    }
}

impl Error for FfiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for FfiError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for FfiError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for FfiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err.to_string()),
            RepoError::InvalidLabel(err) => Self::Validation(err.to_string()),
            RepoError::Db(err) => Self::Db(err),
            RepoError::NotFound(id) => Self::ItemNotFound(id),
            RepoError::LabelNotFound(name) => Self::LabelNotFound(name),
            RepoError::InvalidData(message) => Self::Internal(message),
        }
    }
}

impl From<ServiceError> for FfiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::ItemNotFound(id) => Self::ItemNotFound(id),
            ServiceError::Repo(err) => err.into(),
            ServiceError::InconsistentState(details) => Self::Internal(details.to_string()),
        }
    }
}
