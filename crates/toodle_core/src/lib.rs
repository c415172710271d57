//! Native item store for Toodle.
//!
//! This crate owns storage, domain invariants and logging; the FFI crate only
//! marshals values across the boundary.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig, StoreLocation, DEFAULT_STORE_FILE_NAME};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{DateUpdate, Item, ItemId, ItemUpdate, ItemValidationError};
pub use model::label::{Label, LabelValidationError};
pub use repo::item_repo::{ItemRepository, RepoError, RepoResult, SqliteItemRepository};
pub use repo::label_repo::{LabelRepository, SqliteLabelRepository};
pub use service::item_service::{ItemService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
