//! Store location and connection settings.
//!
//! # Responsibility
//! - Turn the caller-supplied path string into a store location.
//! - Carry connection tuning that the FFI layer does not expose.
//!
//! # Invariants
//! - Paths are opaque: they are never parsed beyond the in-memory marker.
//! - An empty path never reaches SQLite.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name used when a store is opened from a directory.
pub const DEFAULT_STORE_FILE_NAME: &str = "toodle.db";
/// Path string that selects a transient in-memory store.
pub const MEMORY_STORE_PATH: &str = ":memory:";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "store path cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    /// Short label used in log lines; never includes the path itself.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Settings used to open one store connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Builds a config from the raw path handed over the boundary.
    ///
    /// `":memory:"` selects an in-memory store; any other non-empty string is
    /// used as a file path as-is.
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        let location = if path == MEMORY_STORE_PATH {
            StoreLocation::Memory
        } else {
            StoreLocation::File(PathBuf::from(path))
        };
        Ok(Self {
            location,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        })
    }

    /// Places the store file under `dir` using the default file name.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            location: StoreLocation::File(dir.as_ref().join(DEFAULT_STORE_FILE_NAME)),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}
