//! Client error type and the mapping from native wire codes.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ClientResult<T> = Result<T, ClientError>;

/// Domain-level failure of a boundary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The store could not be opened; no handle exists.
    Open(String),
    /// The handle was closed before the call.
    Closed,
    /// Rejected input; retrying with corrected input can succeed.
    InvalidArgument(String),
    NotFound(String),
    /// Any other native failure, with its wire code.
    Native { code: String, message: String },
    /// A mutation succeeded but its change snapshot could not be read.
    SnapshotUnavailable,
    /// A secondary count disagreed with the authoritative one.
    CountMismatch { authoritative: usize, declared: usize },
    /// The native side broke the transfer contract (null field, bad UTF-8,
    /// envelope with neither value nor error).
    Contract(String),
}

impl ClientError {
    /// Maps a `<code>: <message>` native error string.
    pub(crate) fn from_wire(wire: &str) -> Self {
        let (code, message) = wire.split_once(": ").unwrap_or(("internal", wire));
        let message = message.to_string();
        match code {
            "store_closed" => Self::Closed,
            "null_argument" | "invalid_utf8" | "invalid_argument" | "validation" => {
                Self::InvalidArgument(message)
            }
            "item_not_found" | "label_not_found" => Self::NotFound(message),
            other => Self::Native {
                code: other.to_string(),
                message,
            },
        }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(message) => write!(f, "failed to open store: {message}"),
            Self::Closed => write!(f, "store is closed"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::NotFound(message) => write!(f, "{message}"),
            Self::Native { code, message } => write!(f, "native error `{code}`: {message}"),
            Self::SnapshotUnavailable => write!(f, "change snapshot unavailable"),
            Self::CountMismatch {
                authoritative,
                declared,
            } => write!(
                f,
                "collection declares {declared} items but carries {authoritative}"
            ),
            Self::Contract(message) => write!(f, "native contract violated: {message}"),
        }
    }
}

impl Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::ClientError;

    #[test]
    fn wire_codes_map_to_variants() {
        assert_eq!(
            ClientError::from_wire("store_closed: store handle 2 is closed"),
            ClientError::Closed
        );
        assert_eq!(
            ClientError::from_wire("validation: item name cannot be empty"),
            ClientError::InvalidArgument("item name cannot be empty".to_string())
        );
        assert_eq!(
            ClientError::from_wire("storage: disk I/O error"),
            ClientError::Native {
                code: "storage".to_string(),
                message: "disk I/O error".to_string()
            }
        );
        assert!(matches!(
            ClientError::from_wire("no code here"),
            ClientError::Native { code, .. } if code == "internal"
        ));
    }
}
