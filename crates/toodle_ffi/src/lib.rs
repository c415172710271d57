//! C ABI for the Toodle item store.
//!
//! # Safety
//!
//! All `extern "C"` functions share one contract: pointer arguments are
//! either null or valid for the duration of the call, and strings are
//! NUL-terminated UTF-8. Null is reported as a `null_argument` error, never
//! dereferenced. Returned pointers must be released with their matching
//! `*_destroy` function.
#![allow(clippy::missing_safety_doc)]

pub mod api;
mod arena;
pub mod ctypes;
pub mod error;
mod ledger;
pub mod observers;
mod store;

pub use api::*;
pub use ctypes::{
    ItemC, ItemListC, LabelC, LabelListC, NullableValue, ResultC, StoreHandle, SubscriptionId,
};
pub use error::{FfiError, FfiResult};
pub use observers::{DropContextCallback, ItemsCallback};
