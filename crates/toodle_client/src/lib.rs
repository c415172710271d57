//! Safe Rust binding over the Toodle C ABI.
//!
//! This is the managed side of the boundary: every native allocation it
//! receives is owned by exactly one guard and released exactly once, and
//! every native error is turned into a `ClientError` right where it
//! crosses back.

mod client;
mod collection;
mod envelope;
mod error;
mod handle;
mod notifier;
mod record;

pub use client::StoreClient;
pub use collection::ItemCollection;
pub use envelope::ResultEnvelope;
pub use error::{ClientError, ClientResult};
pub use handle::Handle;
pub use notifier::{ChangeCallback, ChangeNotifier, Subscription};
pub use record::ItemRecord;
pub use toodle_core::{DateUpdate, Item, ItemId, ItemUpdate, Label};
