//! Owned store handle.
//!
//! # Invariants
//! - Holds at most one native handle; closing releases it exactly once.
//! - After close, `id()` fails with `ClientError::Closed`; the stale id is
//!   never sent to the native side again.

use log::debug;
use std::ffi::CString;

use toodle_ffi::{toodle_destroy, toodle_open, StoreHandle};

use crate::envelope::ResultEnvelope;
use crate::error::{ClientError, ClientResult};

#[derive(Debug)]
pub struct Handle {
    id: Option<StoreHandle>,
}

impl Handle {
    /// Opens the store at `path`; the path is passed through untouched.
    pub fn open(path: &str) -> ClientResult<Self> {
        let path = CString::new(path)
            .map_err(|_| ClientError::InvalidArgument("path contains a NUL byte".to_string()))?;
        let id = ResultEnvelope::new(unsafe { toodle_open(path.as_ptr()) })
            .into_result()
            .map_err(|err| ClientError::Open(err.to_string()))?;
        debug!("event=handle_open module=client status=ok handle={}", id.0);
        Ok(Self { id: Some(id) })
    }

    /// The native id, or `Closed` once the handle is closed.
    pub fn id(&self) -> ClientResult<StoreHandle> {
        self.id.ok_or(ClientError::Closed)
    }

    pub fn is_open(&self) -> bool {
        self.id.is_some()
    }

    /// Releases the native store. Returns `true` only for the call that
    /// actually closed it.
    pub fn close(&mut self) -> bool {
        match self.id.take() {
            Some(id) => {
                let closed = toodle_destroy(id);
                debug!(
                    "event=handle_close module=client status={} handle={}",
                    if closed { "ok" } else { "already_closed" },
                    id.0
                );
                closed
            }
            None => false,
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}
