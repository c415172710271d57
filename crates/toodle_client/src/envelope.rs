//! Decoding of native `ResultC` envelopes.

use std::ffi::CStr;
use std::ptr;

use toodle_ffi::{toodle_string_destroy, NullableValue, ResultC};

use crate::error::{ClientError, ClientResult};

/// Owned view of one native success-or-error envelope.
///
/// The error field is read first; when it is set the value is ignored. The
/// error string is released whether or not the envelope is consumed.
///
/// The payload type is opaque here, so dropping an unconsumed success
/// envelope cannot release it. Envelopes are only built inside this crate,
/// by calls that consume them with [`ResultEnvelope::into_result`] at once.
pub struct ResultEnvelope<T: NullableValue> {
    raw: ResultC<T>,
}

impl<T: NullableValue> ResultEnvelope<T> {
    pub(crate) fn new(raw: ResultC<T>) -> Self {
        Self { raw }
    }

    pub fn is_error(&self) -> bool {
        !self.raw.error.is_null()
    }

    /// Converts into the payload, or into the native error.
    ///
    /// On success the payload is owned by the caller from here on.
    pub fn into_result(mut self) -> ClientResult<T> {
        let error = std::mem::replace(&mut self.raw.error, ptr::null_mut());
        if !error.is_null() {
            let message = unsafe { CStr::from_ptr(error) }
                .to_string_lossy()
                .into_owned();
            unsafe { toodle_string_destroy(error) };
            return Err(ClientError::from_wire(&message));
        }
        if self.raw.value.is_null_value() {
            return Err(ClientError::Contract(
                "envelope carried neither a value nor an error".to_string(),
            ));
        }
        Ok(self.raw.value)
    }
}

impl<T: NullableValue> Drop for ResultEnvelope<T> {
    fn drop(&mut self) {
        if !self.raw.error.is_null() {
            unsafe { toodle_string_destroy(self.raw.error) };
        }
    }
}

/// Converts a status string (null on success) into a result.
pub(crate) fn status_to_result(status: *mut std::ffi::c_char) -> ClientResult<()> {
    if status.is_null() {
        return Ok(());
    }
    let message = unsafe { CStr::from_ptr(status) }
        .to_string_lossy()
        .into_owned();
    unsafe { toodle_string_destroy(status) };
    Err(ClientError::from_wire(&message))
}
