//! Runs alone in its own test binary: logging is initialized once per
//! process.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use toodle_core::{default_log_level, logging_status};
use toodle_ffi::{toodle_init_logging, toodle_string_destroy};

fn take_status(status: *mut c_char) -> Option<String> {
    if status.is_null() {
        return None;
    }
    let message = unsafe { CStr::from_ptr(status) }.to_str().unwrap().to_string();
    unsafe { toodle_string_destroy(status) };
    Some(message)
}

#[test]
fn null_level_selects_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = CString::new(dir.path().to_str().unwrap()).unwrap();

    assert_eq!(take_status(unsafe { toodle_init_logging(ptr::null(), log_dir.as_ptr()) }), None);
    let (level, active_dir) = logging_status().unwrap();
    assert_eq!(level, default_log_level());
    assert_eq!(active_dir, dir.path());

    // Same configuration spelled out is accepted again.
    let explicit = CString::new(default_log_level()).unwrap();
    assert_eq!(
        take_status(unsafe { toodle_init_logging(explicit.as_ptr(), log_dir.as_ptr()) }),
        None
    );

    let message = take_status(unsafe { toodle_init_logging(ptr::null(), ptr::null()) }).unwrap();
    assert!(message.starts_with("null_argument: "), "{message}");
}
