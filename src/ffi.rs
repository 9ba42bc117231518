//! FFI bindings for rigcast
//!
//! This module provides C-compatible functions so a frame-delivery graph
//! written in C or C++ can hand each frame to rigcast. Frames cross the
//! boundary as JSON `FrameInput` objects. All strings are null-terminated;
//! strings returned by rigcast must be freed with `rigcast_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use crate::config::Config;
use crate::encoder::FrameEncoder;
use crate::error::RigcastError;
use crate::pipeline::{Delivery, FrameProcessor};
use crate::profile::CalibrationProfile;
use crate::types::FrameInput;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Load a profile from an optional JSON C string; NULL means built-in
unsafe fn profile_from_ptr(profile_json: *const c_char) -> Result<CalibrationProfile, RigcastError> {
    if profile_json.is_null() {
        return Ok(CalibrationProfile::builtin());
    }
    match cstr_to_string(profile_json) {
        Some(json) => CalibrationProfile::from_json(&json),
        None => Err(RigcastError::InvalidProfile(
            "profile JSON is not valid UTF-8".to_string(),
        )),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Encode one frame (JSON `FrameInput`) into a wire record JSON string.
///
/// # Safety
/// - `frame_json` must be a valid null-terminated C string.
/// - `profile_json` must be NULL (built-in profile) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rigcast_free_string`.
/// - Returns NULL on error; call `rigcast_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rigcast_encode_frame(
    frame_json: *const c_char,
    profile_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let frame_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame JSON string pointer");
            return ptr::null_mut();
        }
    };

    let profile = match profile_from_ptr(profile_json) {
        Ok(p) => p,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<FrameInput>(&frame_str)
        .map_err(RigcastError::from)
        .and_then(|frame| FrameEncoder::new(Arc::new(profile)).encode_to_json(&frame));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a FrameProcessor and its UDP socket
pub struct RigcastProcessorHandle {
    processor: FrameProcessor,
}

/// Open a processor sending to `host:port`.
///
/// # Safety
/// - `host` must be NULL (loopback) or a valid null-terminated C string.
/// - `profile_json` must be NULL (built-in profile) or a valid null-terminated C string.
/// - `port` of 0 selects the default port.
/// - Returns a pointer that must be freed with `rigcast_processor_free`.
/// - Returns NULL on error; call `rigcast_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rigcast_processor_new(
    host: *const c_char,
    port: u16,
    profile_json: *const c_char,
) -> *mut RigcastProcessorHandle {
    clear_last_error();

    let mut config = Config::default();
    if !host.is_null() {
        match cstr_to_string(host) {
            Some(h) => config.transport.host = h,
            None => {
                set_last_error("Invalid host string pointer");
                return ptr::null_mut();
            }
        }
    }
    if port != 0 {
        config.transport.port = port;
    }

    let result = profile_from_ptr(profile_json)
        .and_then(|profile| FrameProcessor::with_profile(&config, Arc::new(profile)));

    match result {
        Ok(processor) => Box::into_raw(Box::new(RigcastProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor and close its socket.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rigcast_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rigcast_processor_free(processor: *mut RigcastProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Encode and send one frame.
///
/// Returns 0 when the datagram was sent, 1 when the frame was dropped by the
/// transport (see `rigcast_last_error`), and -1 for invalid arguments or
/// unparseable frame JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rigcast_processor_new`.
/// - `frame_json` must be a valid null-terminated C string.
/// - The handle may be shared between threads; sends are serialized.
#[no_mangle]
pub unsafe extern "C" fn rigcast_processor_process(
    processor: *const RigcastProcessorHandle,
    frame_json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &*processor;

    let frame_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame JSON string pointer");
            return -1;
        }
    };

    let frame: FrameInput = match serde_json::from_str(&frame_str) {
        Ok(f) => f,
        Err(e) => {
            set_last_error(&RigcastError::from(e).to_string());
            return -1;
        }
    };

    match handle.processor.process(&frame).delivery {
        Delivery::Sent { .. } => 0,
        Delivery::Dropped { reason } => {
            set_last_error(&reason);
            1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by rigcast functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a rigcast function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rigcast_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next rigcast function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rigcast_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the rigcast library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rigcast_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn face_frame_json() -> CString {
        let face: Vec<serde_json::Value> = (0..478)
            .map(|_| serde_json::json!({"x": 0.6, "y": 0.4, "z": 0.1}))
            .collect();
        CString::new(
            serde_json::json!({
                "face": face,
                "resolution": {"x": 1920, "y": 1080}
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_encode_frame() {
        let frame = face_frame_json();

        unsafe {
            let result = rigcast_encode_frame(frame.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let record: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(record["Res"]["y"], 1080);
            assert_eq!(record["Face"][0]["pos"]["y"], 0.0563);
            assert!(record["BlendShape"].is_null());

            rigcast_free_string(result);
        }
    }

    #[test]
    fn test_ffi_encode_with_custom_profile() {
        let frame = CString::new(
            r#"{"blendshapes": [{"score": 0.0}, {"score": 0.25}, {"score": 0.75}]}"#,
        )
        .unwrap();
        let profile = CString::new(
            r#"{"name": "two", "version": 1, "scale": [1, 1], "offset": [0, 0], "swap_pairs": [[0, 1]]}"#,
        )
        .unwrap();

        unsafe {
            let result = rigcast_encode_frame(frame.as_ptr(), profile.as_ptr());
            assert!(!result.is_null());
            let record: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(record["BlendShape"], serde_json::json!([0.75, 0.25]));
            rigcast_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = rx.local_addr().unwrap().port();
        let host = CString::new("127.0.0.1").unwrap();

        unsafe {
            let processor = rigcast_processor_new(host.as_ptr(), port, ptr::null());
            assert!(!processor.is_null());

            let frame = face_frame_json();
            assert_eq!(rigcast_processor_process(processor, frame.as_ptr()), 0);

            let bad = CString::new("not json").unwrap();
            assert_eq!(rigcast_processor_process(processor, bad.as_ptr()), -1);
            assert!(!rigcast_last_error().is_null());

            rigcast_processor_free(processor);
        }

        let mut buf = vec![0u8; 65_536];
        let len = rx.recv(&mut buf).unwrap();
        let record: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(record["Face"].as_array().map(Vec::len), Some(43));
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = rigcast_encode_frame(invalid_json.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = rigcast_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let frame = CString::new("{}").unwrap();
            let bad_profile = CString::new(r#"{"name": "x", "version": 1, "scale": [], "offset": []}"#).unwrap();
            assert!(rigcast_encode_frame(frame.as_ptr(), bad_profile.as_ptr()).is_null());

            assert_eq!(rigcast_processor_process(ptr::null(), frame.as_ptr()), -1);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = rigcast_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
