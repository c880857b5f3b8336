//! C ABI entry points.
//!
//! Lets compiled programs call the fetch through a plain C symbol. Buffers
//! handed out here must be released with [`fetchbuf_free`].

use std::ffi::{CStr, c_char};

use crate::accumulator::Body;
use crate::fetch::Fetcher;
use crate::transport::Request;

/// Fetch `url` with `method`, sending `body` when non-null and non-empty.
///
/// Never returns null. The returned buffer holds the response body followed
/// by a NUL byte; its body length (without the NUL) is written to `out_len`
/// when `out_len` is non-null. Any failure, including a null or non-UTF-8
/// method or URL, yields an empty buffer.
///
/// # Safety
///
/// `method`, `url` and `body` must each be null or point to a NUL-terminated
/// string. `out_len` must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fetchbuf_http_fetch(
    method: *const c_char,
    url: *const c_char,
    body: *const c_char,
    out_len: *mut usize,
) -> *mut u8 {
    let request = unsafe { request_from_raw(method, url, body) };
    let result = request
        .map(|request| Fetcher::new().fetch(&request))
        .unwrap_or_else(Body::empty);

    if !out_len.is_null() {
        unsafe { *out_len = result.len() };
    }
    Box::into_raw(result.into_boxed_with_nul()).cast::<u8>()
}

/// Release a buffer returned by [`fetchbuf_http_fetch`]. Null is a no-op.
///
/// # Safety
///
/// `ptr` must come from [`fetchbuf_http_fetch`] with the same `len` it
/// reported, and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fetchbuf_free(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len + 1);
    drop(unsafe { Box::from_raw(slice) });
}

unsafe fn request_from_raw(
    method: *const c_char,
    url: *const c_char,
    body: *const c_char,
) -> Option<Request> {
    let method = unsafe { c_str(method) }?.to_str().ok()?;
    let url = unsafe { c_str(url) }?.to_str().ok()?;
    let request = Request::new(method, url);
    Some(match unsafe { c_str(body) } {
        Some(body) => request.body(body.to_bytes()),
        None => request,
    })
}

unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) })
    }
}
