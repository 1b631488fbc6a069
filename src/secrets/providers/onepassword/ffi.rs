//! Direct FFI bindings to the 1Password SDK core library.
//!
//! The SDK core is a UniFFI library (`libop_uniffi_core`). We load it at
//! runtime and speak its JSON invocation protocol, which is enough to
//! authenticate a service account and resolve `op://` secret references.

use serde::Serialize;
use std::env;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SdkError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// UniFFI Types
// ============================================================================

/// UniFFI RustBuffer - used for passing data across FFI boundary
#[repr(C)]
#[derive(Debug)]
struct RustBuffer {
    capacity: i32,
    len: i32,
    data: *mut u8,
}

/// UniFFI ForeignBytes - used to pass byte data to the SDK for buffer creation
#[repr(C)]
#[derive(Debug)]
struct ForeignBytes {
    len: i32,
    data: *const u8,
}

type RustBufferFromBytesFn = unsafe extern "C" fn(ForeignBytes, *mut RustCallStatus) -> RustBuffer;

impl RustBuffer {
    fn empty() -> Self {
        Self {
            capacity: 0,
            len: 0,
            data: std::ptr::null_mut(),
        }
    }

    /// Raw UTF-8 contents (UniFFI strings carry no length prefix).
    fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).to_string()
    }

    fn to_bytes(&self) -> Vec<u8> {
        if self.data.is_null() || self.len <= 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize).to_vec() }
    }
}

/// Allocate a RustBuffer holding `s` with the SDK's allocator.
fn rustbuffer_from_str(s: &str, from_bytes_fn: RustBufferFromBytesFn) -> Result<RustBuffer, SdkError> {
    let bytes = s.as_bytes();
    let foreign_bytes = ForeignBytes {
        len: i32::try_from(bytes.len()).map_err(|_| "SDK payload too large")?,
        data: bytes.as_ptr(),
    };

    let mut status = RustCallStatus::new();
    let buf = unsafe { from_bytes_fn(foreign_bytes, &mut status) };
    if let Some(err) = status.error() {
        return Err(format!("Failed to allocate RustBuffer: {}", err).into());
    }

    Ok(buf)
}

/// UniFFI RustCallStatus - used for error reporting
#[repr(C)]
#[derive(Debug)]
struct RustCallStatus {
    code: i8,
    error_buf: RustBuffer,
}

impl RustCallStatus {
    fn new() -> Self {
        Self {
            code: 0,
            error_buf: RustBuffer::empty(),
        }
    }

    /// `None` on success, otherwise the best message we can decode.
    fn error(&self) -> Option<String> {
        if self.code == 0 {
            return None;
        }

        // Serialized Error enum: i32 variant + i32 length (big-endian) + UTF-8 bytes
        let bytes = self.error_buf.to_bytes();
        if bytes.len() >= 8 {
            let str_len = i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            let end = usize::try_from(str_len).ok().and_then(|n| n.checked_add(8));
            if let Some(message) = end.and_then(|end| bytes.get(8..end)) {
                return Some(String::from_utf8_lossy(message).to_string());
            }
        }

        // Panics carry a bare string
        let msg = self.error_buf.to_text();
        if !msg.is_empty() {
            return Some(msg);
        }

        Some(match self.code {
            1 => "SDK error (no details)".to_string(),
            2 => "SDK panic (no details)".to_string(),
            code => format!("Unknown error code: {}", code),
        })
    }
}

// ============================================================================
// SDK Invocation Types
// ============================================================================

/// Client configuration for initialization, in the shape the SDK core expects.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientConfig {
    service_account_token: String,
    programming_language: String,
    sdk_version: String,
    integration_name: String,
    integration_version: String,
    request_library_name: String,
    request_library_version: String,
    os: String,
    os_version: String,
    architecture: String,
}

#[derive(Serialize)]
struct Invocation {
    invocation: InvocationInner,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvocationInner {
    client_id: u64,
    parameters: InvocationParameters,
}

#[derive(Serialize)]
struct InvocationParameters {
    name: String,
    parameters: serde_json::Value,
}

// ============================================================================
// FFI Library Interface
// ============================================================================

type InitClientFn = unsafe extern "C" fn(RustBuffer) -> *mut std::ffi::c_void;
type InvokeSyncFn = unsafe extern "C" fn(RustBuffer, *mut RustCallStatus) -> RustBuffer;
type RustBufferFreeFn = unsafe extern "C" fn(RustBuffer, *mut RustCallStatus);
type FuturePollFn = unsafe extern "C" fn(*mut std::ffi::c_void, extern "C" fn(usize, i8), usize);
type FutureCompleteFn =
    unsafe extern "C" fn(*mut std::ffi::c_void, *mut RustCallStatus) -> RustBuffer;
type FutureFreeFn = unsafe extern "C" fn(*mut std::ffi::c_void);

/// 1Password SDK client with direct FFI access
pub struct OnePasswordSdkClient {
    client_id: u64,
    _library: Arc<libloading::Library>,
    invoke_sync_fn: InvokeSyncFn,
    rustbuffer_free_fn: RustBufferFreeFn,
    rustbuffer_from_bytes_fn: RustBufferFromBytesFn,
}

// SAFETY: the SDK core synchronizes internally; we additionally only use the
// client behind a mutex (see SharedSdkClient).
unsafe impl Send for OnePasswordSdkClient {}
unsafe impl Sync for OnePasswordSdkClient {}

impl OnePasswordSdkClient {
    /// Load the SDK core and authenticate with a service account token.
    /// Blocks until the SDK finishes its (network-bound) initialization.
    pub fn connect(token: &str) -> Result<Self, SdkError> {
        let library = Arc::new(Self::load_library()?);

        let init_client_fn: libloading::Symbol<InitClientFn> =
            unsafe { library.get(b"uniffi_op_uniffi_core_fn_func_init_client\0")? };
        let invoke_sync_fn: libloading::Symbol<InvokeSyncFn> =
            unsafe { library.get(b"uniffi_op_uniffi_core_fn_func_invoke_sync\0")? };
        let rustbuffer_free_fn: libloading::Symbol<RustBufferFreeFn> =
            unsafe { library.get(b"ffi_op_uniffi_core_rustbuffer_free\0")? };
        let rustbuffer_from_bytes_fn: libloading::Symbol<RustBufferFromBytesFn> =
            unsafe { library.get(b"ffi_op_uniffi_core_rustbuffer_from_bytes\0")? };
        let future_poll_fn: libloading::Symbol<FuturePollFn> =
            unsafe { library.get(b"ffi_op_uniffi_core_rust_future_poll_rust_buffer\0")? };
        let future_complete_fn: libloading::Symbol<FutureCompleteFn> =
            unsafe { library.get(b"ffi_op_uniffi_core_rust_future_complete_rust_buffer\0")? };
        let future_free_fn: libloading::Symbol<FutureFreeFn> =
            unsafe { library.get(b"ffi_op_uniffi_core_rust_future_free_rust_buffer\0")? };

        // SDK version format: major * 10000 + minor * 100 + patch, 7 digits
        let config = ClientConfig {
            service_account_token: token.trim().to_string(),
            programming_language: "Rust".to_string(),
            sdk_version: "0030201".to_string(),
            integration_name: "denv".to_string(),
            integration_version: env!("CARGO_PKG_VERSION").to_string(),
            request_library_name: "reqwest".to_string(),
            request_library_version: "0.12".to_string(),
            os: std::env::consts::OS.to_string(),
            os_version: "0.0.0".to_string(),
            architecture: std::env::consts::ARCH.to_string(),
        };

        let config_json = serde_json::to_string(&config)?;
        let config_buf = rustbuffer_from_str(&config_json, *rustbuffer_from_bytes_fn)?;

        let future_handle = unsafe { init_client_fn(config_buf) };
        if future_handle.is_null() {
            return Err("Failed to initialize 1Password client: null future".into());
        }

        let result_buf = Self::poll_future_blocking(
            future_handle,
            *future_poll_fn,
            *future_complete_fn,
            *future_free_fn,
        )?;

        let result_str = result_buf.to_text();
        let mut status = RustCallStatus::new();
        unsafe { rustbuffer_free_fn(result_buf, &mut status) };

        // The client ID comes back as a plain integer string
        let client_id: u64 = result_str.trim().parse().map_err(|e| {
            format!(
                "Failed to parse client ID: {}. Raw response: '{}'",
                e, result_str
            )
        })?;

        // SAFETY: the library is kept alive in the Arc, so pointers stay valid
        Ok(Self {
            client_id,
            invoke_sync_fn: *invoke_sync_fn,
            rustbuffer_free_fn: *rustbuffer_free_fn,
            rustbuffer_from_bytes_fn: *rustbuffer_from_bytes_fn,
            _library: library,
        })
    }

    /// Poll a UniFFI async future to completion (blocking)
    fn poll_future_blocking(
        future_handle: *mut std::ffi::c_void,
        poll_fn: FuturePollFn,
        complete_fn: FutureCompleteFn,
        free_fn: FutureFreeFn,
    ) -> Result<RustBuffer, SdkError> {
        use std::sync::Arc as StdArc;
        use std::sync::atomic::{AtomicI8, Ordering};

        let poll_result = StdArc::new(AtomicI8::new(-1));
        let poll_result_ptr = StdArc::into_raw(StdArc::clone(&poll_result)) as usize;

        extern "C" fn continuation_callback(data: usize, poll_code: i8) {
            let poll_result = unsafe { StdArc::from_raw(data as *const AtomicI8) };
            poll_result.store(poll_code, Ordering::SeqCst);
            // Ownership stays with the poll loop
            let _ = StdArc::into_raw(poll_result);
        }

        loop {
            poll_result.store(-1, Ordering::SeqCst);
            unsafe { poll_fn(future_handle, continuation_callback, poll_result_ptr) };

            let mut attempts = 0;
            while poll_result.load(Ordering::SeqCst) == -1 {
                std::thread::sleep(std::time::Duration::from_micros(100));
                attempts += 1;
                if attempts > 300_000 {
                    // 30 second timeout
                    unsafe { free_fn(future_handle) };
                    unsafe { StdArc::from_raw(poll_result_ptr as *const AtomicI8) };
                    return Err("Timeout waiting for 1Password SDK response".into());
                }
            }

            // 0 = READY, 1 = MAYBE_READY (poll again)
            if poll_result.load(Ordering::SeqCst) == 0 {
                break;
            }
        }

        unsafe { StdArc::from_raw(poll_result_ptr as *const AtomicI8) };

        let mut status = RustCallStatus::new();
        let result = unsafe { complete_fn(future_handle, &mut status) };
        unsafe { free_fn(future_handle) };

        if let Some(err) = status.error() {
            return Err(format!("1Password SDK error: {}", err).into());
        }

        Ok(result)
    }

    fn load_library() -> Result<libloading::Library, SdkError> {
        let lib_name = if cfg!(target_os = "macos") {
            "libop_uniffi_core.dylib"
        } else {
            "libop_uniffi_core.so"
        };

        // Explicit location wins; it may name the file or its directory
        if let Ok(path) = env::var("ONEPASSWORD_LIB_PATH") {
            let candidates = if path.ends_with(".so") || path.ends_with(".dylib") {
                vec![path.clone()]
            } else {
                vec![format!("{}/{}", path, lib_name), path.clone()]
            };

            for candidate in &candidates {
                if let Ok(lib) = unsafe { libloading::Library::new(candidate) } {
                    return Ok(lib);
                }
            }
        }

        let target_paths = [
            format!("target/release/{}", lib_name),
            format!("target/debug/{}", lib_name),
        ];
        for path in &target_paths {
            if let Ok(lib) = unsafe { libloading::Library::new(path) } {
                return Ok(lib);
            }
        }

        // System library search path
        if let Ok(lib) = unsafe { libloading::Library::new(lib_name) } {
            return Ok(lib);
        }

        Err(format!(
            "Could not find {}. Set ONEPASSWORD_LIB_PATH environment variable.",
            lib_name
        )
        .into())
    }

    /// Invoke an SDK operation synchronously
    fn invoke(&self, name: &str, parameters: serde_json::Value) -> Result<String, SdkError> {
        let invocation = Invocation {
            invocation: InvocationInner {
                client_id: self.client_id,
                parameters: InvocationParameters {
                    name: name.to_string(),
                    parameters,
                },
            },
        };

        let json = serde_json::to_string(&invocation)?;
        let buf = rustbuffer_from_str(&json, self.rustbuffer_from_bytes_fn)?;

        let mut status = RustCallStatus::new();
        let result_buf = unsafe { (self.invoke_sync_fn)(buf, &mut status) };

        if let Some(err) = status.error() {
            return Err(format!("1Password SDK error: {}", err).into());
        }

        let result = result_buf.to_text();
        let mut free_status = RustCallStatus::new();
        unsafe { (self.rustbuffer_free_fn)(result_buf, &mut free_status) };

        Ok(result)
    }

    /// Resolve a secret reference (op://vault/item/field)
    pub fn resolve_secret(&self, reference: &str) -> Result<String, SdkError> {
        let response = self.invoke(
            "SecretsResolve",
            serde_json::json!({ "secret_reference": reference }),
        )?;
        Ok(decode_resolved(response))
    }
}

/// The SDK answers either with a JSON string, a `{"secret": ..}` object, or
/// the bare value.
fn decode_resolved(response: String) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&response) {
        if let Some(secret) = value.get("secret").and_then(|s| s.as_str()) {
            return secret.to_string();
        }
        if let Some(secret) = value.as_str() {
            return secret.to_string();
        }
    }
    response
}

// ============================================================================
// Thread-safe Wrapper
// ============================================================================

/// Thread-safe handle that serializes calls into the SDK and keeps them off
/// the async worker threads.
#[derive(Clone)]
pub struct SharedSdkClient {
    inner: Arc<Mutex<OnePasswordSdkClient>>,
}

impl SharedSdkClient {
    pub fn new(client: OnePasswordSdkClient) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub async fn resolve_secret(&self, reference: &str) -> Result<String, SdkError> {
        let inner = Arc::clone(&self.inner);
        let reference = reference.to_string();
        tokio::task::spawn_blocking(move || {
            let client = inner.blocking_lock();
            client.resolve_secret(&reference)
        })
        .await
        .map_err(|e| -> SdkError { format!("1Password SDK task failed: {}", e).into() })?
    }
}
