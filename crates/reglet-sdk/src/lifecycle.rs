//! Export wrappers for the two guest ABI entry points: `manifest()` and
//! `observe(ptr, len)`.
//!
//! Both wrap the plugin author's code with panic recovery, error
//! normalization, and timestamp backfill, and both return a single packed
//! `i64`.

use crate::alloc::release_all;
use crate::context::with_context;
use crate::errors::normalize;
use chrono::Utc;
use reglet_abi::{check_size, pack, read_bytes, write_bytes, DEFAULT_MAX_REQUEST_BYTES};
use reglet_types::{ContextEnvelope, ErrorDetail, Manifest, Outcome, Status};
use std::panic::AssertUnwindSafe;

/// What a plugin's `Check` callback returns. `timestamp` is optional here
/// — the export wrapper backfills it with the current instant if the
/// plugin didn't set one.
pub struct CheckResult {
    pub status: Status,
    pub message: String,
    pub data: Option<std::collections::BTreeMap<String, serde_json::Value>>,
    pub timestamp: Option<chrono::DateTime<Utc>>,
}

impl CheckResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            data: None,
            timestamp: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            message: message.into(),
            data: None,
            timestamp: None,
        }
    }

    pub fn with_data(mut self, data: std::collections::BTreeMap<String, serde_json::Value>) -> Self {
        self.data = Some(data);
        self
    }

    fn into_outcome(self) -> Outcome {
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);
        Outcome {
            status: self.status,
            message: self.message,
            data: self.data,
            error: None,
            timestamp,
        }
    }
}

/// A plugin: self-describes via `manifest()` and answers `check` calls.
pub trait Plugin {
    fn manifest(&self) -> Manifest;
    fn check(
        &self,
        config: serde_json::Value,
        context: ContextEnvelope,
    ) -> Result<CheckResult, Box<dyn std::error::Error>>;
}

/// Encode `manifest`, write it into guest memory via `alloc`, and return
/// the packed pointer. `alloc` is the guest's own `allocate` export,
/// threaded in by the binary crate that links this SDK (it cannot be
/// called recursively from inside the export it implements).
pub fn run_manifest<P: Plugin>(plugin: &P, memory: &mut [u8], alloc: impl Fn(u32) -> u32) -> i64 {
    let mut manifest = plugin.manifest();
    manifest
        .sdk_version
        .get_or_insert_with(|| env!("CARGO_PKG_VERSION").to_string());
    let encoded = match serde_json::to_vec(&manifest) {
        Ok(bytes) => bytes,
        Err(_) => return 0,
    };
    write_response(memory, alloc, &encoded)
}

/// Decode the request at `(ptr, len)`, run `plugin.check` with panic
/// recovery and error normalization, encode the resulting `Outcome`, write
/// it via `alloc`, and return the packed pointer.
pub fn run_observe<P: Plugin>(
    plugin: &P,
    memory: &mut [u8],
    ptr: u32,
    len: u32,
    alloc: impl Fn(u32) -> u32,
) -> i64 {
    if check_size(len as usize, DEFAULT_MAX_REQUEST_BYTES).is_err() {
        let outcome = Outcome::error(ErrorDetail::validation("request exceeds maximum size"));
        return write_outcome(memory, alloc, &outcome);
    }

    let request_bytes = match read_bytes(memory, ptr, len) {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => return write_outcome(memory, alloc, &Outcome::error(ErrorDetail::internal(e.to_string()))),
    };

    let envelope: RequestEnvelope = match serde_json::from_slice(&request_bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            return write_outcome(
                memory,
                alloc,
                &Outcome::error(ErrorDetail::validation(format!("invalid request JSON: {e}"))),
            )
        }
    };

    let context = envelope.context.clone().unwrap_or_default();
    let config = envelope.config;

    let outcome = with_context(context.clone(), || {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| plugin.check(config, context)));
        match result {
            Ok(Ok(check_result)) => check_result.into_outcome(),
            Ok(Err(err)) => Outcome::error(normalize(err.as_ref())),
            Err(panic_payload) => {
                let message = panic_message(&panic_payload);
                let detail = ErrorDetail::panic(
                    format!("plugin panic: {message}"),
                    std::backtrace::Backtrace::force_capture().to_string(),
                );
                release_all();
                Outcome::error(detail)
            }
        }
    });

    write_outcome(memory, alloc, &outcome)
}

#[derive(serde::Deserialize)]
struct RequestEnvelope {
    #[serde(default)]
    context: Option<ContextEnvelope>,
    #[serde(default = "serde_json::Value::default")]
    config: serde_json::Value,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn write_outcome(memory: &mut [u8], alloc: impl Fn(u32) -> u32, outcome: &Outcome) -> i64 {
    match serde_json::to_vec(outcome) {
        Ok(bytes) => write_response(memory, alloc, &bytes),
        Err(_) => 0,
    }
}

fn write_response(memory: &mut [u8], alloc: impl Fn(u32) -> u32, bytes: &[u8]) -> i64 {
    let ptr = alloc(bytes.len() as u32);
    if write_bytes(memory, ptr, bytes).is_err() {
        return 0;
    }
    pack(ptr, bytes.len() as u32)
}
