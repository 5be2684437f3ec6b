//! Wire error taxonomy.
//!
//! Every crate's error enum implements a `to_wire(&self) -> ErrorDetail`
//! method rather than participating in an object-safe "structured error"
//! trait, so each error sum type converts to the wire shape uniformly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Timeout,
    Config,
    Capability,
    Validation,
    Exec,
    Panic,
    Internal,
}

/// A structured, wire-stable error, optionally wrapping a lower-level
/// cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped: Option<Box<ErrorDetail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default)]
    pub is_timeout: bool,
    #[serde(default)]
    pub is_not_found: bool,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            wrapped: None,
            stack: None,
            is_timeout: false,
            is_not_found: false,
        }
    }

    pub fn wrapping(mut self, cause: ErrorDetail) -> Self {
        self.wrapped = Some(Box::new(cause));
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_timeout: true,
            ..Self::new(ErrorKind::Timeout, code, message)
        }
    }

    pub fn capability(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Capability, "capability_denied", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, "validation_failed", message)
    }

    pub fn panic(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panic, "plugin_panic", message).with_stack(stack)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, "internal", message)
    }
}
