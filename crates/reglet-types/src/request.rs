//! Typed requests the policy engine authorizes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemRequest {
    pub path: String,
    pub operation: FileOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRequest {
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyValueOperation {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueRequest {
    pub key: String,
    pub operation: KeyValueOperation,
}

/// A typed authorization request against a `GrantSet`, one variant per
/// capability kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRequest {
    Network(NetworkRequest),
    FileSystem(FileSystemRequest),
    Environment(EnvironmentRequest),
    Exec(ExecRequest),
    KeyValue(KeyValueRequest),
}

impl PolicyRequest {
    /// The capability-category name this request is checked against, used
    /// in denial-handler and diagnostic messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyRequest::Network(_) => "network",
            PolicyRequest::FileSystem(_) => "fs",
            PolicyRequest::Environment(_) => "env",
            PolicyRequest::Exec(_) => "exec",
            PolicyRequest::KeyValue(_) => "kv",
        }
    }

    /// A short human description of the request, e.g. for the prompter's
    /// `Plugin Request: <desc>` line.
    pub fn describe(&self) -> String {
        match self {
            PolicyRequest::Network(r) => format!("network outbound:{}:{}", r.host, r.port),
            PolicyRequest::FileSystem(r) => format!("fs {:?} {}", r.operation, r.path),
            PolicyRequest::Environment(r) => format!("env read:{}", r.variable),
            PolicyRequest::Exec(r) => format!("exec {}", r.command),
            PolicyRequest::KeyValue(r) => format!("kv {:?} {}", r.operation, r.key),
        }
    }
}
