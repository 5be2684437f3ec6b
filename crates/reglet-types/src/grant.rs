//! `GrantSet`: the on-disk/wire authorization state a plugin instance runs
//! against. Pattern strings here are uncompiled — `reglet-policy` compiles
//! a `GrantSet` into matchers and caches the result.

use serde::{Deserialize, Serialize};

/// The operation a key-value rule authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KvOp {
    Read,
    Write,
    ReadWrite,
}

impl KvOp {
    /// Whether this rule's op covers a request for `requested`.
    pub fn authorizes(&self, requested: KvOp) -> bool {
        *self == requested || *self == KvOp::ReadWrite
    }
}

/// A network grant rule: hosts matching any pattern, on any of the given
/// port ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NetworkRule {
    pub hosts: Vec<String>,
    pub ports: Vec<String>,
}

/// A filesystem grant rule: independent read and write pattern lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileSystemRule {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
}

/// A key-value grant rule: keys matching any pattern, authorized for `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueRule {
    pub keys: Vec<String>,
    pub op: KvOp,
}

/// The compiled-ready, serializable authorization state for one plugin:
/// per-kind rule collections. Immutable once built — callers construct a
/// new `GrantSet` (or merge two with [`GrantSet::union`]) rather than
/// mutating rules behind a reference already handed to the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GrantSet {
    #[serde(default)]
    pub network: Vec<NetworkRule>,
    #[serde(default)]
    pub filesystem: Vec<FileSystemRule>,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub exec: Vec<String>,
    #[serde(default)]
    pub key_value: Vec<KeyValueRule>,
}

impl GrantSet {
    pub fn is_empty(&self) -> bool {
        self.network.is_empty()
            && self.filesystem.is_empty()
            && self.environment.is_empty()
            && self.exec.is_empty()
            && self.key_value.is_empty()
    }

    /// Per-kind union of two grant sets. Permissions are monotonic: the
    /// result authorizes at least everything either input authorized.
    pub fn union(&self, other: &GrantSet) -> GrantSet {
        GrantSet {
            network: [self.network.clone(), other.network.clone()].concat(),
            filesystem: [self.filesystem.clone(), other.filesystem.clone()].concat(),
            environment: dedup_union(&self.environment, &other.environment),
            exec: dedup_union(&self.exec, &other.exec),
            key_value: [self.key_value.clone(), other.key_value.clone()].concat(),
        }
    }
}

fn dedup_union(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = a.to_vec();
    for item in b {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
