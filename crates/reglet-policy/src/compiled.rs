//! Grant compilation: `GrantSet` → matchers.

use crate::port_range::{parse_port_rule, PortRange};
use glob::{MatchOptions, Pattern};
use reglet_types::{GrantSet, KvOp};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Match options shared by every pattern this crate compiles: `*` does not
/// cross a `/`, but a standalone `**` path component matches any number of
/// segments.
pub(crate) const DOUBLESTAR_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub(crate) struct CompiledNetworkRule {
    pub hosts: Vec<Pattern>,
    pub ports: Vec<PortRange>,
}

pub(crate) struct CompiledFsRule {
    pub read: Vec<Pattern>,
    pub write: Vec<Pattern>,
}

pub(crate) struct CompiledKvRule {
    pub keys: Vec<Pattern>,
    pub op: KvOp,
}

/// The compiled, authorization-ready form of a `GrantSet`. Built once per
/// distinct `GrantSet` content hash and cached by [`crate::PolicyEngine`].
pub struct CompiledGrantSet {
    pub(crate) network: Vec<CompiledNetworkRule>,
    pub(crate) filesystem: Vec<CompiledFsRule>,
    pub(crate) environment: Vec<Pattern>,
    pub(crate) exec: Vec<Pattern>,
    pub(crate) key_value: Vec<CompiledKvRule>,
    /// Human-readable warnings for patterns dropped during compilation,
    /// surfaced to callers rather than silently swallowed.
    pub diagnostics: Vec<String>,
}

fn compile_pattern(raw: &str, diagnostics: &mut Vec<String>) -> Option<Pattern> {
    match Pattern::new(raw) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            warn!(pattern = raw, error = %err, "dropping malformed glob pattern during grant compilation");
            diagnostics.push(format!("invalid pattern {raw:?}: {err}"));
            None
        }
    }
}

fn compile_patterns(raw: &[String], diagnostics: &mut Vec<String>) -> Vec<Pattern> {
    raw.iter()
        .filter_map(|p| compile_pattern(p, diagnostics))
        .collect()
}

fn compile_ports(raw: &[String], diagnostics: &mut Vec<String>) -> Vec<PortRange> {
    raw.iter()
        .filter_map(|p| match parse_port_rule(p) {
            Some(range) => Some(range),
            None => {
                warn!(rule = p, "dropping malformed port rule during grant compilation");
                diagnostics.push(format!("invalid port rule {p:?}"));
                None
            }
        })
        .collect()
}

/// Compile a `GrantSet` into matchers. Never fails outright: malformed
/// patterns and port rules are dropped and recorded in
/// [`CompiledGrantSet::diagnostics`] rather than aborting compilation.
pub fn compile(grant_set: &GrantSet) -> CompiledGrantSet {
    let mut diagnostics = Vec::new();

    let network = grant_set
        .network
        .iter()
        .map(|rule| CompiledNetworkRule {
            hosts: compile_patterns(&rule.hosts, &mut diagnostics),
            ports: compile_ports(&rule.ports, &mut diagnostics),
        })
        .collect();

    let filesystem = grant_set
        .filesystem
        .iter()
        .map(|rule| CompiledFsRule {
            read: compile_patterns(&rule.read, &mut diagnostics),
            write: compile_patterns(&rule.write, &mut diagnostics),
        })
        .collect();

    let environment = compile_patterns(&grant_set.environment, &mut diagnostics);
    let exec = compile_patterns(&grant_set.exec, &mut diagnostics);

    let key_value = grant_set
        .key_value
        .iter()
        .map(|rule| CompiledKvRule {
            keys: compile_patterns(&rule.keys, &mut diagnostics),
            op: rule.op,
        })
        .collect();

    CompiledGrantSet {
        network,
        filesystem,
        environment,
        exec,
        key_value,
        diagnostics,
    }
}

/// A stable content hash identifying a `GrantSet`'s compiled-cache entry.
/// Keying the cache this way, rather than by the `GrantSet`'s address,
/// means two structurally identical grant sets share one compiled entry.
pub fn content_hash(grant_set: &GrantSet) -> String {
    let canonical =
        serde_json::to_vec(grant_set).expect("GrantSet serialization is infallible");
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglet_types::{FileSystemRule, KeyValueRule, NetworkRule};

    #[test]
    fn malformed_patterns_are_dropped_and_recorded() {
        let grants = GrantSet {
            environment: vec!["[unterminated".to_string(), "PATH".to_string()],
            ..Default::default()
        };
        let compiled = compile(&grants);
        assert_eq!(compiled.environment.len(), 1);
        assert_eq!(compiled.diagnostics.len(), 1);
    }

    #[test]
    fn malformed_port_rule_is_dropped_and_recorded() {
        let grants = GrantSet {
            network: vec![NetworkRule {
                hosts: vec!["example.com".to_string()],
                ports: vec!["80".to_string(), "not-a-port".to_string()],
            }],
            ..Default::default()
        };
        let compiled = compile(&grants);
        assert_eq!(compiled.network[0].ports.len(), 1);
        assert_eq!(compiled.diagnostics.len(), 1);
    }

    #[test]
    fn compilation_is_idempotent() {
        let grants = GrantSet {
            filesystem: vec![FileSystemRule {
                read: vec!["/data/**".to_string()],
                write: vec!["/tmp/*".to_string()],
            }],
            key_value: vec![KeyValueRule {
                keys: vec!["config/*".to_string()],
                op: KvOp::Read,
            }],
            ..Default::default()
        };
        let a = compile(&grants);
        let b = compile(&grants);
        assert_eq!(a.filesystem.len(), b.filesystem.len());
        assert_eq!(a.key_value.len(), b.key_value.len());
    }

    #[test]
    fn content_hash_is_stable_and_sensitive_to_content() {
        let a = GrantSet {
            environment: vec!["PATH".to_string()],
            ..Default::default()
        };
        let b = GrantSet {
            environment: vec!["HOME".to_string()],
            ..Default::default()
        };
        assert_eq!(content_hash(&a), content_hash(&a));
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
