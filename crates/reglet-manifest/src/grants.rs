//! Converts a declared `Manifest` into the `GrantSet` the policy engine
//! evaluates requests against.
//!
//! Each capability's `action` selects which rule list(s) it populates.
//! Declaring `fs` with `action: write` grants write access only — it does
//! **not** implicitly grant read access to the same pattern. A plugin that
//! needs both declares both; widening a write grant into an implicit read
//! grant would hand out more access than the manifest states, which runs
//! against the deny-by-default posture the rest of this crate holds to.

use reglet_types::{
    Capability, CapabilityCategory, FileSystemRule, GrantSet, KeyValueRule, KvOp, Manifest,
    NetworkRule,
};

/// Build a `GrantSet` from every capability a manifest declares. Unknown
/// (`Custom`) categories are skipped — they carry no rule shape this host
/// understands how to enforce.
pub fn grants_from_manifest(manifest: &Manifest) -> GrantSet {
    let mut grants = GrantSet::default();

    for cap in &manifest.capabilities {
        apply(&mut grants, cap);
    }

    grants
}

fn apply(grants: &mut GrantSet, cap: &Capability) {
    match &cap.category {
        CapabilityCategory::Network | CapabilityCategory::Http => {
            let (host, port) = split_host_port(&cap.resource);
            grants.network.push(NetworkRule {
                hosts: vec![host],
                ports: vec![port],
            });
        }
        CapabilityCategory::Fs => {
            let mut rule = FileSystemRule::default();
            match cap.action.as_deref() {
                Some("write") => rule.write.push(cap.resource.clone()),
                Some("read-write") | Some("readwrite") => {
                    rule.read.push(cap.resource.clone());
                    rule.write.push(cap.resource.clone());
                }
                _ => rule.read.push(cap.resource.clone()),
            }
            grants.filesystem.push(rule);
        }
        CapabilityCategory::Env => grants.environment.push(cap.resource.clone()),
        CapabilityCategory::Exec => grants.exec.push(cap.resource.clone()),
        CapabilityCategory::Kv => {
            let op = match cap.action.as_deref() {
                Some("write") => KvOp::Write,
                Some("read-write") | Some("readwrite") => KvOp::ReadWrite,
                _ => KvOp::Read,
            };
            grants.key_value.push(KeyValueRule {
                keys: vec![cap.resource.clone()],
                op,
            });
        }
        CapabilityCategory::Custom(_) => {}
    }
}

/// Splits a `host:port` resource into a host pattern and a port rule; a
/// bare host with no `:port` suffix grants every port (`"*"`).
fn split_host_port(resource: &str) -> (String, String) {
    match resource.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '*') => {
            (host.to_string(), port.to_string())
        }
        _ => (resource.to_string(), "*".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglet_types::CapabilityCategory;

    #[test]
    fn fs_write_does_not_imply_read() {
        let manifest = Manifest {
            name: "x".into(),
            version: "1".into(),
            sdk_version: None,
            capabilities: vec![
                Capability::new(CapabilityCategory::Fs, "/tmp/*").with_action("write"),
            ],
        };
        let grants = grants_from_manifest(&manifest);
        assert!(grants.filesystem[0].write.contains(&"/tmp/*".to_string()));
        assert!(grants.filesystem[0].read.is_empty());
    }

    #[test]
    fn network_resource_with_port_splits_cleanly() {
        let manifest = Manifest {
            name: "x".into(),
            version: "1".into(),
            sdk_version: None,
            capabilities: vec![Capability::new(CapabilityCategory::Network, "example.com:443")],
        };
        let grants = grants_from_manifest(&manifest);
        assert_eq!(grants.network[0].hosts, vec!["example.com".to_string()]);
        assert_eq!(grants.network[0].ports, vec!["443".to_string()]);
    }

    #[test]
    fn bare_network_resource_grants_every_port() {
        let manifest = Manifest {
            name: "x".into(),
            version: "1".into(),
            sdk_version: None,
            capabilities: vec![Capability::new(CapabilityCategory::Network, "example.com")],
        };
        let grants = grants_from_manifest(&manifest);
        assert_eq!(grants.network[0].ports, vec!["*".to_string()]);
    }

    #[test]
    fn custom_category_is_skipped() {
        let manifest = Manifest {
            name: "x".into(),
            version: "1".into(),
            sdk_version: None,
            capabilities: vec![Capability::new(CapabilityCategory::Custom("tls".into()), "*")],
        };
        let grants = grants_from_manifest(&manifest);
        assert!(grants.is_empty());
    }
}
