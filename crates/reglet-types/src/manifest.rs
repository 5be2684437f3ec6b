//! Plugin manifest: declared capabilities and SDK metadata.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A plugin's self-description, decoded from the guest's `manifest()`
/// export (JSON on the wire, YAML on disk during local development).
///
/// Immutable after parse: nothing downstream of the manifest pipeline
/// mutates a `Manifest` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
}

impl Manifest {
    /// `true` when `name`/`version` are present and non-empty, the minimum
    /// the manifest pipeline requires before validation runs.
    pub fn has_required_fields(&self) -> bool {
        !self.name.trim().is_empty() && !self.version.trim().is_empty()
    }
}

/// The kind of external resource a declared capability reaches for.
///
/// `Custom` carries the source manifest's unrecognized category tag
/// verbatim, so an unknown category round-trips rather than being
/// silently coerced — see the open question in `DESIGN.md` on unknown
/// capability categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CapabilityCategory {
    Network,
    Fs,
    Env,
    Exec,
    Kv,
    Http,
    Custom(String),
}

impl CapabilityCategory {
    /// The wire string for this category, used as both the JSON tag and the
    /// capability-registry key.
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityCategory::Network => "network",
            CapabilityCategory::Fs => "fs",
            CapabilityCategory::Env => "env",
            CapabilityCategory::Exec => "exec",
            CapabilityCategory::Kv => "kv",
            CapabilityCategory::Http => "http",
            CapabilityCategory::Custom(tag) => tag,
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "network" => CapabilityCategory::Network,
            "fs" => CapabilityCategory::Fs,
            "env" => CapabilityCategory::Env,
            "exec" => CapabilityCategory::Exec,
            "kv" => CapabilityCategory::Kv,
            "http" => CapabilityCategory::Http,
            other => CapabilityCategory::Custom(other.to_string()),
        }
    }
}

// Serialized as a bare JSON/YAML string rather than an externally-tagged
// enum, since the wire format is `{category: "network", ...}` with the
// category itself a plain string, not `{category: {"Network": null}}`.
impl Serialize for CapabilityCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CapabilityCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CapabilityCategory::from_str(&s))
    }
}

/// A single capability a plugin declares it needs: `(category, resource,
/// action?)`. Declarations may freely duplicate; duplicate detection is a
/// validation-time concern, not a parse-time one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(alias = "kind")]
    pub category: CapabilityCategory,
    #[serde(alias = "pattern")]
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Capability {
    pub fn new(category: CapabilityCategory, resource: impl Into<String>) -> Self {
        Self {
            category,
            resource: resource.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// The `(category, resource, action)` triple used to detect duplicate
    /// declarations during manifest validation.
    fn identity(&self) -> (String, &str, Option<&str>) {
        (
            self.category.as_str().to_string(),
            self.resource.as_str(),
            self.action.as_deref(),
        )
    }
}

/// Returns the indices of capabilities in `capabilities` that duplicate an
/// earlier entry's `(category, resource, action)` triple.
pub fn duplicate_capability_indices(capabilities: &[Capability]) -> Vec<usize> {
    let mut seen = std::collections::HashSet::new();
    let mut dupes = Vec::new();
    for (i, cap) in capabilities.iter().enumerate() {
        if !seen.insert(cap.identity()) {
            dupes.push(i);
        }
    }
    dupes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_requires_name_and_version() {
        let m = Manifest {
            name: String::new(),
            version: "1.0".into(),
            capabilities: vec![],
            sdk_version: None,
        };
        assert!(!m.has_required_fields());
    }

    #[test]
    fn duplicate_detection_flags_repeats_only() {
        let caps = vec![
            Capability::new(CapabilityCategory::Network, "example.com"),
            Capability::new(CapabilityCategory::Fs, "/tmp/*").with_action("write"),
            Capability::new(CapabilityCategory::Network, "example.com"),
        ];
        assert_eq!(duplicate_capability_indices(&caps), vec![2]);
    }

    #[test]
    fn custom_category_round_trips() {
        let cap = Capability::new(CapabilityCategory::Custom("tls".into()), "*");
        let json = serde_json::to_string(&cap).unwrap();
        let back: Capability = serde_json::from_str(&json).unwrap();
        assert_eq!(back.category.as_str(), "tls");
    }

    #[test]
    fn manifest_roundtrips_through_yaml() {
        let m = Manifest {
            name: "check-tls".into(),
            version: "0.1.0".into(),
            capabilities: vec![Capability::new(CapabilityCategory::Network, "*.internal")],
            sdk_version: Some("1".into()),
        };
        let yaml = serde_yaml::to_string(&m).unwrap();
        let back: Manifest = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(m, back);
    }
}
