//! The manifest pipeline: template render → YAML parse → capability
//! validation, end to end.

use crate::registry::CapabilityRegistry;
use crate::template::{self, RenderError};
use reglet_types::{duplicate_capability_indices, Manifest};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("manifest is not valid YAML: {0}")]
    Parse(String),
    #[error("manifest is missing required fields name/version")]
    MissingRequiredFields,
    #[error("manifest failed validation")]
    Validation(Vec<ValidationError>),
}

/// Run the full pipeline and return the parsed manifest. Validation
/// failures are reported as a single `PipelineError::Validation` carrying
/// every accumulated `ValidationError`, not just the first one.
pub fn run(
    template_bytes: &[u8],
    config: &Value,
    registry: &CapabilityRegistry,
) -> Result<Manifest, PipelineError> {
    let rendered = template::render(template_bytes, config)?;

    let manifest: Manifest =
        serde_yaml::from_str(&rendered).map_err(|e| PipelineError::Parse(e.to_string()))?;

    if !manifest.has_required_fields() {
        return Err(PipelineError::MissingRequiredFields);
    }

    let mut errors = Vec::new();

    for idx in duplicate_capability_indices(&manifest.capabilities) {
        let cap = &manifest.capabilities[idx];
        errors.push(ValidationError {
            field: format!("capabilities[{idx}]"),
            message: format!(
                "duplicate capability declaration: {} {}",
                cap.category.as_str(),
                cap.resource
            ),
        });
    }

    if !registry.is_empty() {
        for (idx, cap) in manifest.capabilities.iter().enumerate() {
            let instance = serde_json::to_value(cap)
                .map_err(|e| PipelineError::Parse(format!("capability re-encode failed: {e}")))?;
            match registry.validate(cap.category.as_str(), &instance) {
                None => errors.push(ValidationError {
                    field: format!("capabilities[{idx}].category"),
                    message: format!("no schema registered for category {}", cap.category.as_str()),
                }),
                Some(Ok(())) => {}
                Some(Err(messages)) => {
                    for message in messages {
                        errors.push(ValidationError {
                            field: format!("capabilities[{idx}]"),
                            message,
                        });
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(manifest)
    } else {
        Err(PipelineError::Validation(errors))
    }
}
