//! Wire conversion for manifest pipeline errors.

use crate::pipeline::PipelineError;
use crate::registry::RegistryError;
use reglet_types::ErrorDetail;

impl PipelineError {
    pub fn to_wire(&self) -> ErrorDetail {
        match self {
            PipelineError::Render(e) => ErrorDetail::validation(e.to_string()),
            PipelineError::Parse(msg) => ErrorDetail::validation(msg.clone()),
            PipelineError::MissingRequiredFields => {
                ErrorDetail::validation("manifest is missing required fields name/version")
            }
            PipelineError::Validation(errors) => {
                let message = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                ErrorDetail::validation(message)
            }
        }
    }
}

impl RegistryError {
    pub fn to_wire(&self) -> ErrorDetail {
        ErrorDetail::validation(self.to_string())
    }
}
