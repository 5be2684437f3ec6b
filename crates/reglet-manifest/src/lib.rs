//! The manifest pipeline: strict-mode template render, YAML parse, and
//! per-capability JSON Schema validation, plus the declared-capability →
//! `GrantSet` conversion the policy engine consumes.

mod error;
mod grants;
mod pipeline;
mod registry;
mod template;

pub use grants::grants_from_manifest;
pub use pipeline::{run, PipelineError, ValidationError};
pub use registry::{CapabilityRegistry, RegistryError};
pub use template::{render, RenderError};
