//! Structured errors for the policy crate.

use reglet_types::ErrorDetail;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("request denied: {0}")]
    Denied(String),
    #[error("invalid grant set: {0}")]
    InvalidGrantSet(String),
}

impl PolicyError {
    /// Convert to the wire error shape carried in an `Outcome`.
    pub fn to_wire(&self) -> ErrorDetail {
        match self {
            PolicyError::Denied(reason) => ErrorDetail::capability(reason.clone()),
            PolicyError::InvalidGrantSet(reason) => {
                ErrorDetail::validation(reason.clone())
            }
        }
    }
}
