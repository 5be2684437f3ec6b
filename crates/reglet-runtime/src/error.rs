//! Structured errors for the host executor.

use reglet_types::ErrorDetail;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("WASM compilation failed: {0}")]
    Compilation(String),
    #[error("WASM instantiation failed: {0}")]
    Instantiation(String),
    #[error("WASM execution failed: {0}")]
    Execution(String),
    #[error("plugin exceeded its CPU budget")]
    FuelExhausted,
    #[error("plugin exceeded its {0}s wall-clock budget")]
    Timeout(u64),
    #[error("guest ABI violation: {0}")]
    Abi(String),
    #[error("request denied: {0}")]
    PolicyDenied(String),
}

impl RuntimeError {
    pub fn to_wire(&self) -> ErrorDetail {
        match self {
            RuntimeError::Compilation(msg) | RuntimeError::Instantiation(msg) => {
                ErrorDetail::new(reglet_types::ErrorKind::Config, "module_load_failed", msg.clone())
            }
            RuntimeError::Execution(msg) => ErrorDetail::internal(msg.clone()),
            RuntimeError::FuelExhausted => {
                ErrorDetail::timeout("fuel_exhausted", "plugin exceeded its CPU budget")
            }
            RuntimeError::Timeout(secs) => {
                ErrorDetail::timeout("wall_clock_timeout", format!("exceeded {secs}s budget"))
            }
            RuntimeError::Abi(msg) => {
                ErrorDetail::new(reglet_types::ErrorKind::Internal, "abi_violation", msg.clone())
            }
            RuntimeError::PolicyDenied(msg) => ErrorDetail::capability(msg.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_exhausted_is_a_timeout_kind() {
        let detail = RuntimeError::FuelExhausted.to_wire();
        assert!(detail.is_timeout);
    }
}
