//! Executor configuration — an explicit struct with a `Default` impl
//! rather than a functional-options builder.

/// The well-known import module name the guest's host-function imports
/// are registered under. A single configurable identifier, defaulting to
/// `reglet_host`.
pub const DEFAULT_HOST_MODULE_NAME: &str = "reglet_host";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum fuel (instruction budget) per `check` call. `0` disables
    /// metering.
    pub fuel_limit: u64,
    /// Wall-clock budget for one `check` call before the epoch-interrupt
    /// watchdog fires, absent an envelope deadline that fires sooner.
    pub timeout_secs: u64,
    /// Import module name the guest's host-function imports are
    /// registered under.
    pub host_module_name: String,
    /// Maximum request/response payload size enforced before any guest
    /// memory is touched.
    pub max_request_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fuel_limit: 1_000_000,
            timeout_secs: 30,
            host_module_name: DEFAULT_HOST_MODULE_NAME.to_string(),
            max_request_bytes: reglet_abi::DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_module_name_matches_the_documented_default() {
        assert_eq!(RuntimeConfig::default().host_module_name, "reglet_host");
    }
}
