//! Plugin-facing error taxonomy and normalization to the wire
//! `ErrorDetail` shape.

use reglet_types::ErrorDetail;

/// Errors a plugin's `Check` implementation may return. Each variant maps
/// onto one of the wire error kinds; anything a plugin author's own error
/// type can't express falls back through [`ToErrorDetail`]'s blanket impl.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("exec error: {0}")]
    Exec(String),
    #[error("{0}")]
    Internal(String),
}

impl CheckError {
    pub fn to_error_detail(&self) -> ErrorDetail {
        match self {
            CheckError::Network(msg) => ErrorDetail::new(
                reglet_types::ErrorKind::Network,
                "network_error",
                msg.clone(),
            ),
            CheckError::Timeout(msg) => ErrorDetail::timeout("timeout", msg.clone()),
            CheckError::Config(msg) => {
                ErrorDetail::new(reglet_types::ErrorKind::Config, "config_error", msg.clone())
            }
            CheckError::Validation(msg) => ErrorDetail::validation(msg.clone()),
            CheckError::Exec(msg) => {
                ErrorDetail::new(reglet_types::ErrorKind::Exec, "exec_error", msg.clone())
            }
            CheckError::Internal(msg) => ErrorDetail::internal(msg.clone()),
        }
    }
}

/// Normalizes any error a `Check` implementation returns into the wire
/// `ErrorDetail` shape: a [`CheckError`] maps onto its matching kind via
/// [`CheckError::to_error_detail`]; any other boxed error falls back to
/// `type=internal` with its `Display` message preserved.
pub fn normalize(err: &(dyn std::error::Error + 'static)) -> ErrorDetail {
    match err.downcast_ref::<CheckError>() {
        Some(check_error) => check_error.to_error_detail(),
        None => ErrorDetail::internal(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglet_types::ErrorKind;

    #[test]
    fn timeout_variant_sets_is_timeout_flag() {
        let detail = CheckError::Timeout("adapter deadline exceeded".into()).to_error_detail();
        assert!(detail.is_timeout);
        assert_eq!(detail.kind, ErrorKind::Timeout);
    }

    #[test]
    fn variants_map_to_distinct_kinds() {
        assert_eq!(
            CheckError::Network("x".into()).to_error_detail().kind,
            ErrorKind::Network
        );
        assert_eq!(
            CheckError::Validation("x".into()).to_error_detail().kind,
            ErrorKind::Validation
        );
    }

    #[test]
    fn normalize_downcasts_check_error_to_its_kind() {
        let err = CheckError::Config("missing field".into());
        let detail = normalize(&err);
        assert_eq!(detail.kind, ErrorKind::Config);
    }

    #[test]
    fn normalize_falls_back_to_internal_for_unknown_errors() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let detail = normalize(&err);
        assert_eq!(detail.kind, ErrorKind::Internal);
        assert!(detail.message.contains("disk full"));
    }
}
