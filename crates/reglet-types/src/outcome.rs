//! The guest's `observe` result, wire name `Result` (renamed `Outcome`
//! here to avoid shadowing `std::result::Result`).

use crate::error_detail::ErrorDetail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub timestamp: DateTime<Utc>,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            data: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(detail: ErrorDetail) -> Self {
        Self {
            status: Status::Error,
            message: detail.message.clone(),
            data: None,
            error: Some(detail),
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: BTreeMap<String, serde_json::Value>) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_detail::ErrorKind;

    #[test]
    fn error_outcome_carries_message_from_detail() {
        let outcome = Outcome::error(ErrorDetail::new(ErrorKind::Panic, "plugin_panic", "boom"));
        assert_eq!(outcome.status, Status::Error);
        assert_eq!(outcome.message, "boom");
    }

    #[test]
    fn wire_status_is_lowercase() {
        let json = serde_json::to_value(Outcome::success("ok")).unwrap();
        assert_eq!(json["status"], "success");
    }
}
