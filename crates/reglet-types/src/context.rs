//! The context envelope propagated on every host call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deadline/cancellation/request-id bundle attached to every host call so
/// the host can bind effectful work to the guest's logical cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContextEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub canceled: bool,
}

impl ContextEnvelope {
    pub fn with_deadline(deadline: DateTime<Utc>) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    /// `true` once `now` has passed the envelope's deadline, if any.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Milliseconds remaining before `deadline` as of `now`, clamped to
    /// zero, or `None` if no deadline is set.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> Option<u64> {
        self.deadline
            .map(|d| (d - now).num_milliseconds().max(0) as u64)
    }

    /// Resolve the effective timeout for a host call as of `now`, given a
    /// request-body `timeout_ms` that may also be present. The envelope's
    /// `timeout_ms`, the request body's `timeout_ms`, and the time
    /// remaining before `deadline` each only narrow the budget, never
    /// extend it, so the smallest of whichever are present wins — see the
    /// open question recorded in `DESIGN.md`.
    pub fn effective_timeout_ms(
        &self,
        now: DateTime<Utc>,
        request_timeout_ms: Option<u64>,
    ) -> Option<u64> {
        [self.timeout_ms, request_timeout_ms, self.remaining_ms(now)]
            .into_iter()
            .flatten()
            .min()
    }
}
