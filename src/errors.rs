//! Failure taxonomy surfaced to consumers and the errors collaborators
//! report back to the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the pipeline could not produce a report. Display is the user-facing
/// message.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    #[error("No active or archived recordings available. Start a new recording for analysis.")]
    NoRecordings,
    #[error("Failed to start recording for analysis.")]
    RecordingCreationFailure,
    #[error("Failed to load the report from recording.")]
    ReportFailure,
    #[error("Authentication failure.")]
    AuthFailure,
    #[error("Internal error while generating the analysis report.")]
    InternalError,
}

/// Zero-argument retry a consumer can bind to a button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    /// Create the analysis recording, then resolve from it.
    StartProfiling,
    /// Run the whole resolution chain again.
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Default,
    /// Call sites where starting a recording must stay an explicit choice:
    /// `NoRecordings` gets no direct retry.
    UserInitiatedOnly,
}

const RECOVERY_TABLE: [(ErrorKind, RecoveryAction, &str); 5] = [
    (
        ErrorKind::NoRecordings,
        RecoveryAction::StartProfiling,
        "Start a recording for analysis",
    ),
    (
        ErrorKind::RecordingCreationFailure,
        RecoveryAction::StartProfiling,
        "Retry starting recording",
    ),
    (
        ErrorKind::ReportFailure,
        RecoveryAction::Resolve,
        "Retry loading report",
    ),
    (ErrorKind::AuthFailure, RecoveryAction::Resolve, "Retry"),
    (ErrorKind::InternalError, RecoveryAction::Resolve, "Retry"),
];

fn table_row(kind: ErrorKind) -> (RecoveryAction, &'static str) {
    RECOVERY_TABLE
        .iter()
        .find(|(row_kind, _, _)| *row_kind == kind)
        .map(|(_, action, label)| (*action, *label))
        // Every variant has a row; see `table_covers_every_kind`.
        .unwrap_or((RecoveryAction::Resolve, "Retry"))
}

pub fn recovery_for(kind: ErrorKind, policy: RetryPolicy) -> Option<RecoveryAction> {
    match (kind, policy) {
        (ErrorKind::NoRecordings, RetryPolicy::UserInitiatedOnly) => None,
        _ => Some(table_row(kind).0),
    }
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::NoRecordings,
        ErrorKind::RecordingCreationFailure,
        ErrorKind::ReportFailure,
        ErrorKind::AuthFailure,
        ErrorKind::InternalError,
    ];

    pub fn recovery(self) -> Option<RecoveryAction> {
        recovery_for(self, RetryPolicy::Default)
    }

    pub fn recovery_label(self) -> &'static str {
        table_row(self).1
    }
}

/// Error returned by the remote management API collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("target authentication failed")]
    Unauthorized,
    #[error("already exists")]
    AlreadyExists,
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 407 => Self::Unauthorized,
            404 => Self::NotFound,
            409 => Self::AlreadyExists,
            _ => Self::Http {
                status,
                message: message.into(),
            },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_kind() {
        for kind in ErrorKind::ALL {
            assert_eq!(
                RECOVERY_TABLE.iter().filter(|(k, _, _)| *k == kind).count(),
                1,
                "{kind:?} must have exactly one recovery row"
            );
        }
    }

    #[test]
    fn recovery_actions_match_failure_kind() {
        assert_eq!(
            ErrorKind::NoRecordings.recovery(),
            Some(RecoveryAction::StartProfiling)
        );
        assert_eq!(
            ErrorKind::RecordingCreationFailure.recovery(),
            Some(RecoveryAction::StartProfiling)
        );
        assert_eq!(
            ErrorKind::ReportFailure.recovery(),
            Some(RecoveryAction::Resolve)
        );
        assert_eq!(ErrorKind::AuthFailure.recovery(), Some(RecoveryAction::Resolve));
        assert_eq!(
            ErrorKind::InternalError.recovery(),
            Some(RecoveryAction::Resolve)
        );
        assert_eq!(ErrorKind::ReportFailure.recovery_label(), "Retry loading report");
    }

    #[test]
    fn user_initiated_policy_drops_no_recordings_retry() {
        assert_eq!(
            recovery_for(ErrorKind::NoRecordings, RetryPolicy::UserInitiatedOnly),
            None
        );
        assert_eq!(
            recovery_for(ErrorKind::InternalError, RetryPolicy::UserInitiatedOnly),
            Some(RecoveryAction::Resolve)
        );
    }

    #[test]
    fn http_statuses_map_to_variants() {
        assert!(ApiError::http(401, "nope").is_auth());
        assert_eq!(ApiError::http(404, ""), ApiError::NotFound);
        assert_eq!(ApiError::http(409, ""), ApiError::AlreadyExists);
        assert_eq!(
            ApiError::http(500, "boom").to_string(),
            "HTTP 500: boom"
        );
    }
}
