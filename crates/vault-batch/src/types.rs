//! Type definitions for batch operations.
//!
//! Contains operation kinds, the progress snapshot, backend notification payloads and the
//! notices the controller publishes.

use serde::{Deserialize, Serialize};

use crate::error::ControllerError;
use crate::token::OperationToken;

/// Channel name the backend uses for progress notifications.
pub const PROGRESS_CHANNEL: &str = "PROGRESS_EVENT";
/// Channel name the backend uses for mid-operation failures.
pub const ERROR_CHANNEL: &str = "ERROR_EVENT";

// ============================================================================
// Operation types
// ============================================================================

/// Kind of batch operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[default]
    Encrypt,
    Decrypt,
    SecureDelete,
}

impl OperationKind {
    /// Whether the operation writes its output into a user-chosen directory.
    pub fn needs_destination(self) -> bool {
        matches!(self, Self::Encrypt | Self::Decrypt)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::SecureDelete => "secure delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Processing,
    Done,
}

// ============================================================================
// Progress snapshot
// ============================================================================

/// What the progress dialog shows for the current operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationProgress {
    pub status: OperationStatus,
    pub current_file_path: String,
    pub number_of_files: usize,
    pub current_file_number: usize,
    /// 0.0 to 100.0
    pub total_progress_percent: f64,
}

impl OperationProgress {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Snapshot right after a launch, before the backend reports anything.
    pub fn starting(first_file: &str, number_of_files: usize) -> Self {
        Self {
            status: OperationStatus::Processing,
            current_file_path: first_file.to_string(),
            number_of_files,
            current_file_number: 1,
            total_progress_percent: 0.0,
        }
    }
}

// ============================================================================
// Backend notifications
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventStatus {
    Processing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SucceededFile {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

/// Progress notification payload.
///
/// `operation_token` is optional: untagged events are attributed to whatever operation is
/// current when they arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(default)]
    pub operation_token: Option<OperationToken>,
    pub status: ProgressEventStatus,
    #[serde(default)]
    pub current_file_path: String,
    #[serde(default)]
    pub number_of_files: usize,
    #[serde(default)]
    pub current_file_number: usize,
    /// 0.0 to 1.0
    #[serde(default)]
    pub total_progress_fraction: f64,
    /// Present on `done`
    #[serde(default)]
    pub total_files: Option<Vec<String>>,
    /// Present on `done`
    #[serde(default)]
    pub succeeded_files: Option<Vec<SucceededFile>>,
    /// Present on `done`
    #[serde(default)]
    pub failed_files: Option<Vec<FailedFile>>,
}

/// Failure notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(default)]
    pub operation_token: Option<OperationToken>,
    pub message: String,
}

/// Anything the backend pushes on its notification channels.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendNotification {
    Progress(ProgressEvent),
    Error(ErrorEvent),
}

impl BackendNotification {
    pub fn token(&self) -> Option<OperationToken> {
        match self {
            Self::Progress(event) => event.operation_token,
            Self::Error(event) => event.operation_token,
        }
    }

    /// Decodes a JSON payload received on `channel`.
    ///
    /// Error payloads may be either a bare string or an [`ErrorEvent`] object.
    pub fn from_json(channel: &str, payload: &str) -> Result<Self, serde_json::Error> {
        match channel {
            PROGRESS_CHANNEL => Ok(Self::Progress(serde_json::from_str(payload)?)),
            ERROR_CHANNEL => {
                let value: serde_json::Value = serde_json::from_str(payload)?;
                if let serde_json::Value::String(message) = value {
                    return Ok(Self::Error(ErrorEvent {
                        operation_token: None,
                        message,
                    }));
                }
                Ok(Self::Error(serde_json::from_value(value)?))
            }
            other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "unknown notification channel: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Controller notices
// ============================================================================

/// User-visible conditions published by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerNotice {
    /// Something failed and the user should be told
    Error { error: ControllerError },
    /// The user cancelled a running operation
    Cancelled { token: OperationToken },
    /// The operation reached Done. Failures here are partial, not an error state.
    Completed {
        token: OperationToken,
        total: usize,
        succeeded: usize,
        failed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_payload_decodes_without_done_fields() {
        let json = r#"{
            "status": "processing",
            "currentFilePath": "/in/a.txt",
            "numberOfFiles": 2,
            "currentFileNumber": 1,
            "totalProgressFraction": 0.25
        }"#;
        let notification = BackendNotification::from_json(PROGRESS_CHANNEL, json).unwrap();
        let BackendNotification::Progress(event) = notification else {
            panic!("expected progress");
        };
        assert_eq!(event.status, ProgressEventStatus::Processing);
        assert_eq!(event.operation_token, None);
        assert_eq!(event.total_progress_fraction, 0.25);
        assert!(event.total_files.is_none());
    }

    #[test]
    fn done_payload_decodes_file_lists_and_token() {
        let json = r#"{
            "operationToken": 3,
            "status": "done",
            "currentFilePath": "",
            "numberOfFiles": 2,
            "currentFileNumber": 2,
            "totalProgressFraction": 1.0,
            "totalFiles": ["a.txt", "b.txt"],
            "succeededFiles": [{"path": "a.txt"}],
            "failedFiles": [{"path": "b.txt", "error": "disk full"}]
        }"#;
        let notification = BackendNotification::from_json(PROGRESS_CHANNEL, json).unwrap();
        assert_eq!(notification.token(), Some(OperationToken::from(3)));
        let BackendNotification::Progress(event) = notification else {
            panic!("expected progress");
        };
        assert_eq!(event.failed_files.unwrap()[0].error, "disk full");
    }

    #[test]
    fn error_payload_accepts_bare_string() {
        let notification = BackendNotification::from_json(ERROR_CHANNEL, r#""vault is locked""#).unwrap();
        assert_eq!(
            notification,
            BackendNotification::Error(ErrorEvent {
                operation_token: None,
                message: "vault is locked".to_string(),
            })
        );
    }

    #[test]
    fn error_payload_accepts_object() {
        let notification =
            BackendNotification::from_json(ERROR_CHANNEL, r#"{"operationToken": 9, "message": "boom"}"#).unwrap();
        assert_eq!(notification.token(), Some(OperationToken::from(9)));
    }

    #[test]
    fn unknown_channel_is_rejected() {
        assert!(BackendNotification::from_json("SOMETHING_ELSE", "{}").is_err());
    }

    #[test]
    fn only_secure_delete_skips_destination() {
        assert!(OperationKind::Encrypt.needs_destination());
        assert!(OperationKind::Decrypt.needs_destination());
        assert!(!OperationKind::SecureDelete.needs_destination());
    }
}
