//! Error types for the controller and the backend boundary.

use serde::Serialize;

use crate::session::{SessionAction, VaultSessionState};
use crate::types::OperationKind;

/// Errors the controller surfaces to its caller.
///
/// None of these leave the controller in an unstable state: operation errors end in Idle,
/// session errors leave the session state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerError {
    /// Launch was requested with nothing staged. No backend call was made.
    NoFilesStaged { kind: OperationKind },
    /// The user dismissed the destination picker. Treated as a silent abort.
    NoDestinationChosen { kind: OperationKind },
    /// The backend refused to start or list something. Staged files are kept.
    BackendRejected { message: String },
    /// The backend reported a failure mid-operation.
    OperationFailed { message: String },
    /// Unlock or password change was rejected.
    AuthError { message: String },
    /// Vault creation was rejected by the backend.
    ValidationError { message: String },
    /// New master password is shorter than the configured minimum
    PasswordTooShort { min_length: usize },
    /// Password and confirmation differ
    PasswordMismatch,
    /// A staged folder turned out to be empty
    NoFilesInFolder { path: String },
    /// A folder staged for decryption held no encrypted files
    NoEncryptedFiles { path: String, extension: String },
    /// The session can't do `action` from its current state
    InvalidSessionTransition {
        from: VaultSessionState,
        action: SessionAction,
    },
}

impl ControllerError {
    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFilesStaged { kind } => format!("Add at least one file to {}.", kind),
            Self::NoDestinationChosen { .. } => "No destination folder was chosen.".to_string(),
            Self::BackendRejected { message } => format!("The operation could not be started: {}", message),
            Self::OperationFailed { message } => format!("The operation failed: {}", message),
            Self::AuthError { message } | Self::ValidationError { message } => message.clone(),
            Self::PasswordTooShort { min_length } => {
                format!("Password must be at least {} characters long.", min_length)
            }
            Self::PasswordMismatch => "Passwords do not match.".to_string(),
            Self::NoFilesInFolder { path } => format!("\"{}\" contains no files.", path),
            Self::NoEncryptedFiles { path, extension } => {
                format!("\"{}\" contains no .{} files to decrypt.", path, extension)
            }
            Self::InvalidSessionTransition { from, action } => {
                format!("Cannot {} while the vault is {}.", action, from)
            }
        }
    }

    /// Whether the UI should stay quiet about this error.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NoDestinationChosen { .. })
    }
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for ControllerError {}

/// Error returned by [`VaultBackend`](crate::backend::VaultBackend) calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend answered and said no. The message is shown verbatim.
    Rejected(String),
    /// The backend couldn't be reached
    Unavailable(String),
}

impl BackendError {
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(msg) | Self::Unavailable(msg) => msg,
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(msg) => write!(f, "{}", msg),
            Self::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
