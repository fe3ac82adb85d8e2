//! Boundary to the vault backend.
//!
//! The backend is an opaque process that does the cryptographic work. The controller talks
//! to it through request/response commands and a notification stream; nothing here knows
//! how bytes are encrypted or where the vault lives.

use std::path::{Path, PathBuf};

use futures_util::stream::BoxStream;
use serde::Serialize;

use crate::error::BackendError;
use crate::token::OperationToken;
use crate::types::{BackendNotification, OperationKind};

/// Arguments of a `launch_batch` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Backends should echo this back as `operationToken` on every notification. Untagged
    /// notifications are credited to whatever operation is current, so a late untagged
    /// event from a cancelled batch lands on the batch that replaced it.
    pub token: OperationToken,
    pub kind: OperationKind,
    pub files: Vec<String>,
    /// Only set for encrypt and decrypt
    pub destination_dir: Option<PathBuf>,
}

/// Commands and notifications exposed by the vault backend.
///
/// All commands resolve when the backend acknowledges them. `launch_batch` in particular
/// resolves once the batch has been accepted, not when it finishes; completion is only
/// observable through [`subscribe`](Self::subscribe).
pub trait VaultBackend: Send + Sync + 'static {
    fn launch_batch(&self, request: BatchRequest) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Best-effort request to stop the batch started with `token`.
    fn cancel_operation(&self, token: OperationToken) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn check_vault_exists(&self) -> impl Future<Output = Result<bool, BackendError>> + Send;

    fn unlock_vault(&self, password: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn create_vault(&self, password: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn change_master_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Lists every file below `dir`, recursively.
    fn list_files_recursive(&self, dir: &Path) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Opens the notification stream. Called once per controller.
    fn subscribe(&self) -> BoxStream<'static, BackendNotification>;
}
