//! In-memory backend for tests.
//!
//! Records every command it receives and lets tests push notifications into the stream the
//! controller subscribed to.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::{Notify, mpsc};

use crate::backend::{BatchRequest, VaultBackend};
use crate::error::BackendError;
use crate::ignore_poison::IgnorePoison;
use crate::token::OperationToken;
use crate::types::{
    BackendNotification, ErrorEvent, FailedFile, ProgressEvent, ProgressEventStatus, SucceededFile,
};

pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Lets spawned tasks (listener, cancel requests) run. Time is paused in most tests, so
/// this only nudges the clock by a millisecond.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendCall {
    LaunchBatch(BatchRequest),
    Cancel(OperationToken),
    CheckExists,
    Unlock(String),
    CreateVault(String),
    ChangePassword { old: String, new: String },
    ListFiles(PathBuf),
}

pub(crate) struct FakeBackend {
    calls: Mutex<Vec<BackendCall>>,
    sender: mpsc::UnboundedSender<BackendNotification>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<BackendNotification>>>,
    pub vault_exists: AtomicBool,
    pub password: Mutex<String>,
    pub listing: Mutex<Vec<String>>,
    pub reject_launch: Mutex<Option<String>>,
    pub reject_create: Mutex<Option<String>>,
    pub reject_listing: Mutex<Option<String>>,
    /// When set, `launch_batch` waits for `release_launch` before acknowledging
    pub hold_launch: AtomicBool,
    pub release_launch: Notify,
    /// When set, `list_files_recursive` waits for `release_listing` before answering
    pub hold_listing: AtomicBool,
    pub release_listing: Notify,
    /// When set, `cancel_operation` never answers
    pub cancel_hangs: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            calls: Mutex::new(Vec::new()),
            sender,
            receiver: Mutex::new(Some(receiver)),
            vault_exists: AtomicBool::new(true),
            password: Mutex::new("correct horse".to_string()),
            listing: Mutex::new(Vec::new()),
            reject_launch: Mutex::new(None),
            reject_create: Mutex::new(None),
            reject_listing: Mutex::new(None),
            hold_launch: AtomicBool::new(false),
            release_launch: Notify::new(),
            hold_listing: AtomicBool::new(false),
            release_listing: Notify::new(),
            cancel_hangs: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock_ignore_poison().clone()
    }

    pub fn launches(&self) -> Vec<BatchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::LaunchBatch(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> Vec<OperationToken> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Cancel(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn push(&self, notification: BackendNotification) {
        let _ = self.sender.send(notification);
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock_ignore_poison().push(call);
    }
}

impl VaultBackend for FakeBackend {
    async fn launch_batch(&self, request: BatchRequest) -> Result<(), BackendError> {
        self.record(BackendCall::LaunchBatch(request));
        if self.hold_launch.load(Ordering::SeqCst) {
            self.release_launch.notified().await;
        }
        let rejection = self.reject_launch.lock_ignore_poison().clone();
        match rejection {
            Some(message) => Err(BackendError::Rejected(message)),
            None => Ok(()),
        }
    }

    async fn cancel_operation(&self, token: OperationToken) -> Result<(), BackendError> {
        self.record(BackendCall::Cancel(token));
        if self.cancel_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn check_vault_exists(&self) -> Result<bool, BackendError> {
        self.record(BackendCall::CheckExists);
        Ok(self.vault_exists.load(Ordering::SeqCst))
    }

    async fn unlock_vault(&self, password: &str) -> Result<(), BackendError> {
        self.record(BackendCall::Unlock(password.to_string()));
        if *self.password.lock_ignore_poison() == password {
            Ok(())
        } else {
            Err(BackendError::Rejected("Invalid master password".to_string()))
        }
    }

    async fn create_vault(&self, password: &str) -> Result<(), BackendError> {
        self.record(BackendCall::CreateVault(password.to_string()));
        let rejection = self.reject_create.lock_ignore_poison().clone();
        if let Some(message) = rejection {
            return Err(BackendError::Rejected(message));
        }
        *self.password.lock_ignore_poison() = password.to_string();
        Ok(())
    }

    async fn change_master_password(&self, old_password: &str, new_password: &str) -> Result<(), BackendError> {
        self.record(BackendCall::ChangePassword {
            old: old_password.to_string(),
            new: new_password.to_string(),
        });
        let mut password = self.password.lock_ignore_poison();
        if *password != old_password {
            return Err(BackendError::Rejected("Current password is incorrect".to_string()));
        }
        *password = new_password.to_string();
        Ok(())
    }

    async fn list_files_recursive(&self, dir: &Path) -> Result<Vec<String>, BackendError> {
        self.record(BackendCall::ListFiles(dir.to_path_buf()));
        if self.hold_listing.load(Ordering::SeqCst) {
            self.release_listing.notified().await;
        }
        let rejection = self.reject_listing.lock_ignore_poison().clone();
        if let Some(message) = rejection {
            return Err(BackendError::Rejected(message));
        }
        Ok(self.listing.lock_ignore_poison().clone())
    }

    fn subscribe(&self) -> BoxStream<'static, BackendNotification> {
        match self.receiver.lock_ignore_poison().take() {
            Some(receiver) => stream::unfold(receiver, |mut receiver| async move {
                receiver.recv().await.map(|notification| (notification, receiver))
            })
            .boxed(),
            None => stream::empty().boxed(),
        }
    }
}

// ============================================================================
// Notification builders
// ============================================================================

pub(crate) fn processing(
    token: Option<OperationToken>,
    file: &str,
    number: usize,
    total: usize,
    fraction: f64,
) -> BackendNotification {
    BackendNotification::Progress(ProgressEvent {
        operation_token: token,
        status: ProgressEventStatus::Processing,
        current_file_path: file.to_string(),
        number_of_files: total,
        current_file_number: number,
        total_progress_fraction: fraction,
        total_files: None,
        succeeded_files: None,
        failed_files: None,
    })
}

pub(crate) fn done(
    token: Option<OperationToken>,
    total: &[&str],
    succeeded: &[&str],
    failed: &[(&str, &str)],
) -> BackendNotification {
    BackendNotification::Progress(ProgressEvent {
        operation_token: token,
        status: ProgressEventStatus::Done,
        current_file_path: String::new(),
        number_of_files: total.len(),
        current_file_number: total.len(),
        total_progress_fraction: 1.0,
        total_files: Some(total.iter().map(|p| p.to_string()).collect()),
        succeeded_files: Some(
            succeeded
                .iter()
                .map(|p| SucceededFile { path: p.to_string() })
                .collect(),
        ),
        failed_files: Some(
            failed
                .iter()
                .map(|(path, error)| FailedFile {
                    path: path.to_string(),
                    error: error.to_string(),
                })
                .collect(),
        ),
    })
}

pub(crate) fn failure(token: Option<OperationToken>, message: &str) -> BackendNotification {
    BackendNotification::Error(ErrorEvent {
        operation_token: token,
        message: message.to_string(),
    })
}
