//! Batch operation controller.
//!
//! Owns the staged files, the cancellation gate, the progress snapshot and the result
//! report for one screen. A listener task consumes the backend's notification stream for
//! the controller's whole lifetime and folds it into the snapshot, but only for the live
//! token: anything from a cancelled, failed or superseded operation is dropped.
//!
//! State lives behind one mutex that is never held across an `.await`, so UI calls, the
//! listener and the done timer all serialize on it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend::{BatchRequest, VaultBackend};
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::gate::CancellationGate;
use crate::ignore_poison::IgnorePoison;
use crate::progress::ProgressTracker;
use crate::results::{OperationResult, ResultPartitioner, ResultSummary, ResultTab, TabListing};
use crate::staging::{StagedFile, StagedFileSet};
use crate::token::OperationToken;
use crate::types::{
    BackendNotification, ControllerNotice, OperationKind, OperationProgress, OperationStatus, ProgressEvent,
    ProgressEventStatus,
};

// ============================================================================
// Shared state
// ============================================================================

struct ControllerState {
    kind: OperationKind,
    staged: StagedFileSet,
    gate: CancellationGate,
    progress: ProgressTracker,
    report: ResultPartitioner,
    /// Pending 100% -> Done flip
    done_timer: Option<JoinHandle<()>>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            kind: OperationKind::default(),
            staged: StagedFileSet::new(),
            gate: CancellationGate::default(),
            progress: ProgressTracker::default(),
            report: ResultPartitioner::default(),
            done_timer: None,
        }
    }

    fn abort_done_timer(&mut self) {
        if let Some(timer) = self.done_timer.take() {
            timer.abort();
        }
    }

    /// Back to a quiet Idle screen. The live token, if any, stops being live.
    fn reset_to_idle(&mut self) {
        self.gate.invalidate();
        self.abort_done_timer();
        self.progress.reset();
        self.report.clear();
    }
}

/// Everything the listener and timer tasks need.
struct Shared {
    state: Mutex<ControllerState>,
    notices: broadcast::Sender<ControllerNotice>,
    config: ControllerConfig,
    runtime: Handle,
}

impl Shared {
    fn notify(&self, notice: ControllerNotice) {
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }

    fn notify_error(&self, error: ControllerError) {
        self.notify(ControllerNotice::Error { error });
    }

    /// Applies one backend notification. The gate check and the write happen under the
    /// same lock.
    fn handle_notification(self: &Arc<Self>, notification: BackendNotification) {
        let mut state = self.state.lock_ignore_poison();

        let Some(token) = notification.token().or(state.gate.current()) else {
            log::debug!("handle_notification: no operation was ever launched, dropping {:?}", notification);
            return;
        };
        if !state.gate.is_live(token) {
            log::debug!("handle_notification: dropping notification for stale {}", token);
            return;
        }

        match notification {
            BackendNotification::Progress(event) => match event.status {
                ProgressEventStatus::Processing => {
                    if !state.progress.apply_processing(&event) {
                        log::debug!("handle_notification: {} already finishing, ignoring progress", token);
                    }
                }
                ProgressEventStatus::Done => self.begin_finish(&mut state, token, &event),
            },
            BackendNotification::Error(event) => {
                if state.progress.status() != OperationStatus::Processing || state.progress.is_finishing() {
                    log::debug!("handle_notification: {} already done, ignoring error {:?}", token, event.message);
                    return;
                }
                state.reset_to_idle();
                drop(state);

                log::warn!("handle_notification: {} failed: {}", token, event.message);
                self.notify_error(ControllerError::OperationFailed { message: event.message });
            }
        }
    }

    fn begin_finish(self: &Arc<Self>, state: &mut ControllerState, token: OperationToken, event: &ProgressEvent) {
        if !state.progress.begin_finish() {
            log::debug!("handle_notification: duplicate done for {}", token);
            return;
        }
        let result = OperationResult::from_done_event(event);
        state.abort_done_timer();

        let shared = Arc::clone(self);
        let delay = self.config.done_display_delay();
        state.done_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.finish(token, result);
        }));
    }

    /// Runs when the display delay is over.
    fn finish(&self, token: OperationToken, result: OperationResult) {
        let mut state = self.state.lock_ignore_poison();
        if !state.gate.is_live(token) || !state.progress.is_finishing() {
            log::debug!("finish: {} is no longer current, dropping its result", token);
            return;
        }
        state.done_timer = None;
        state.progress.finish();
        let summary = result.summary();
        state.report.show(result);
        drop(state);

        log::info!(
            "finish: {} done, {} of {} files succeeded",
            token,
            summary.succeeded,
            summary.total
        );
        self.notify(ControllerNotice::Completed {
            token,
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
        });
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct BatchController<B: VaultBackend> {
    backend: Arc<B>,
    shared: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<B: VaultBackend> BatchController<B> {
    /// Creates the controller and subscribes to the backend's notifications.
    ///
    /// Must be called from within a Tokio runtime; the listener, the done timer and cancel
    /// requests all run on it. Other methods may be called from any thread.
    pub fn new(backend: Arc<B>, config: ControllerConfig) -> Self {
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        let runtime = Handle::current();
        let shared = Arc::new(Shared {
            state: Mutex::new(ControllerState::new()),
            notices,
            config,
            runtime: runtime.clone(),
        });

        let mut stream = backend.subscribe();
        let listener_shared = Arc::clone(&shared);
        let listener = runtime.spawn(async move {
            while let Some(notification) = stream.next().await {
                listener_shared.handle_notification(notification);
            }
            log::debug!("BatchController: backend notification stream ended");
        });

        Self {
            backend,
            shared,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<ControllerNotice> {
        self.shared.notices.subscribe()
    }

    // ========================================
    // Operation kind and staging
    // ========================================

    pub fn operation_kind(&self) -> OperationKind {
        self.state().kind
    }

    /// Switches to another operation kind. Staged files don't carry over.
    ///
    /// Returns true if the kind actually changed.
    pub fn switch_operation_kind(&self, kind: OperationKind) -> bool {
        let mut state = self.state();
        if state.kind == kind {
            return false;
        }
        log::debug!("switch_operation_kind: {} -> {}, clearing {} staged", state.kind, kind, state.staged.len());
        state.kind = kind;
        state.staged.clear();
        true
    }

    /// Stages picked files. Returns how many were new.
    pub fn stage_files<I, P>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.state().staged.add(paths)
    }

    /// Stages every file below `dir`, as listed by the backend.
    ///
    /// For decryption only files with the encrypted extension are kept. If the operation
    /// kind changes while the listing is in flight, the listing is dropped and nothing is
    /// staged.
    pub async fn stage_folder(&self, dir: &Path) -> Result<usize, ControllerError> {
        let dir_display = dir.display().to_string();
        let kind = self.operation_kind();
        let listed = match self.backend.list_files_recursive(dir).await {
            Ok(files) => files,
            Err(e) => {
                log::warn!("stage_folder: listing {:?} failed: {}", dir, e);
                return Err(self.surface(ControllerError::BackendRejected {
                    message: e.message().to_string(),
                }));
            }
        };
        if listed.is_empty() {
            return Err(self.surface(ControllerError::NoFilesInFolder { path: dir_display }));
        }

        let mut state = self.state();
        if state.kind != kind {
            log::debug!("stage_folder: kind switched to {} while listing {:?}, dropping listing", state.kind, dir);
            return Ok(0);
        }
        let files: Vec<String> = if kind == OperationKind::Decrypt {
            let config = &self.shared.config;
            listed.into_iter().filter(|f| config.is_encrypted_path(f)).collect()
        } else {
            listed
        };
        if files.is_empty() {
            drop(state);
            return Err(self.surface(ControllerError::NoEncryptedFiles {
                path: dir_display,
                extension: self.shared.config.encrypted_extension.clone(),
            }));
        }
        Ok(state.staged.add(files))
    }

    pub fn remove_staged(&self, path: &str) -> bool {
        self.state().staged.remove(path)
    }

    pub fn clear_staged(&self) {
        self.state().staged.clear();
    }

    pub fn staged_files(&self) -> Vec<StagedFile> {
        self.state().staged.files().to_vec()
    }

    // ========================================
    // Launch and cancel
    // ========================================

    /// Launches the current operation kind over all staged files.
    ///
    /// `destination` is required for encrypt and decrypt and ignored for secure delete.
    /// Resolves once the backend has accepted the batch; progress arrives through the
    /// notification stream.
    pub async fn launch(&self, destination: Option<PathBuf>) -> Result<OperationToken, ControllerError> {
        let (request, superseded) = {
            let mut state = self.state();
            let kind = state.kind;
            if state.staged.is_empty() {
                drop(state);
                return Err(self.surface(ControllerError::NoFilesStaged { kind }));
            }
            let destination_dir = match (kind.needs_destination(), destination) {
                (false, _) => None,
                (true, Some(dir)) => Some(dir),
                (true, None) => {
                    log::debug!("launch: no destination chosen for {}, aborting", kind);
                    return Err(ControllerError::NoDestinationChosen { kind });
                }
            };

            let files = state.staged.paths();
            // A finished batch still holds the live token while its report is up
            let still_running =
                state.progress.status() == OperationStatus::Processing && !state.progress.is_finishing();
            let superseded = state.gate.live_token().filter(|_| still_running);
            state.reset_to_idle();
            let token = state.gate.open();
            state.progress.start(&files[0], files.len());

            let request = BatchRequest {
                token,
                kind,
                files,
                destination_dir,
            };
            (request, superseded)
        };

        if let Some(old) = superseded {
            log::info!("launch: {} supersedes running {}", request.token, old);
            self.request_backend_cancel(old);
        }

        let token = request.token;
        let submitted = request.files.clone();
        log::info!(
            "launch: {} {} of {} files, destination={:?}",
            token,
            request.kind,
            submitted.len(),
            request.destination_dir
        );

        match self.backend.launch_batch(request).await {
            Ok(()) => {
                let mut state = self.state();
                for path in &submitted {
                    state.staged.remove(path);
                }
                Ok(token)
            }
            Err(e) => {
                log::warn!("launch: backend rejected {}: {}", token, e);
                {
                    let mut state = self.state();
                    if state.gate.invalidate_if_current(token) {
                        state.reset_to_idle();
                    }
                }
                Err(self.surface(ControllerError::BackendRejected {
                    message: e.message().to_string(),
                }))
            }
        }
    }

    /// Cancels the running operation.
    ///
    /// The snapshot is back to Idle before this returns, and nothing the backend sends for
    /// the cancelled token will show up afterwards. The backend is asked to stop in the
    /// background; its answer only gets logged. Returns the cancelled token, or `None`
    /// if nothing was running.
    pub fn cancel(&self) -> Option<OperationToken> {
        let token = {
            let mut state = self.state();
            if state.progress.status() != OperationStatus::Processing {
                return None;
            }
            let token = state.gate.live_token()?;
            state.reset_to_idle();
            token
        };

        log::info!("cancel: cancelled {}", token);
        self.request_backend_cancel(token);
        self.shared.notify(ControllerNotice::Cancelled { token });
        Some(token)
    }

    fn request_backend_cancel(&self, token: OperationToken) {
        let backend = Arc::clone(&self.backend);
        self.shared.runtime.spawn(async move {
            match backend.cancel_operation(token).await {
                Ok(()) => log::debug!("cancel: backend acknowledged stop of {}", token),
                Err(e) => log::warn!("cancel: backend stop of {} failed: {}", token, e),
            }
        });
    }

    // ========================================
    // Progress and report
    // ========================================

    pub fn progress(&self) -> OperationProgress {
        self.state().progress.snapshot().clone()
    }

    /// The token whose notifications are currently accepted.
    pub fn live_token(&self) -> Option<OperationToken> {
        self.state().gate.live_token()
    }

    pub fn result(&self) -> Option<OperationResult> {
        self.state().report.result().cloned()
    }

    pub fn result_summary(&self) -> Option<ResultSummary> {
        self.state().report.result().map(OperationResult::summary)
    }

    pub fn select_result_tab(&self, tab: ResultTab) {
        self.state().report.select_tab(tab);
    }

    pub fn selected_result_tab(&self) -> ResultTab {
        self.state().report.selected_tab()
    }

    pub fn result_listing(&self) -> Option<TabListing> {
        self.state().report.listing()
    }

    /// Closes the report (or the 100% screen right before it) and returns to Idle.
    ///
    /// Returns false if there was nothing to close.
    pub fn close_report(&self) -> bool {
        let mut state = self.state();
        let closable = state.progress.status() == OperationStatus::Done || state.progress.is_finishing();
        if !closable {
            return false;
        }
        state.reset_to_idle();
        true
    }

    // ========================================
    // Teardown
    // ========================================

    /// Stops listening to the backend and drops any pending done timer.
    ///
    /// Called on drop; calling it earlier is fine.
    pub fn shutdown(&self) {
        if let Some(listener) = self.listener.lock_ignore_poison().take() {
            log::debug!("BatchController: unsubscribing from backend notifications");
            listener.abort();
        }
        self.state().abort_done_timer();
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.shared.state.lock_ignore_poison()
    }

    /// Publishes `error` as a notice unless it's a silent one, and hands it back.
    fn surface(&self, error: ControllerError) -> ControllerError {
        if !error.is_silent() {
            self.shared.notify_error(error.clone());
        }
        error
    }
}

impl<B: VaultBackend> Drop for BatchController<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
