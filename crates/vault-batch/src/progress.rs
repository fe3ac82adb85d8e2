//! Folds backend progress notifications into an [`OperationProgress`] snapshot.
//!
//! Pure state: token filtering happens before anything reaches the tracker.

use crate::types::{OperationProgress, OperationStatus, ProgressEvent};

#[derive(Debug, Default)]
pub(crate) struct ProgressTracker {
    snapshot: OperationProgress,
    /// A `done` arrived; waiting for the display delay before switching to Done
    finishing: bool,
}

impl ProgressTracker {
    pub fn snapshot(&self) -> &OperationProgress {
        &self.snapshot
    }

    pub fn status(&self) -> OperationStatus {
        self.snapshot.status
    }

    pub fn is_finishing(&self) -> bool {
        self.finishing
    }

    /// Resets the snapshot for a freshly launched operation.
    pub fn start(&mut self, first_file: &str, number_of_files: usize) {
        self.snapshot = OperationProgress::starting(first_file, number_of_files);
        self.finishing = false;
    }

    pub fn reset(&mut self) {
        self.snapshot = OperationProgress::idle();
        self.finishing = false;
    }

    /// Applies a `processing` event. Returns false when the event was ignored.
    pub fn apply_processing(&mut self, event: &ProgressEvent) -> bool {
        if self.snapshot.status != OperationStatus::Processing || self.finishing {
            return false;
        }

        let number_of_files = if event.number_of_files > 0 {
            event.number_of_files
        } else {
            self.snapshot.number_of_files
        };

        self.snapshot.current_file_path = event.current_file_path.clone();
        self.snapshot.number_of_files = number_of_files;
        self.snapshot.current_file_number = event.current_file_number.min(number_of_files);
        self.snapshot.total_progress_percent = fraction_to_percent(event.total_progress_fraction)
            .max(self.snapshot.total_progress_percent);
        true
    }

    /// Jumps to 100% on `done`. Status stays Processing until [`finish`](Self::finish).
    pub fn begin_finish(&mut self) -> bool {
        if self.snapshot.status != OperationStatus::Processing || self.finishing {
            return false;
        }
        self.finishing = true;
        self.snapshot.total_progress_percent = 100.0;
        self.snapshot.current_file_number = self.snapshot.number_of_files;
        true
    }

    pub fn finish(&mut self) {
        self.snapshot.status = OperationStatus::Done;
        self.finishing = false;
    }
}

fn fraction_to_percent(fraction: f64) -> f64 {
    if !fraction.is_finite() {
        return 0.0;
    }
    fraction.clamp(0.0, 1.0) * 100.0
}
