//! Operation result report.
//!
//! Built from the backend's `done` notification and shown as three tabs: all files, the
//! ones that succeeded and the ones that failed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::staging::display_file_name;
use crate::types::{FailedFile, ProgressEvent, SucceededFile};

/// Error recorded for a file the backend listed but never reported on.
pub const NO_RESULT_REPORTED: &str = "no result reported";

/// Final report of one operation.
///
/// Every path in `total_files` is in exactly one of `succeeded_files` / `failed_files`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub total_files: Vec<String>,
    pub succeeded_files: Vec<SucceededFile>,
    pub failed_files: Vec<FailedFile>,
}

impl OperationResult {
    /// Builds a partitioned result from the lists in a `done` event.
    ///
    /// A failure report wins over a success report for the same path, and a listed path
    /// with no report at all counts as failed.
    pub fn from_reports(total: &[String], succeeded: &[SucceededFile], failed: &[FailedFile]) -> Self {
        let mut errors: HashMap<&str, &str> = HashMap::new();
        for file in failed {
            errors.entry(file.path.as_str()).or_insert(file.error.as_str());
        }
        let succeeded_paths: HashSet<&str> = succeeded.iter().map(|f| f.path.as_str()).collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let all_paths = total
            .iter()
            .chain(succeeded.iter().map(|f| &f.path))
            .chain(failed.iter().map(|f| &f.path));

        let mut result = Self::default();
        for path in all_paths {
            if !seen.insert(path.as_str()) {
                continue;
            }
            result.total_files.push(path.clone());
            if let Some(error) = errors.get(path.as_str()) {
                result.failed_files.push(FailedFile {
                    path: path.clone(),
                    error: (*error).to_string(),
                });
            } else if succeeded_paths.contains(path.as_str()) {
                result.succeeded_files.push(SucceededFile { path: path.clone() });
            } else {
                result.failed_files.push(FailedFile {
                    path: path.clone(),
                    error: NO_RESULT_REPORTED.to_string(),
                });
            }
        }
        result
    }

    pub fn from_done_event(event: &ProgressEvent) -> Self {
        Self::from_reports(
            event.total_files.as_deref().unwrap_or_default(),
            event.succeeded_files.as_deref().unwrap_or_default(),
            event.failed_files.as_deref().unwrap_or_default(),
        )
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            total: self.total_files.len(),
            succeeded: self.succeeded_files.len(),
            failed: self.failed_files.len(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTab {
    #[default]
    All,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub path: String,
    pub file_name: String,
    /// Only set on the failed tab
    pub error: Option<String>,
}

impl ResultEntry {
    fn new(path: &str, error: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            file_name: display_file_name(path).to_string(),
            error: error.map(str::to_string),
        }
    }
}

/// Contents of the selected tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "entries", rename_all = "snake_case")]
pub enum TabListing {
    Entries(Vec<ResultEntry>),
    /// The failed tab has nothing to show
    NoEntries,
}

/// Read-side view over the current result. Owns nothing but the selected tab.
#[derive(Debug, Default)]
pub struct ResultPartitioner {
    result: Option<OperationResult>,
    tab: ResultTab,
}

impl ResultPartitioner {
    /// Shows a new result, starting on the "all" tab.
    pub fn show(&mut self, result: OperationResult) {
        self.result = Some(result);
        self.tab = ResultTab::All;
    }

    pub fn clear(&mut self) {
        self.result = None;
        self.tab = ResultTab::All;
    }

    pub fn result(&self) -> Option<&OperationResult> {
        self.result.as_ref()
    }

    pub fn selected_tab(&self) -> ResultTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: ResultTab) {
        self.tab = tab;
    }

    /// Lists the selected tab, or `None` when no report is open.
    pub fn listing(&self) -> Option<TabListing> {
        self.result.as_ref().map(|result| listing_for(result, self.tab))
    }
}

fn listing_for(result: &OperationResult, tab: ResultTab) -> TabListing {
    match tab {
        ResultTab::All => TabListing::Entries(result.total_files.iter().map(|p| ResultEntry::new(p, None)).collect()),
        ResultTab::Succeeded => TabListing::Entries(
            result
                .succeeded_files
                .iter()
                .map(|f| ResultEntry::new(&f.path, None))
                .collect(),
        ),
        ResultTab::Failed if result.failed_files.is_empty() => TabListing::NoEntries,
        ResultTab::Failed => TabListing::Entries(
            result
                .failed_files
                .iter()
                .map(|f| ResultEntry::new(&f.path, Some(&f.error)))
                .collect(),
        ),
    }
}
