//! Client-side controller for batch encrypt, decrypt and secure-delete operations.
//!
//! The cryptographic work happens in an external vault backend reached through the
//! [`VaultBackend`] trait. This crate stages file paths, launches batches, folds the
//! backend's progress stream into a snapshot, reconciles cancellation with late events
//! through per-operation tokens, and partitions the final report into successes and
//! failures. It also carries the small vault session gate.

// Deny unused code so dead helpers get caught
#![deny(unused)]
// Warn on unused dependencies to catch cfg mismatches
#![warn(unused_crate_dependencies)]
// Warn on redundant path prefixes (e.g., std::path::Path when Path is imported)
#![warn(unused_qualifications)]
// Use log::* macros instead of println!/eprintln! for proper log level control
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod backend;
pub mod config;
mod controller;
mod error;
mod gate;
mod ignore_poison;
mod progress;
pub mod results;
pub mod session;
pub mod staging;
mod token;
pub mod types;

#[cfg(test)]
mod test_support;

pub use backend::{BatchRequest, VaultBackend};
pub use config::{ControllerConfig, default_config_path, load_config};
pub use controller::BatchController;
pub use error::{BackendError, ControllerError};
pub use results::{OperationResult, ResultEntry, ResultSummary, ResultTab, TabListing};
pub use session::{SessionAction, VaultSession, VaultSessionState};
pub use staging::{StagedFile, StagedFileSet};
pub use token::OperationToken;
pub use types::{
    BackendNotification, ControllerNotice, ErrorEvent, FailedFile, OperationKind, OperationProgress, OperationStatus,
    ProgressEvent, ProgressEventStatus, SucceededFile,
};
