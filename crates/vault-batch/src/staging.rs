//! Staged file set.
//!
//! Paths the user picked for the next batch operation, deduplicated by path and kept in the
//! order they were first added.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A file path queued for the next batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StagedFile {
    pub path: String,
}

impl StagedFile {
    /// File name shown in lists (last path component, `/` or `\` separated).
    pub fn file_name(&self) -> &str {
        display_file_name(&self.path)
    }
}

/// Returns the last component of `path`, accepting both separator styles.
pub fn display_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[derive(Debug, Default, Clone)]
pub struct StagedFileSet {
    files: Vec<StagedFile>,
    seen: HashSet<String>,
}

impl StagedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `paths` into the set, dropping any path already present.
    ///
    /// Returns how many paths were actually added.
    pub fn add<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut added = 0;
        for path in paths {
            let path = path.into();
            if self.seen.insert(path.clone()) {
                self.files.push(StagedFile { path });
                added += 1;
            }
        }
        added
    }

    /// Removes one entry. Returns false if the path wasn't staged.
    pub fn remove(&mut self, path: &str) -> bool {
        if !self.seen.remove(path) {
            return false;
        }
        self.files.retain(|f| f.path != path);
        true
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.seen.clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.seen.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Staged paths in first-seen order.
    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}
