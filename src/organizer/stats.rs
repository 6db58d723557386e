use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::TagRecord;

/// Final fate of one processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Moved,
    Replaced,
    Skipped,
    Unchanged,
    Errored,
}

/// One row of the per-file run report.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub disposition: Disposition,
    pub bitrate: Option<u32>,
    pub size_bytes: Option<u64>,
    pub backend: String,
    pub reason: String,
}

impl FileReport {
    pub fn new(
        record: &TagRecord,
        destination: &Path,
        disposition: Disposition,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source: record.source_path.clone(),
            destination: Some(destination.to_path_buf()),
            disposition,
            bitrate: Some(record.bitrate),
            size_bytes: Some(record.file_size),
            backend: record.backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unreadable(source: &Path, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            disposition: Disposition::Errored,
            bitrate: None,
            size_bytes: None,
            backend: String::new(),
            reason: reason.into(),
        }
    }
}

/// Counters and playlist entries for one run.
///
/// Counters describe where each file ended up. A file moved into place and
/// later displaced by a better copy is counted as skipped, not moved.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub processed: usize,
    pub moved: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub errored: usize,
    /// Destination paths in the order they were first filled.
    pub playlist: Vec<PathBuf>,
    pub entries: Vec<FileReport>,
    listed: HashSet<PathBuf>,
}

impl RunStatistics {
    /// Records a processed file and returns its row index.
    pub fn record(&mut self, report: FileReport) -> usize {
        self.processed += 1;
        *self.counter(report.disposition) += 1;
        self.entries.push(report);
        self.entries.len() - 1
    }

    /// Changes the disposition of an already recorded file.
    pub fn reclassify(&mut self, index: usize, disposition: Disposition, reason: impl Into<String>) {
        let Some(previous) = self.entries.get(index).map(|e| e.disposition) else {
            return;
        };
        *self.counter(previous) -= 1;
        *self.counter(disposition) += 1;
        let entry = &mut self.entries[index];
        entry.disposition = disposition;
        entry.reason = reason.into();
    }

    pub fn add_placed(&mut self, path: &Path) {
        if self.listed.insert(path.to_path_buf()) {
            self.playlist.push(path.to_path_buf());
        }
    }

    pub fn duplicates(&self) -> usize {
        self.replaced + self.skipped
    }

    fn counter(&mut self, disposition: Disposition) -> &mut usize {
        match disposition {
            Disposition::Moved => &mut self.moved,
            Disposition::Replaced => &mut self.replaced,
            Disposition::Skipped => &mut self.skipped,
            Disposition::Unchanged => &mut self.unchanged,
            Disposition::Errored => &mut self.errored,
        }
    }
}
