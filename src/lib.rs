use std::path::{Path, PathBuf};

pub mod analyzers;
pub mod audio;
pub mod cli;
pub mod config;
pub mod organizer;
pub mod utils;

/// Tags and file facts for one source file, normalized across container formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    /// kbps, 0 when unknown.
    pub bitrate: u32,
    pub file_size: u64,
    /// Lower-cased, with the leading dot.
    pub extension: String,
    pub source_path: PathBuf,
    pub backend: &'static str,
}

impl TagRecord {
    pub fn file_stem(&self) -> &str {
        self.source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Lower-cased `.ext` of `path`, if it has a UTF-8 extension.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_lowercase()))
}

#[derive(Debug, thiserror::Error)]
pub enum ShelfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metadata extraction error: {0}")]
    Metadata(String),
    #[error("Could not read tags from {}: {reason}", path.display())]
    TagRead { path: PathBuf, reason: String },
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Filesystem error on {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Settings error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Logger error: {0}")]
    Log(#[from] log::SetLoggerError),
}

impl ShelfError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ShelfError::Filesystem { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;

// Re-exports for convenience
pub use analyzers::duplicate::{ArbitrationOutcome, Criterion, Decision, DuplicateArbiter};
pub use audio::metadata::{MetadataReader, TagBackend, TagFields};
pub use organizer::destination::{Destination, DestinationResolver};
pub use organizer::pipeline::{Pipeline, RunConfig};
pub use organizer::stats::{Disposition, FileReport, RunStatistics};
pub use utils::sanitize::{sanitize, sanitize_or};
