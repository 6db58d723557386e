use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Top-level settings loaded from `tagshelf.ini` (or any format `config`
/// understands, picked by file extension).
///
/// Precedence (highest wins):
/// 1) Command-line flags
/// 2) Environment variables (prefix `TAGSHELF__`, `__` as nested separator)
/// 3) Config file (if present)
/// 4) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub organizer: OrganizerSettings,
    pub audio_formats: AudioFormatSettings,
    pub logging: LoggingSettings,
    pub playlist: PlaylistSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrganizerSettings {
    /// Directory scanned for audio files.
    pub source: String,
    /// Root of the artist/album tree.
    pub storage: String,
    pub mode: TransferMode,
    /// Use the album artist, when tagged, for the artist directory.
    pub prefer_album_artist: bool,
    /// Tag reading threads, 0 for one per CPU.
    pub threads: usize,
    /// Files read ahead in parallel before arbitration.
    pub chunk_size: usize,
}

impl Default for OrganizerSettings {
    fn default() -> Self {
        Self {
            source: String::new(),
            storage: String::new(),
            mode: TransferMode::Move,
            prefer_album_artist: false,
            threads: 0,
            chunk_size: 64,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Move,
    Copy,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Move => write!(f, "move"),
            TransferMode::Copy => write!(f, "copy"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioFormatSettings {
    /// Comma-separated, with or without the leading dot.
    pub extensions: String,
}

impl Default for AudioFormatSettings {
    fn default() -> Self {
        Self {
            extensions: ".mp3,.flac,.ogg,.mp4,.m4a,.wma,.aac,.opus".to_string(),
        }
    }
}

impl AudioFormatSettings {
    pub fn extension_set(&self) -> ExtensionSet {
        ExtensionSet::parse(&self.extensions)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
    /// Also write log lines here; empty for none.
    pub log_file: String,
    pub console_output: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: String::new(),
            console_output: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    pub generate: bool,
    /// File name; `{date}`, `{time}` and `{datetime}` are filled in.
    pub name_template: String,
    /// Where the playlist goes; empty for the storage root.
    pub directory: String,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            generate: false,
            name_template: "tagshelf_{datetime}.m3u".to_string(),
            directory: String::new(),
        }
    }
}

/// Lower-cased extensions with a leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn parse(list: &str) -> Self {
        Self::from_iter(list.split(','))
    }

    pub fn matches(&self, path: &Path) -> bool {
        crate::dotted_extension(path).is_some_and(|ext| self.0.contains(&ext))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .map(|e| format!(".{e}"))
                .collect(),
        )
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iter().collect::<Vec<_>>().join(", "))
    }
}
