use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::sanitize::{sanitize, sanitize_or};
use crate::TagRecord;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Where a file belongs: `root/artist/album/filename`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub root: PathBuf,
    pub artist: String,
    pub album: String,
    pub filename: String,
}

impl Destination {
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.artist).join(&self.album).join(&self.filename)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.artist, self.album, self.filename)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DestinationResolver {
    prefer_album_artist: bool,
}

impl DestinationResolver {
    pub fn new(prefer_album_artist: bool) -> Self {
        Self { prefer_album_artist }
    }

    pub fn resolve(&self, record: &TagRecord, storage_root: impl AsRef<Path>) -> Destination {
        let artist = if self.prefer_album_artist {
            record.album_artist.as_deref().or(record.artist.as_deref())
        } else {
            record.artist.as_deref()
        };

        let stem = sanitize(record.file_stem());
        let title = match record.title.as_deref() {
            Some(title) => sanitize_or(title, &stem),
            None => stem,
        };

        Destination {
            root: storage_root.as_ref().to_path_buf(),
            artist: sanitize_or(artist.unwrap_or(UNKNOWN_ARTIST), UNKNOWN_ARTIST),
            album: sanitize_or(record.album.as_deref().unwrap_or(UNKNOWN_ALBUM), UNKNOWN_ALBUM),
            filename: format!("{}{}", title, record.extension),
        }
    }
}
