use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::{dotted_extension, Result, ShelfError, TagRecord};

/// Tag values as a backend sees them, before file facts are attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    /// kbps, 0 when the backend cannot tell.
    pub bitrate: u32,
}

impl TagFields {
    /// Stores a tag value unless it is blank. NUL padding (RIFF INFO, ASF)
    /// counts as blank.
    pub(crate) fn set(slot: &mut Option<String>, value: &str) {
        let value = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

/// A way of pulling tags out of an audio container.
pub trait TagBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn read_tags(&self, path: &Path) -> Result<TagFields>;

    /// Extensions (lower-cased, with the dot) this backend reads on its own,
    /// ahead of the general backends.
    fn dedicated_extensions(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Reads [`TagRecord`]s, preferring a fast backend and falling back to a
/// second one when the first is missing or chokes on a file. Containers
/// neither general backend knows go to a dedicated backend instead.
pub struct MetadataReader {
    primary: Option<Box<dyn TagBackend>>,
    fallback: Box<dyn TagBackend>,
    dedicated: Vec<Box<dyn TagBackend>>,
    fallback_reported: AtomicBool,
}

impl MetadataReader {
    /// Probes which backends this build offers. Call once at startup.
    pub fn probe() -> Self {
        let primary = super::native_backend();
        if primary.is_none() {
            warn!(
                "Native tag backend unavailable, using symphonia for every file \
                 (build with the `lofty` feature for faster tag reads)"
            );
        }
        let reader = Self::with_backends(primary, Box::new(super::symphonia_backend::SymphoniaBackend))
            .with_dedicated(Box::new(super::asf_backend::AsfBackend));
        info!("Tag backends: {}", reader.backend_names().join(", "));
        reader
    }

    pub fn with_backends(
        primary: Option<Box<dyn TagBackend>>,
        fallback: Box<dyn TagBackend>,
    ) -> Self {
        Self {
            primary,
            fallback,
            dedicated: Vec::new(),
            fallback_reported: AtomicBool::new(false),
        }
    }

    /// Routes the extensions `backend` claims to it alone.
    pub fn with_dedicated(mut self, backend: Box<dyn TagBackend>) -> Self {
        self.dedicated.push(backend);
        self
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.primary
            .iter()
            .map(|b| b.name())
            .chain(std::iter::once(self.fallback.name()))
            .chain(self.dedicated.iter().map(|b| b.name()))
            .collect()
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Result<TagRecord> {
        let path = path.as_ref();
        let file_metadata = std::fs::metadata(path)?;
        if !file_metadata.is_file() {
            return Err(ShelfError::Metadata(format!("{} is not a file", path.display())));
        }
        let extension = dotted_extension(path)
            .ok_or_else(|| ShelfError::UnsupportedFormat(path.display().to_string()))?;

        let dedicated = self
            .dedicated
            .iter()
            .find(|b| b.dedicated_extensions().iter().any(|e| *e == extension));
        if let Some(backend) = dedicated {
            return match backend.read_tags(path) {
                Ok(fields) => Ok(Self::assemble(fields, path, file_metadata.len(), extension, backend.name())),
                Err(e) => Err(ShelfError::TagRead {
                    path: path.to_path_buf(),
                    reason: format!("{}: {}", backend.name(), e),
                }),
            };
        }

        let mut primary_failure = None;
        if let Some(primary) = &self.primary {
            match primary.read_tags(path) {
                Ok(fields) => {
                    return Ok(Self::assemble(fields, path, file_metadata.len(), extension, primary.name()))
                }
                Err(e) => {
                    if !self.fallback_reported.swap(true, Ordering::Relaxed) {
                        warn!(
                            "{} failed on {} ({}), falling back to {}; further fallbacks are logged at debug level",
                            primary.name(),
                            path.display(),
                            e,
                            self.fallback.name()
                        );
                    } else {
                        debug!("{} failed on {}: {}", primary.name(), path.display(), e);
                    }
                    primary_failure = Some(format!("{}: {}", primary.name(), e));
                }
            }
        }

        match self.fallback.read_tags(path) {
            Ok(fields) => Ok(Self::assemble(
                fields,
                path,
                file_metadata.len(),
                extension,
                self.fallback.name(),
            )),
            Err(e) => {
                let fallback_failure = format!("{}: {}", self.fallback.name(), e);
                let reason = match primary_failure {
                    Some(first) => format!("{first}; {fallback_failure}"),
                    None => fallback_failure,
                };
                Err(ShelfError::TagRead {
                    path: path.to_path_buf(),
                    reason,
                })
            }
        }
    }

    fn assemble(
        fields: TagFields,
        path: &Path,
        file_size: u64,
        extension: String,
        backend: &'static str,
    ) -> TagRecord {
        debug!(
            "{}: title={:?} artist={:?} album={:?} bitrate={}kbps (via {})",
            path.display(),
            fields.title,
            fields.artist,
            fields.album,
            fields.bitrate,
            backend
        );
        TagRecord {
            title: fields.title,
            artist: fields.artist,
            album_artist: fields.album_artist,
            album: fields.album,
            bitrate: fields.bitrate,
            file_size,
            extension,
            source_path: path.to_path_buf(),
            backend,
        }
    }
}
