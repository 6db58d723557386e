use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

use super::metadata::{TagBackend, TagFields};
use crate::{Result, ShelfError};

/// Pure-Rust backend. Slower than the native one since it probes the
/// container the way a decoder would, but it never needs anything beyond
/// this crate.
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    fn apply_revision(fields: &mut TagFields, revision: &MetadataRevision) {
        for tag in revision.tags() {
            let slot = match tag.std_key {
                Some(StandardTagKey::TrackTitle) => &mut fields.title,
                Some(StandardTagKey::Artist) => &mut fields.artist,
                Some(StandardTagKey::AlbumArtist) => &mut fields.album_artist,
                Some(StandardTagKey::Album) => &mut fields.album,
                _ => continue,
            };
            TagFields::set(slot, &tag.value.to_string());
        }
    }
}

impl TagBackend for SymphoniaBackend {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn read_tags(&self, path: &Path) -> Result<TagFields> {
        let file = std::fs::File::open(path)?;
        let size_bytes = file.metadata()?.len();

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let mut probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ShelfError::Metadata(e.to_string()))?;

        let mut format = probed.format;
        let mut fields = TagFields::default();

        if let Some(track) = format.default_track() {
            let params = &track.codec_params;
            if let (Some(time_base), Some(n_frames)) = (params.time_base, params.n_frames) {
                let time = time_base.calc_time(n_frames);
                let duration = time.seconds as f64 + time.frac;
                if duration > 0.0 {
                    let bitrate = (size_bytes * 8) as f64 / duration;
                    fields.bitrate = (bitrate / 1000.0) as u32;
                }
            }
        }

        // Tags found ahead of the container (ID3v2 on MP3, say) first, then
        // the container's own, which take precedence.
        if let Some(metadata) = probed.metadata.get() {
            if let Some(revision) = metadata.current() {
                Self::apply_revision(&mut fields, revision);
            }
        }
        if let Some(revision) = format.metadata().current() {
            Self::apply_revision(&mut fields, revision);
        }

        Ok(fields)
    }
}
