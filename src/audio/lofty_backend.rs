use std::path::Path;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::ItemKey;

use super::metadata::{TagBackend, TagFields};
use crate::{Result, ShelfError};

/// Native tag parser. Reads only the tag blocks and stream headers, which
/// makes it much quicker than probing the whole container.
pub struct LoftyBackend;

impl TagBackend for LoftyBackend {
    fn name(&self) -> &'static str {
        "lofty"
    }

    fn read_tags(&self, path: &Path) -> Result<TagFields> {
        let tagged_file =
            lofty::read_from_path(path).map_err(|e| ShelfError::Metadata(e.to_string()))?;

        let properties = tagged_file.properties();
        let mut fields = TagFields {
            bitrate: properties
                .audio_bitrate()
                .or_else(|| properties.overall_bitrate())
                .unwrap_or(0),
            ..TagFields::default()
        };

        // Primary tag first (ID3v2, Vorbis comments, ilst...), then whatever
        // else the file carries for the fields still missing.
        let tags = tagged_file
            .primary_tag()
            .into_iter()
            .chain(tagged_file.tags().iter());
        for tag in tags {
            let slots = [
                (ItemKey::TrackTitle, &mut fields.title),
                (ItemKey::TrackArtist, &mut fields.artist),
                (ItemKey::AlbumArtist, &mut fields.album_artist),
                (ItemKey::AlbumTitle, &mut fields.album),
            ];
            for (key, slot) in slots {
                if slot.is_none() {
                    if let Some(value) = tag.get_string(&key) {
                        TagFields::set(slot, value);
                    }
                }
            }
        }

        Ok(fields)
    }
}
