use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::metadata::{TagBackend, TagFields};
use crate::{Result, ShelfError};

type Guid = [u8; 16];

const HEADER_OBJECT: Guid = [
    0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];
const FILE_PROPERTIES: Guid = [
    0xA1, 0xDC, 0xAB, 0x8C, 0x47, 0xA9, 0xCF, 0x11, 0x8E, 0xE4, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65,
];
const CONTENT_DESCRIPTION: Guid = [
    0x33, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];
const EXTENDED_CONTENT_DESCRIPTION: Guid = [
    0x40, 0xA4, 0xD0, 0xD2, 0x07, 0xE3, 0xD2, 0x11, 0x97, 0xF0, 0x00, 0xA0, 0xC9, 0x5E, 0xA8, 0x50,
];

/// GUID, size, object count and two reserved bytes.
const HEADER_PREAMBLE: usize = 30;
/// GUID and size of every child object.
const OBJECT_PREAMBLE: u64 = 24;
const MAX_HEADER_BYTES: u64 = 16 * 1024 * 1024;

/// File Properties flag: duration fields are meaningless.
const BROADCAST_FLAG: u32 = 0x01;
const UNICODE_VALUE: u16 = 0;

/// Reads the header objects of ASF containers (WMA). Neither general
/// backend understands them.
pub struct AsfBackend;

impl TagBackend for AsfBackend {
    fn name(&self) -> &'static str {
        "asf"
    }

    fn dedicated_extensions(&self) -> &'static [&'static str] {
        &[".wma", ".asf"]
    }

    fn read_tags(&self, path: &Path) -> Result<TagFields> {
        let mut file = File::open(path)?;
        let size_bytes = file.metadata()?.len();

        let mut preamble = [0u8; HEADER_PREAMBLE];
        file.read_exact(&mut preamble)
            .map_err(|_| malformed("file too short for an ASF header"))?;
        let mut cursor = Cursor::new(&preamble);
        if cursor.array::<16>()? != HEADER_OBJECT {
            return Err(malformed("not an ASF file"));
        }
        let header_size = cursor.u64()?;
        let object_count = cursor.u32()?;
        if header_size < HEADER_PREAMBLE as u64 || header_size > MAX_HEADER_BYTES {
            return Err(malformed(format!("implausible header size {header_size}")));
        }

        let mut body = vec![0u8; (header_size - HEADER_PREAMBLE as u64) as usize];
        file.read_exact(&mut body)
            .map_err(|_| malformed("header is truncated"))?;

        let mut fields = TagFields::default();
        let mut objects = Cursor::new(&body);
        for _ in 0..object_count {
            if objects.is_empty() {
                break;
            }
            let guid = objects.array::<16>()?;
            let object_size = objects.u64()?;
            let len = object_size
                .checked_sub(OBJECT_PREAMBLE)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| malformed(format!("object size {object_size} is too small")))?;
            let mut object = Cursor::new(objects.take(len)?);

            match guid {
                CONTENT_DESCRIPTION => read_content_description(&mut object, &mut fields)?,
                EXTENDED_CONTENT_DESCRIPTION => read_extended_content(&mut object, &mut fields)?,
                FILE_PROPERTIES => fields.bitrate = read_bitrate(&mut object, size_bytes)?,
                _ => {}
            }
        }

        Ok(fields)
    }
}

/// Title and author, in that order among five length-prefixed strings.
fn read_content_description(object: &mut Cursor<'_>, fields: &mut TagFields) -> Result<()> {
    let title_len = object.u16()? as usize;
    let author_len = object.u16()? as usize;
    // copyright, description, rating
    for _ in 0..3 {
        object.u16()?;
    }
    TagFields::set(&mut fields.title, &utf16(object.take(title_len)?));
    TagFields::set(&mut fields.artist, &utf16(object.take(author_len)?));
    Ok(())
}

fn read_extended_content(object: &mut Cursor<'_>, fields: &mut TagFields) -> Result<()> {
    let count = object.u16()?;
    for _ in 0..count {
        let name_len = object.u16()? as usize;
        let name = utf16(object.take(name_len)?);
        let value_type = object.u16()?;
        let value_len = object.u16()? as usize;
        let value = object.take(value_len)?;
        if value_type != UNICODE_VALUE {
            continue;
        }

        let slot = match name.trim_end_matches('\0') {
            "WM/AlbumTitle" => &mut fields.album,
            "WM/AlbumArtist" => &mut fields.album_artist,
            "Title" if fields.title.is_none() => &mut fields.title,
            "Author" if fields.artist.is_none() => &mut fields.artist,
            _ => continue,
        };
        TagFields::set(slot, &utf16(value));
    }
    Ok(())
}

/// kbps from the play duration, or the declared maximum for broadcasts.
fn read_bitrate(object: &mut Cursor<'_>, size_bytes: u64) -> Result<u32> {
    object.take(16)?; // file id
    object.u64()?; // file size
    object.u64()?; // creation date
    object.u64()?; // data packets
    let play_duration = object.u64()?; // 100 ns units
    object.u64()?; // send duration
    let preroll_ms = object.u64()?;
    let flags = object.u32()?;
    object.u32()?; // min packet size
    object.u32()?; // max packet size
    let max_bitrate = object.u32()?;

    let seconds = play_duration as f64 / 10_000_000.0 - preroll_ms as f64 / 1000.0;
    if flags & BROADCAST_FLAG == 0 && seconds > 0.0 {
        Ok(((size_bytes * 8) as f64 / seconds / 1000.0) as u32)
    } else {
        Ok(max_bitrate / 1000)
    }
}

fn utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn malformed(reason: impl Into<String>) -> ShelfError {
    ShelfError::Metadata(format!("ASF: {}", reason.into()))
}

/// Little-endian reader over a borrowed buffer.
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(malformed("object runs past the end of the header"));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn utf16z(s: &str) -> Vec<u8> {
        s.encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }

    fn object(guid: Guid, body: &[u8]) -> Vec<u8> {
        let mut out = guid.to_vec();
        out.extend_from_slice(&(body.len() as u64 + OBJECT_PREAMBLE).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn content_description(title: &str, author: &str) -> Vec<u8> {
        let (title, author) = (utf16z(title), utf16z(author));
        let mut body = Vec::new();
        for len in [title.len(), author.len(), 0, 0, 0] {
            body.extend_from_slice(&(len as u16).to_le_bytes());
        }
        body.extend_from_slice(&title);
        body.extend_from_slice(&author);
        object(CONTENT_DESCRIPTION, &body)
    }

    fn extended_content(entries: &[(&str, u16, Vec<u8>)]) -> Vec<u8> {
        let mut body = (entries.len() as u16).to_le_bytes().to_vec();
        for (name, value_type, value) in entries {
            let name = utf16z(name);
            body.extend_from_slice(&(name.len() as u16).to_le_bytes());
            body.extend_from_slice(&name);
            body.extend_from_slice(&value_type.to_le_bytes());
            body.extend_from_slice(&(value.len() as u16).to_le_bytes());
            body.extend_from_slice(value);
        }
        object(EXTENDED_CONTENT_DESCRIPTION, &body)
    }

    /// `seconds` of play time with the usual 3 s preroll.
    fn file_properties(seconds: u64, flags: u32, max_bitrate: u32) -> Vec<u8> {
        let preroll_ms: u64 = 3000;
        let mut body = vec![0u8; 16];
        for value in [0u64, 0, 0, (seconds * 1000 + preroll_ms) * 10_000, 0, preroll_ms] {
            body.extend_from_slice(&value.to_le_bytes());
        }
        for value in [flags, 0, 0, max_bitrate] {
            body.extend_from_slice(&value.to_le_bytes());
        }
        object(FILE_PROPERTIES, &body)
    }

    /// A header holding `objects`, padded to `total` bytes when given.
    pub(crate) fn asf_file(objects: &[Vec<u8>], total: Option<usize>) -> Vec<u8> {
        let children: Vec<u8> = objects.concat();
        let mut out = HEADER_OBJECT.to_vec();
        out.extend_from_slice(&((HEADER_PREAMBLE + children.len()) as u64).to_le_bytes());
        out.extend_from_slice(&(objects.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0x01, 0x02]);
        out.extend_from_slice(&children);
        if let Some(total) = total {
            out.resize(total.max(out.len()), 0);
        }
        out
    }

    pub(crate) fn tagged_wma(title: &str, artist: &str, album: &str) -> Vec<u8> {
        asf_file(
            &[
                file_properties(10, 0, 200_000),
                content_description(title, artist),
                extended_content(&[
                    ("WM/AlbumTitle", UNICODE_VALUE, utf16z(album)),
                    ("WM/TrackNumber", 3, 7u32.to_le_bytes().to_vec()),
                ]),
            ],
            None,
        )
    }

    fn read(bytes: &[u8]) -> Result<TagFields> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.wma");
        std::fs::write(&path, bytes).unwrap();
        AsfBackend.read_tags(&path)
    }

    #[test]
    fn reads_content_and_extended_descriptions() {
        let fields = read(&asf_file(
            &[
                content_description("Song", "Art"),
                extended_content(&[
                    ("WM/AlbumTitle", UNICODE_VALUE, utf16z("Alb")),
                    ("WM/AlbumArtist", UNICODE_VALUE, utf16z("Various")),
                    ("WM/Year", 3, 2001u32.to_le_bytes().to_vec()),
                ]),
            ],
            None,
        ))
        .unwrap();

        assert_eq!(
            fields,
            TagFields {
                title: Some("Song".into()),
                artist: Some("Art".into()),
                album_artist: Some("Various".into()),
                album: Some("Alb".into()),
                bitrate: 0,
            }
        );
    }

    #[test]
    fn bitrate_comes_from_size_and_play_duration() {
        // 10 s of play time in a 160 000 byte file: 128 kbps.
        let fields = read(&asf_file(&[file_properties(10, 0, 999_000)], Some(160_000))).unwrap();
        assert_eq!(fields.bitrate, 128);
    }

    #[test]
    fn broadcast_files_use_the_declared_maximum() {
        let fields =
            read(&asf_file(&[file_properties(0, BROADCAST_FLAG, 192_000)], None)).unwrap();
        assert_eq!(fields.bitrate, 192);
    }

    #[test]
    fn extended_title_only_fills_gaps() {
        let fields = read(&asf_file(
            &[
                content_description("", "Art"),
                extended_content(&[
                    ("Title", UNICODE_VALUE, utf16z("From Extended")),
                    ("Author", UNICODE_VALUE, utf16z("Ignored")),
                ]),
            ],
            None,
        ))
        .unwrap();
        assert_eq!(fields.title.as_deref(), Some("From Extended"));
        assert_eq!(fields.artist.as_deref(), Some("Art"));
    }

    #[test]
    fn rejects_other_containers() {
        let err = read(b"RIFF\x24\x00\x00\x00WAVEfmt and then some more bytes").unwrap_err();
        assert!(err.to_string().contains("not an ASF file"));
    }

    #[test]
    fn rejects_truncated_objects() {
        let mut bytes = asf_file(&[content_description("Song", "Art")], None);
        // Title length past the end of the object.
        bytes[HEADER_PREAMBLE + OBJECT_PREAMBLE as usize] += 40;
        assert!(read(&bytes).is_err());
    }
}
