use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use log::{debug, info};
use regex::{Captures, Regex};

use crate::config::PlaylistSettings;
use crate::{Result, ShelfError};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(date|time|datetime)\}").expect("valid regex"))
}

/// Writes the extended M3U playlist for a run.
pub struct PlaylistWriter;

impl PlaylistWriter {
    /// Fills the name template and places it in the configured directory,
    /// or `storage_root` when none is set.
    pub fn resolve_path(
        settings: &PlaylistSettings,
        storage_root: &Path,
        now: NaiveDateTime,
    ) -> PathBuf {
        let name = placeholder_regex().replace_all(&settings.name_template, |caps: &Captures| {
            let format = match &caps[1] {
                "date" => "%Y-%m-%d",
                "time" => "%H-%M-%S",
                _ => "%Y-%m-%d_%H-%M-%S",
            };
            now.format(format).to_string()
        });

        let directory = settings.directory.trim();
        let directory = if directory.is_empty() {
            storage_root.to_path_buf()
        } else {
            PathBuf::from(directory)
        };
        directory.join(&*name)
    }

    /// Writes `entries` in order, dropping duplicates and paths that no
    /// longer exist. Returns how many entries were written.
    pub fn write(path: &Path, entries: &[PathBuf]) -> Result<usize> {
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        if !base.as_os_str().is_empty() {
            fs::create_dir_all(base).map_err(|e| ShelfError::filesystem(base, e))?;
        }

        let file = fs::File::create(path).map_err(|e| ShelfError::filesystem(path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "#EXTM3U")?;

        let mut seen = HashSet::new();
        let mut written = 0;
        for entry in entries {
            if !seen.insert(entry) {
                continue;
            }
            if !entry.is_file() {
                debug!("Leaving {} out of the playlist, it no longer exists", entry.display());
                continue;
            }
            let shown = entry.strip_prefix(base).unwrap_or(entry);
            writeln!(writer, "{}", shown.display())?;
            written += 1;
        }
        writer.flush()?;

        info!("Playlist written: {} ({} entries)", path.display(), written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 5, 7)
            .unwrap()
    }

    fn settings(template: &str, directory: &str) -> PlaylistSettings {
        PlaylistSettings {
            generate: true,
            name_template: template.to_string(),
            directory: directory.to_string(),
        }
    }

    #[test]
    fn fills_placeholders() {
        let path = PlaylistWriter::resolve_path(
            &settings("{date} {time} {datetime} {other}.m3u", ""),
            Path::new("/storage"),
            noon(),
        );
        assert_eq!(
            path,
            PathBuf::from("/storage/2024-03-09 12-05-07 2024-03-09_12-05-07 {other}.m3u")
        );
    }

    #[test]
    fn explicit_directory_wins_over_storage_root() {
        let path = PlaylistWriter::resolve_path(
            &settings("new.m3u", " /lists "),
            Path::new("/storage"),
            noon(),
        );
        assert_eq!(path, PathBuf::from("/lists/new.m3u"));
    }

    #[test]
    fn writes_existing_entries_relative_to_playlist() {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage");
        let song = storage.join("Art/Alb/Song.mp3");
        let other = dir.path().join("elsewhere/Other.mp3");
        for p in [&song, &other] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "x").unwrap();
        }
        let gone = storage.join("Art/Alb/Gone.mp3");

        let playlist = storage.join("run.m3u");
        let written = PlaylistWriter::write(
            &playlist,
            &[song.clone(), gone, other.clone(), song.clone()],
        )
        .unwrap();

        assert_eq!(written, 2);
        let contents = fs::read_to_string(&playlist).unwrap();
        let expected = format!(
            "#EXTM3U\n{}\n{}\n",
            Path::new("Art/Alb/Song.mp3").display(),
            other.display()
        );
        assert_eq!(contents, expected);
    }
}
