use std::{env, path::Path, path::PathBuf};

use super::schema::Settings;
use crate::organizer::pipeline::RunConfig;
use crate::{Result, ShelfError};

const FILE_NAME: &str = "tagshelf.ini";

const EXAMPLE: &str = "\
[organizer]
source = /music/unsorted
storage = /music/library
";

impl Settings {
    /// Load settings from an optional config file and the environment.
    ///
    /// `explicit` must exist when given; the default locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ShelfError::Configuration(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                builder = builder.add_source(::config::File::from(path));
            }
            None => {
                if let Some(path) = resolve_config_path() {
                    builder = builder.add_source(::config::File::from(path.as_path()).required(false));
                }
            }
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TAGSHELF")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Turns merged settings into what one run needs.
    pub fn run_config(&self) -> Result<RunConfig> {
        let source = self.organizer.source.trim();
        let storage = self.organizer.storage.trim();
        if source.is_empty() || storage.is_empty() {
            return Err(ShelfError::Configuration(format!(
                "source and storage directories must be given on the command line or in {FILE_NAME}, e.g.\n\n{EXAMPLE}"
            )));
        }

        let extensions = self.audio_formats.extension_set();
        if extensions.is_empty() {
            return Err(ShelfError::Configuration(
                "audio_formats.extensions lists no extensions".to_string(),
            ));
        }

        Ok(RunConfig {
            source_root: PathBuf::from(source),
            storage_root: PathBuf::from(storage),
            extensions,
            mode: self.organizer.mode,
            dry_run: false,
            prefer_album_artist: self.organizer.prefer_album_artist,
            threads: self.organizer.threads,
            chunk_size: self.organizer.chunk_size.max(1),
        })
    }
}

/// `TAGSHELF_CONFIG_PATH`, then `./tagshelf.ini` when present, then the XDG default.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TAGSHELF_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    let local = PathBuf::from(FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/tagshelf/tagshelf.ini`, or `~/.config/tagshelf/tagshelf.ini`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("tagshelf").join(FILE_NAME))
}
