use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::TransferMode;
use crate::{Result, ShelfError};

const STAGING_SUFFIX: &str = "tagshelf-partial";

/// A candidate parked next to its destination, not yet visible under its
/// final name.
#[derive(Debug)]
struct Staged {
    temp: PathBuf,
    source: PathBuf,
    copied: bool,
}

/// Moves or copies files into place so that either the whole transfer
/// happens or the source is left as it was.
pub struct FileManager {
    mode: TransferMode,
    dry_run: bool,
}

impl FileManager {
    pub fn new(mode: TransferMode, dry_run: bool) -> Self {
        Self { mode, dry_run }
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn ensure_directory(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| ShelfError::filesystem(path, e))
    }

    /// Places `source` at the currently empty `destination`.
    pub fn transfer(&self, source: &Path, destination: &Path) -> Result<()> {
        if self.dry_run {
            info!("Would {} {} -> {}", self.mode, source.display(), destination.display());
            return Ok(());
        }
        let staged = self.stage(source, destination)?;
        self.commit(staged, destination)
    }

    /// Places `source` at `destination`, which is occupied by a losing file.
    ///
    /// With `restore_occupant_to` the occupant is moved there first instead
    /// of being overwritten.
    pub fn replace(
        &self,
        source: &Path,
        destination: &Path,
        restore_occupant_to: Option<&Path>,
    ) -> Result<()> {
        if self.dry_run {
            info!(
                "Would replace {} with {}",
                destination.display(),
                source.display()
            );
            return Ok(());
        }

        let staged = self.stage(source, destination)?;

        if let Some(home) = restore_occupant_to {
            if let Err(e) = self.relocate(destination, home) {
                self.rollback(&staged);
                return Err(e);
            }
            debug!("Returned {} to {}", destination.display(), home.display());
        }

        if let Err(e) = self.commit(staged, destination) {
            if let Some(home) = restore_occupant_to {
                if let Err(back) = self.relocate(home, destination) {
                    warn!(
                        "Could not put {} back at {}: {}",
                        home.display(),
                        destination.display(),
                        back
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn stage(&self, source: &Path, destination: &Path) -> Result<Staged> {
        let parent = destination.parent().ok_or_else(|| {
            ShelfError::filesystem(
                destination,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "destination has no parent"),
            )
        })?;
        self.ensure_directory(parent)?;

        let temp = staging_path(destination);

        if self.mode == TransferMode::Move {
            match fs::rename(source, &temp) {
                Ok(()) => {
                    return Ok(Staged {
                        temp,
                        source: source.to_path_buf(),
                        copied: false,
                    })
                }
                Err(e) => debug!("rename of {} failed ({}), copying instead", source.display(), e),
            }
        }

        if let Err(e) = fs::copy(source, &temp) {
            let _ = fs::remove_file(&temp);
            return Err(ShelfError::filesystem(source, e));
        }
        Ok(Staged {
            temp,
            source: source.to_path_buf(),
            copied: true,
        })
    }

    fn commit(&self, staged: Staged, destination: &Path) -> Result<()> {
        if let Err(e) = fs::rename(&staged.temp, destination) {
            self.rollback(&staged);
            return Err(ShelfError::filesystem(destination, e));
        }

        if staged.copied && self.mode == TransferMode::Move {
            if let Err(e) = fs::remove_file(&staged.source) {
                warn!(
                    "Placed {} but could not remove the source {}: {}",
                    destination.display(),
                    staged.source.display(),
                    e
                );
            }
        }
        Ok(())
    }

    fn rollback(&self, staged: &Staged) {
        let undone = if staged.copied {
            fs::remove_file(&staged.temp)
        } else {
            fs::rename(&staged.temp, &staged.source)
        };
        if let Err(e) = undone {
            warn!(
                "Could not undo staging of {} (left at {}): {}",
                staged.source.display(),
                staged.temp.display(),
                e
            );
        }
    }

    /// Moves a file regardless of transfer mode, copying across devices.
    fn relocate(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            self.ensure_directory(parent)?;
        }
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        fs::copy(from, to).map_err(|e| ShelfError::filesystem(from, e))?;
        if let Err(e) = fs::remove_file(from) {
            let _ = fs::remove_file(to);
            return Err(ShelfError::filesystem(from, e));
        }
        Ok(())
    }
}

fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.{STAGING_SUFFIX}"))
}
