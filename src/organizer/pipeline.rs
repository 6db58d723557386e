use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::analyzers::duplicate::{ArbitrationOutcome, Decision, DuplicateArbiter};
use crate::audio::metadata::MetadataReader;
use crate::config::{ExtensionSet, TransferMode};
use crate::organizer::destination::DestinationResolver;
use crate::organizer::stats::{Disposition, FileReport, RunStatistics};
use crate::utils::file_ops::FileManager;
use crate::utils::parallel::ParallelProcessor;
use crate::{dotted_extension, Result, ShelfError, TagRecord};

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source_root: PathBuf,
    pub storage_root: PathBuf,
    pub extensions: ExtensionSet,
    pub mode: TransferMode,
    pub dry_run: bool,
    pub prefer_album_artist: bool,
    pub threads: usize,
    pub chunk_size: usize,
}

impl RunConfig {
    pub fn new(source_root: impl Into<PathBuf>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            storage_root: storage_root.into(),
            extensions: crate::config::AudioFormatSettings::default().extension_set(),
            mode: TransferMode::Move,
            dry_run: false,
            prefer_album_artist: false,
            threads: 0,
            chunk_size: 64,
        }
    }
}

/// How the file at a destination got there.
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// Already on disk before this run, or already organized.
    Preexisting,
    /// Put there by this run; `entry` is its report row.
    Placed { entry: usize },
}

#[derive(Debug, Clone)]
struct Occupant {
    record: TagRecord,
    origin: Origin,
}

/// Walks the source tree and files every readable audio file under the
/// storage root, settling collisions as it goes.
pub struct Pipeline<'a> {
    config: RunConfig,
    reader: &'a MetadataReader,
    resolver: DestinationResolver,
    arbiter: DuplicateArbiter,
    files: FileManager,
}

impl ParallelProcessor for Pipeline<'_> {}

impl<'a> Pipeline<'a> {
    pub fn new(config: RunConfig, reader: &'a MetadataReader) -> Self {
        Self {
            resolver: DestinationResolver::new(config.prefer_album_artist),
            arbiter: DuplicateArbiter::new(),
            files: FileManager::new(config.mode, config.dry_run),
            config,
            reader,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs to completion. Only unusable roots are an error; per-file
    /// failures end up in the returned statistics.
    pub fn run(&mut self) -> Result<RunStatistics> {
        self.prepare_roots()?;

        info!("Scanning directory structure: {}", self.config.source_root.display());
        let candidates = self.collect_audio_files();
        info!("Found {} potential audio files", candidates.len());

        let mut stats = RunStatistics::default();
        if candidates.is_empty() {
            return Ok(stats);
        }

        let pool = Self::build_thread_pool(self.config.threads)?;
        debug!("Reading tags with {} threads", pool.current_num_threads());

        let mut occupancy: HashMap<PathBuf, Occupant> = HashMap::new();
        let total_files = candidates.len();

        for chunk in candidates.chunks(self.config.chunk_size.max(1)) {
            let records = Self::process_chunk(&pool, chunk, |path| self.reader.read(path));

            for (path, record) in chunk.iter().zip(records) {
                match record {
                    Ok(record) => self.place(record, &mut occupancy, &mut stats),
                    Err(e) => {
                        error!("Error processing file: {}", e);
                        stats.record(FileReport::unreadable(path, e.to_string()));
                    }
                }
            }

            debug!(
                "Progress: {}/{} files ({:.1}%)",
                stats.processed,
                total_files,
                (stats.processed as f64 / total_files as f64) * 100.0
            );
        }

        Ok(stats)
    }

    /// Validates the roots and swaps them for their canonical form.
    fn prepare_roots(&mut self) -> Result<()> {
        let source = &self.config.source_root;
        if !source.is_dir() {
            return Err(ShelfError::Configuration(format!(
                "source directory {} does not exist or is not a directory",
                source.display()
            )));
        }
        fs::read_dir(source)
            .map_err(|e| ShelfError::Configuration(format!("cannot read {}: {}", source.display(), e)))?;
        self.config.source_root = fs::canonicalize(source)
            .map_err(|e| ShelfError::Configuration(format!("cannot read {}: {}", source.display(), e)))?;

        let storage = &self.config.storage_root;
        if storage.exists() && !storage.is_dir() {
            return Err(ShelfError::Configuration(format!(
                "storage path {} is not a directory",
                storage.display()
            )));
        }
        if !self.config.dry_run {
            self.files.ensure_directory(storage).map_err(|e| {
                ShelfError::Configuration(format!("cannot create storage directory: {e}"))
            })?;
        }
        if let Ok(canonical) = fs::canonicalize(&self.config.storage_root) {
            self.config.storage_root = canonical;
        }
        Ok(())
    }

    fn collect_audio_files(&self) -> Vec<PathBuf> {
        let source = &self.config.source_root;
        let storage = &self.config.storage_root;
        // An organized tree inside the source is not rescanned, unless the
        // two are the same directory.
        let skip_storage = storage != source && storage.starts_with(source);

        walkdir::WalkDir::new(source)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(skip_storage && e.path() == storage.as_path()))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Error accessing entry: {}", err);
                    None
                }
            })
            .filter(|e| {
                let is_file = e.file_type().is_file();
                let supported = self.config.extensions.matches(e.path());
                if is_file && !supported {
                    debug!("Skipping non-audio file: {}", e.path().display());
                }
                is_file && supported
            })
            .map(|e| e.into_path())
            .collect()
    }

    fn place(
        &self,
        record: TagRecord,
        occupancy: &mut HashMap<PathBuf, Occupant>,
        stats: &mut RunStatistics,
    ) {
        let destination = self.resolver.resolve(&record, &self.config.storage_root);
        let target = destination.path();
        let slot = slot_key(&target);

        if is_same_file(&record.source_path, &target) {
            debug!("Already in place: {}", target.display());
            stats.record(FileReport::new(&record, &target, Disposition::Unchanged, "already organized"));
            stats.add_placed(&slot);
            // When source and storage overlap, an earlier file of this run
            // may already have claimed this slot.
            occupancy.entry(slot).or_insert(Occupant {
                record,
                origin: Origin::Preexisting,
            });
            return;
        }

        let occupant = match occupancy.remove(&slot) {
            Some(occupant) => Some(occupant),
            None => match self.occupant_on_disk(&target) {
                Ok(occupant) => occupant,
                Err(e) => {
                    error!("Cannot inspect {}: {}", target.display(), e);
                    stats.record(FileReport::new(&record, &target, Disposition::Errored, e.to_string()));
                    return;
                }
            },
        };

        let Decision {
            outcome: planned,
            explanation: reason,
            ..
        } = self.arbiter.decide(&record, occupant.as_ref().map(|o| &o.record));

        match self.execute(planned, &record, &target, occupant.as_ref()) {
            ArbitrationOutcome::Move => {
                info!("{}: {} -> {}", self.config.mode, record.source_path.display(), destination);
                let entry = stats.record(FileReport::new(&record, &target, Disposition::Moved, reason));
                let placed = slot_key(&target);
                stats.add_placed(&placed);
                occupancy.insert(
                    placed,
                    Occupant {
                        record,
                        origin: Origin::Placed { entry },
                    },
                );
            }
            ArbitrationOutcome::Replace => {
                info!("Replacing {} with {} ({})", destination, record.source_path.display(), reason);
                if let Some(Occupant {
                    origin: Origin::Placed { entry },
                    ..
                }) = occupant
                {
                    stats.reclassify(
                        entry,
                        Disposition::Skipped,
                        format!("displaced by {}", record.source_path.display()),
                    );
                }
                let entry = stats.record(FileReport::new(&record, &target, Disposition::Replaced, reason));
                let placed = slot_key(&target);
                stats.add_placed(&placed);
                occupancy.insert(
                    placed,
                    Occupant {
                        record,
                        origin: Origin::Placed { entry },
                    },
                );
            }
            ArbitrationOutcome::Skip => {
                info!("Keeping existing {} over {} ({})", destination, record.source_path.display(), reason);
                stats.record(FileReport::new(&record, &target, Disposition::Skipped, reason));
                if let Some(occupant) = occupant {
                    occupancy.insert(slot, occupant);
                }
            }
            ArbitrationOutcome::Error(e) => {
                error!("Error moving {} to {}: {}", record.source_path.display(), target.display(), e);
                stats.record(FileReport::new(&record, &target, Disposition::Errored, e));
                if let Some(occupant) = occupant {
                    occupancy.insert(slot, occupant);
                }
            }
        }
    }

    /// Carries out the planned outcome, turning filesystem failures into
    /// [`ArbitrationOutcome::Error`].
    fn execute(
        &self,
        planned: ArbitrationOutcome,
        record: &TagRecord,
        target: &Path,
        occupant: Option<&Occupant>,
    ) -> ArbitrationOutcome {
        let result = match &planned {
            ArbitrationOutcome::Move => self.files.transfer(&record.source_path, target),
            ArbitrationOutcome::Replace => {
                // A loser this run moved in goes back where it came from.
                let restore_to = occupant.and_then(|o| match o.origin {
                    Origin::Placed { .. } if self.files.mode() == TransferMode::Move => {
                        Some(o.record.source_path.as_path())
                    }
                    _ => None,
                });
                self.files.replace(&record.source_path, target, restore_to)
            }
            ArbitrationOutcome::Skip | ArbitrationOutcome::Error(_) => Ok(()),
        };
        match result {
            Ok(()) => planned,
            Err(e) => ArbitrationOutcome::Error(e.to_string()),
        }
    }

    /// A file left at `target` by an earlier run, if any.
    fn occupant_on_disk(&self, target: &Path) -> Result<Option<Occupant>> {
        let metadata = match fs::symlink_metadata(target) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ShelfError::filesystem(target, e)),
        };
        if !metadata.is_file() {
            return Err(ShelfError::filesystem(
                target,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "occupied by a non-file"),
            ));
        }

        let record = match self.reader.read(target) {
            Ok(record) => record,
            Err(e) => {
                warn!("Existing {} is unreadable ({}), comparing by size only", target.display(), e);
                TagRecord {
                    title: None,
                    artist: None,
                    album_artist: None,
                    album: None,
                    bitrate: 0,
                    file_size: metadata.len(),
                    extension: dotted_extension(target).unwrap_or_default(),
                    source_path: target.to_path_buf(),
                    backend: "stat",
                }
            }
        };
        Ok(Some(Occupant {
            record,
            origin: Origin::Preexisting,
        }))
    }
}

/// Key of a destination in the occupancy map. Once a file exists there the
/// key is its canonical path, so spellings that reach the same file (case on
/// case-insensitive filesystems, symlinked directories) share one slot.
fn slot_key(target: &Path) -> PathBuf {
    fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
