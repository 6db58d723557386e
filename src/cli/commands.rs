use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Settings, TransferMode};
use crate::utils::logging::Verbosity;

#[derive(Parser)]
#[command(name = "tagshelf")]
#[command(version)]
#[command(about = "Files audio into an artist/album tree named after its tags, keeping the best copy of duplicates", long_about = None)]
pub struct Cli {
    /// Settings file (INI or TOML); defaults to ./tagshelf.ini or the XDG config dir
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors, and not to the console
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move (or copy) audio files from the source into the storage tree
    Organize(OrganizeArgs),

    /// Show the tags read from files and where they would be filed
    Inspect {
        /// Audio files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Storage root used to show destinations
        #[arg(short = 'T', long = "storage")]
        storage: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
pub struct OrganizeArgs {
    /// The directory containing the audio files to be processed
    #[arg(short = 'S', long = "source")]
    pub source: Option<PathBuf>,

    /// The directory where the renamed audio files will be stored
    #[arg(short = 'T', long = "storage")]
    pub storage: Option<PathBuf>,

    /// Copy files instead of moving them
    #[arg(long)]
    pub copy: bool,

    /// Only report what would happen
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Write a playlist of the placed files
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_playlist")]
    pub playlist: bool,

    /// Do not write a playlist even if the settings ask for one
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_playlist: bool,

    /// Write a CSV row per processed file here
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Tag reading threads (0 = one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Configured
        }
    }

    /// Applies the global flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(log_file) = &self.log_file {
            settings.logging.log_file = log_file.display().to_string();
        }
    }
}

impl OrganizeArgs {
    /// Applies the organize flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(source) = &self.source {
            settings.organizer.source = source.display().to_string();
        }
        if let Some(storage) = &self.storage {
            settings.organizer.storage = storage.display().to_string();
        }
        if self.copy {
            settings.organizer.mode = TransferMode::Copy;
        }
        if let Some(threads) = self.threads {
            settings.organizer.threads = threads;
        }
        if self.playlist {
            settings.playlist.generate = true;
        }
        if self.no_playlist {
            settings.playlist.generate = false;
        }
    }
}
