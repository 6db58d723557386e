use std::path::Path;

use csv::Writer;
use log::info;

use crate::organizer::stats::RunStatistics;
use crate::Result;

pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn log_summary(&self, stats: &RunStatistics, dry_run: bool) {
        if dry_run {
            info!("Dry run - no files were changed");
        }
        info!("Total files processed: {}", stats.processed);
        info!("Total newly added files: {}", stats.moved);
        info!("Total duplicates found: {}", stats.duplicates());
        info!("\treplaced: {}", stats.replaced);
        info!("\tskipped: {}", stats.skipped);
        info!("Already in place: {}", stats.unchanged);
        info!("Errors: {}", stats.errored);
        info!("Playlist entries: {}", stats.playlist.len());
    }

    /// One row per processed file.
    pub fn generate_run_report(&self, stats: &RunStatistics, output_path: impl AsRef<Path>) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        for entry in &stats.entries {
            writer.serialize(entry)?;
        }

        writer.flush()?;
        info!("Report generated: {}", output_path_ref.display());
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
