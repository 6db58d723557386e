use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tagshelf::{
    cli::commands::{Cli, Commands, OrganizeArgs},
    config::Settings,
    utils::{logging::init_logging, playlist::PlaylistWriter, reporting::Reporter},
    DestinationResolver, MetadataReader, Pipeline, Result,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);
    init_logging(&settings.logging, cli.verbosity())?;

    let reader = MetadataReader::probe();

    match &cli.command {
        Commands::Organize(args) => organize(args, settings, &reader),
        Commands::Inspect { files, storage } => {
            let storage = storage.clone().unwrap_or_else(|| {
                let configured = settings.organizer.storage.trim();
                PathBuf::from(if configured.is_empty() { "." } else { configured })
            });
            inspect(files, &storage, &settings, &reader);
            Ok(())
        }
    }
}

fn organize(args: &OrganizeArgs, mut settings: Settings, reader: &MetadataReader) -> Result<()> {
    args.apply(&mut settings);
    let mut run_config = settings.run_config()?;
    run_config.dry_run = args.dry_run;

    info!("=== Organizing {} into {} ===", run_config.source_root.display(), run_config.storage_root.display());
    info!("Using audio extensions: {}", run_config.extensions);
    info!("Transfer mode: {}{}", run_config.mode, if args.dry_run { " (dry run)" } else { "" });

    let mut pipeline = Pipeline::new(run_config, reader);
    let stats = pipeline.run()?;

    let reporter = Reporter::new();
    reporter.log_summary(&stats, args.dry_run);

    if let Some(report_path) = &args.report {
        if let Err(e) = reporter.generate_run_report(&stats, report_path) {
            error!("Error generating report: {}", e);
        }
    }

    if settings.playlist.generate && !args.dry_run {
        if stats.playlist.is_empty() {
            info!("No files were placed, not writing a playlist");
        } else {
            let path = PlaylistWriter::resolve_path(
                &settings.playlist,
                &pipeline.config().storage_root,
                chrono::Local::now().naive_local(),
            );
            if let Err(e) = PlaylistWriter::write(&path, &stats.playlist) {
                error!("Error writing playlist: {}", e);
            }
        }
    }

    info!("=== Done ===");
    Ok(())
}

fn inspect(files: &[PathBuf], storage: &std::path::Path, settings: &Settings, reader: &MetadataReader) {
    let resolver = DestinationResolver::new(settings.organizer.prefer_album_artist);

    for file in files {
        match reader.read(file) {
            Ok(record) => {
                println!("{}", file.display());
                println!("  backend:      {}", record.backend);
                println!("  title:        {}", record.title.as_deref().unwrap_or("-"));
                println!("  artist:       {}", record.artist.as_deref().unwrap_or("-"));
                println!("  album artist: {}", record.album_artist.as_deref().unwrap_or("-"));
                println!("  album:        {}", record.album.as_deref().unwrap_or("-"));
                println!("  bitrate:      {} kbps", record.bitrate);
                println!("  size:         {} bytes", record.file_size);
                println!("  destination:  {}", resolver.resolve(&record, storage).path().display());
            }
            Err(e) => eprintln!("{}: {}", file.display(), e),
        }
    }
}
