use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::config::LoggingSettings;
use crate::{Result, ShelfError};

/// Command-line verbosity, which beats the configured level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Configured,
    Verbose,
    Quiet,
}

/// Sends every line to the log file and, optionally, stderr.
struct Tee {
    file: File,
    console: bool,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.console {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        io::stderr().flush()
    }
}

pub fn level_for(settings: &LoggingSettings, verbosity: Verbosity) -> Result<LevelFilter> {
    match verbosity {
        Verbosity::Verbose => Ok(LevelFilter::Debug),
        Verbosity::Quiet => Ok(LevelFilter::Error),
        Verbosity::Configured => settings.level.trim().parse().map_err(|_| {
            ShelfError::Configuration(format!("unknown log level {:?}", settings.level))
        }),
    }
}

/// Installs the global logger. `RUST_LOG` can still refine the filters.
pub fn init_logging(settings: &LoggingSettings, verbosity: Verbosity) -> Result<()> {
    let level = level_for(settings, verbosity)?;
    let console = settings.console_output && verbosity != Verbosity::Quiet;

    let mut builder = Builder::new();
    builder.filter_level(level).parse_default_env().format(|buf, record| {
        writeln!(buf, "{} - {} - {}", buf.timestamp(), record.level(), record.args())
    });

    let log_file = settings.log_file.trim();
    if !log_file.is_empty() {
        let path = Path::new(log_file);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ShelfError::filesystem(path, e))?;
        builder.target(Target::Pipe(Box::new(Tee { file, console })));
    } else if console {
        builder.target(Target::Stderr);
    } else {
        builder.filter_level(LevelFilter::Off);
    }

    builder.try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_override_configured_level() {
        let settings = LoggingSettings {
            level: "warn".into(),
            ..LoggingSettings::default()
        };
        assert_eq!(level_for(&settings, Verbosity::Configured).unwrap(), LevelFilter::Warn);
        assert_eq!(level_for(&settings, Verbosity::Verbose).unwrap(), LevelFilter::Debug);
        assert_eq!(level_for(&settings, Verbosity::Quiet).unwrap(), LevelFilter::Error);
    }

    #[test]
    fn level_names_are_case_insensitive() {
        let settings = LoggingSettings {
            level: " DEBUG ".into(),
            ..LoggingSettings::default()
        };
        assert_eq!(level_for(&settings, Verbosity::Configured).unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn unknown_level_is_a_configuration_error() {
        let settings = LoggingSettings {
            level: "loud".into(),
            ..LoggingSettings::default()
        };
        assert!(matches!(
            level_for(&settings, Verbosity::Configured),
            Err(ShelfError::Configuration(_))
        ));
    }
}
