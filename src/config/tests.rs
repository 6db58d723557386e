use super::schema::*;
use super::{default_config_path, resolve_config_path};
use crate::ShelfError;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        std::env::set_var(key, val);
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

fn write_ini(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("tagshelf.ini");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_every_section_from_ini() {
    let _lock = env_lock();
    let dir = tempfile::tempdir().unwrap();
    let path = write_ini(
        dir.path(),
        "[organizer]\n\
         source = /music/in\n\
         storage = /music/out\n\
         mode = copy\n\
         prefer_album_artist = true\n\
         threads = 3\n\
         \n\
         [audio_formats]\n\
         extensions = mp3, FLAC ,.Ogg\n\
         \n\
         [logging]\n\
         level = debug\n\
         log_file = run.log\n\
         console_output = false\n\
         \n\
         [playlist]\n\
         generate = true\n\
         name_template = new_{date}.m3u\n",
    );

    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.organizer.source, "/music/in");
    assert_eq!(settings.organizer.mode, TransferMode::Copy);
    assert!(settings.organizer.prefer_album_artist);
    assert_eq!(settings.organizer.threads, 3);
    assert_eq!(settings.organizer.chunk_size, 64);
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.logging.log_file, "run.log");
    assert!(!settings.logging.console_output);
    assert!(settings.playlist.generate);
    assert_eq!(settings.playlist.name_template, "new_{date}.m3u");
    assert_eq!(settings.playlist.directory, "");

    let run = settings.run_config().unwrap();
    assert_eq!(run.source_root, PathBuf::from("/music/in"));
    assert_eq!(
        run.extensions.iter().collect::<Vec<_>>(),
        vec![".flac", ".mp3", ".ogg"]
    );
}

#[test]
fn environment_overrides_file() {
    let _lock = env_lock();
    let dir = tempfile::tempdir().unwrap();
    let path = write_ini(dir.path(), "[organizer]\nsource = /from/file\n");
    let _g = EnvGuard::set("TAGSHELF__ORGANIZER__SOURCE", "/from/env");

    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.organizer.source, "/from/env");
}

#[test]
fn explicit_config_must_exist() {
    let _lock = env_lock();
    let err = Settings::load(Some(Path::new("/no/such/tagshelf.ini"))).unwrap_err();
    assert!(matches!(err, ShelfError::Configuration(_)));
}

#[test]
fn defaults_match_the_classic_format_list() {
    let settings = Settings::default();
    let exts: Vec<_> = settings.audio_formats.extension_set().iter().map(String::from).collect();
    assert_eq!(
        exts,
        vec![".aac", ".flac", ".m4a", ".mp3", ".mp4", ".ogg", ".opus", ".wma"]
    );
    assert_eq!(settings.organizer.mode, TransferMode::Move);
    assert!(!settings.playlist.generate);
}

#[test]
fn missing_roots_are_a_configuration_error() {
    let mut settings = Settings::default();
    settings.organizer.source = "/in".into();
    assert!(matches!(
        settings.run_config(),
        Err(ShelfError::Configuration(_))
    ));

    settings.organizer.storage = "/out".into();
    settings.audio_formats.extensions = " , ".into();
    assert!(matches!(
        settings.run_config(),
        Err(ShelfError::Configuration(_))
    ));
}

#[test]
fn extension_matching_ignores_case() {
    let set = ExtensionSet::parse("mp3,.FLAC");
    assert!(set.matches(Path::new("/a/B.MP3")));
    assert!(set.matches(Path::new("/a/b.flac")));
    assert!(!set.matches(Path::new("/a/b.wav")));
    assert!(!set.matches(Path::new("/a/mp3")));
}

#[test]
fn resolve_config_path_prefers_env_var() {
    let _lock = env_lock();
    let _g = EnvGuard::set("TAGSHELF_CONFIG_PATH", "/tmp/tagshelf-test.ini");
    assert_eq!(
        resolve_config_path().unwrap(),
        PathBuf::from("/tmp/tagshelf-test.ini")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/xdg-config-home/tagshelf/tagshelf.ini")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/home-dir/.config/tagshelf/tagshelf.ini")
    );
}
