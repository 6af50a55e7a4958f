use crate::error::ViewerError;
use crate::model::Settings;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "vfeed";
const LAST_FOLDER_FILE: &str = "last_folder.txt";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "vfeed.log";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("VFEED_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = dirs::home_dir().context("home directory is not available")?;
    Ok(home.join(".config").join(APP_DIR))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join(LOG_FILE)
}

pub fn home_folder() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Reads the one-line last-folder record. A record pointing at something
/// that is no longer a directory counts as absent.
pub fn load_last_folder_in(root: &Path) -> Result<Option<PathBuf>, ViewerError> {
    let path = root.join(LAST_FOLDER_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path).map_err(|source| ViewerError::CacheIo {
        path: path.clone(),
        source,
    })?;
    let folder = raw.trim();
    if folder.is_empty() {
        return Ok(None);
    }

    let folder = PathBuf::from(folder);
    if !folder.is_dir() {
        debug!("last folder {} is gone, ignoring record", folder.display());
        return Ok(None);
    }
    Ok(Some(folder))
}

pub fn save_last_folder_in(root: &Path, folder: &Path) -> Result<(), ViewerError> {
    let path = root.join(LAST_FOLDER_FILE);
    fs::create_dir_all(root).map_err(|source| ViewerError::CacheIo {
        path: path.clone(),
        source,
    })?;
    let cleaned = strip_windows_verbatim_prefix(folder);
    fs::write(&path, cleaned.to_string_lossy().as_bytes())
        .map_err(|source| ViewerError::CacheIo { path, source })
}

/// CLI path first, then the last-folder record, then the home directory.
/// Without a config root there is no record to consult.
pub fn resolve_start_folder(cli_folder: Option<PathBuf>, root: Option<&Path>) -> PathBuf {
    if let Some(folder) = cli_folder {
        return folder;
    }
    let Some(root) = root else {
        return home_folder();
    };

    match load_last_folder_in(root) {
        Ok(Some(folder)) => folder,
        Ok(None) => home_folder(),
        Err(err) => {
            warn!("{err}; falling back to home directory");
            home_folder()
        }
    }
}

pub fn load_settings_in(root: &Path) -> Result<Settings> {
    let path = root.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EndOfMediaPolicy;
    use tempfile::tempdir;

    #[test]
    fn last_folder_round_trip() {
        let root = tempdir().expect("tempdir");
        let videos = tempdir().expect("videos dir");

        save_last_folder_in(root.path(), videos.path()).expect("save");
        let loaded = load_last_folder_in(root.path()).expect("load");
        assert_eq!(loaded.as_deref(), Some(videos.path()));
    }

    #[test]
    fn missing_record_is_absent() {
        let root = tempdir().expect("tempdir");
        assert_eq!(load_last_folder_in(root.path()).expect("load"), None);
    }

    #[test]
    fn stale_record_falls_back_to_home() {
        let root = tempdir().expect("tempdir");
        fs::write(root.path().join(LAST_FOLDER_FILE), "/definitely/not/here\n").expect("write");

        assert_eq!(load_last_folder_in(root.path()).expect("load"), None);
        assert_eq!(resolve_start_folder(None, Some(root.path())), home_folder());
    }

    #[test]
    fn cli_folder_wins_over_record() {
        let root = tempdir().expect("tempdir");
        let videos = tempdir().expect("videos dir");
        save_last_folder_in(root.path(), videos.path()).expect("save");

        let chosen = resolve_start_folder(Some(PathBuf::from("elsewhere")), Some(root.path()));
        assert_eq!(chosen, PathBuf::from("elsewhere"));
    }

    #[test]
    fn unwritable_record_reports_cache_io() {
        let root = tempdir().expect("tempdir");
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "file, not a dir").expect("write");

        let err = save_last_folder_in(&blocker, root.path()).expect_err("should fail");
        assert!(matches!(err, ViewerError::CacheIo { .. }));
    }

    #[test]
    fn unusable_config_root_still_resolves_a_start_folder() {
        let root = tempdir().expect("tempdir");
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "file, not a dir").expect("write");
        unsafe {
            env::set_var("VFEED_CONFIG_DIR", blocker.join("vfeed").to_string_lossy().as_ref());
        }

        assert!(ensure_config_dir().is_err());
        let videos = tempdir().expect("videos dir");
        let cli = videos.path().to_path_buf();
        assert_eq!(resolve_start_folder(Some(cli.clone()), None), cli);
        assert_eq!(resolve_start_folder(None, None), home_folder());

        unsafe {
            env::remove_var("VFEED_CONFIG_DIR");
        }
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let root = tempdir().expect("tempdir");
        fs::write(
            root.path().join(SETTINGS_FILE),
            r#"{ "end_of_media": "Advance", "poll_interval_ms": 250 }"#,
        )
        .expect("write");

        let settings = load_settings_in(root.path()).expect("load");
        assert_eq!(settings.end_of_media, EndOfMediaPolicy::Advance);
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.display_height, 1080);
    }

    #[test]
    fn malformed_settings_are_an_error() {
        let root = tempdir().expect("tempdir");
        fs::write(root.path().join(SETTINGS_FILE), "{ nope").expect("write");
        assert!(load_settings_in(root.path()).is_err());
    }

    #[test]
    fn strips_windows_verbatim_prefix() {
        let cleaned = strip_windows_verbatim_prefix(Path::new(r"\\?\E:\VIDEOS\a.mp4"));
        assert_eq!(cleaned, PathBuf::from(r"E:\VIDEOS\a.mp4"));
    }
}
