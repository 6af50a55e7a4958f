use crate::error::ViewerError;
use crate::model::Playlist;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv"];

pub fn is_video(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    VIDEO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// Lists the videos directly inside `folder` and shuffles a play order.
///
/// Enumeration order is whatever the filesystem yields. An existing folder
/// without videos gives an empty playlist rather than an error.
pub fn scan_folder(folder: &Path, rng: &mut SmallRng) -> Result<Playlist, ViewerError> {
    let original_order = list_videos(folder)?;
    let mut play_order = original_order.clone();
    play_order.shuffle(rng);

    info!(
        "scanned {}: {} videos",
        folder.display(),
        original_order.len()
    );
    Ok(Playlist::new(
        folder.to_path_buf(),
        original_order,
        play_order,
    ))
}

pub fn has_video_files(folder: &Path) -> bool {
    list_videos(folder).is_ok_and(|videos| !videos.is_empty())
}

fn list_videos(folder: &Path) -> Result<Vec<PathBuf>, ViewerError> {
    if !folder.is_dir() {
        return Err(ViewerError::invalid_directory(folder, "not a directory"));
    }
    fs::read_dir(folder)
        .map_err(|err| ViewerError::invalid_directory(folder, err.to_string()))?;

    let mut videos = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry in {}: {err}", folder.display());
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_video(path) {
            debug!("skipping non-video {}", path.display());
            continue;
        }
        videos.push(path.to_path_buf());
    }
    Ok(videos)
}
