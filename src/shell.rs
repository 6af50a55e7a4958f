use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Used when the engine cannot report the video's own size.
pub const FALLBACK_VIDEO_SIZE: (u32, u32) = (720, 1280);
pub const WINDOW_PADDING: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
}

/// Window content size for a video on a display: keeps the aspect ratio,
/// holds the height between half and nine tenths of the display, adds
/// padding and never exceeds the display.
pub fn fit_window(video: Option<(u32, u32)>, display: (u32, u32)) -> SizeHint {
    let (video_width, video_height) = match video {
        Some((width, height)) if width > 0 && height > 0 => (width, height),
        _ => FALLBACK_VIDEO_SIZE,
    };
    let (display_width, display_height) = display;

    let min_height = display_height / 2;
    let max_height = (u64::from(display_height) * 9 / 10) as u32;
    let target_height = video_height.min(max_height).max(min_height);

    let target_width =
        u64::from(target_height) * u64::from(video_width) / u64::from(video_height);
    let target_width = u32::try_from(target_width).unwrap_or(u32::MAX);

    SizeHint {
        width: target_width.saturating_add(WINDOW_PADDING).min(display_width),
        height: target_height.saturating_add(WINDOW_PADDING).min(display_height),
    }
}

/// What the window layer asks of the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Next,
    Previous,
    TogglePlayPause,
    RevealCurrent,
    SelectFolder(PathBuf),
    Shutdown,
}

/// The window layer, seen from the player.
pub trait PresentationShell {
    fn display_bounds(&self) -> (u32, u32);
    fn set_content_size_hint(&mut self, hint: SizeHint);
    fn show_no_videos(&mut self, folder: &Path);

    fn reveal_in_file_manager(&mut self, path: &Path) {
        match open_in_file_manager(path) {
            Ok(()) => info!("revealed {}", path.display()),
            Err(err) => warn!("failed to reveal {}: {err}", path.display()),
        }
    }
}

#[cfg(windows)]
pub fn open_in_file_manager(path: &Path) -> io::Result<()> {
    Command::new("explorer")
        .arg(format!("/select,{}", path.display()))
        .spawn()
        .map(|_| ())
}

#[cfg(target_os = "macos")]
pub fn open_in_file_manager(path: &Path) -> io::Result<()> {
    Command::new("open").arg("-R").arg(path).spawn().map(|_| ())
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn open_in_file_manager(path: &Path) -> io::Result<()> {
    let folder = path.parent().unwrap_or(path);
    Command::new("xdg-open").arg(folder).spawn().map(|_| ())
}
