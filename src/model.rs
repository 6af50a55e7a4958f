use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EndOfMediaPolicy {
    /// Restart the same video from zero, forever.
    #[default]
    LoopOne,
    /// Move on to the next entry, wrapping to the first one after the last.
    Advance,
}

impl EndOfMediaPolicy {
    pub fn next(self) -> Self {
        match self {
            Self::LoopOne => Self::Advance,
            Self::Advance => Self::LoopOne,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Loading,
    Playing,
    Paused,
    EndTransitioning,
}

impl ControllerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::EndTransitioning => "Restarting",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::EndTransitioning)
    }
}

/// Videos of one folder: enumeration order plus the shuffled order they play in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    pub folder: PathBuf,
    original_order: Vec<PathBuf>,
    play_order: Vec<PathBuf>,
}

impl Playlist {
    pub fn new(folder: PathBuf, original_order: Vec<PathBuf>, play_order: Vec<PathBuf>) -> Self {
        debug_assert_eq!(original_order.len(), play_order.len());
        Self {
            folder,
            original_order,
            play_order,
        }
    }

    pub fn empty(folder: PathBuf) -> Self {
        Self {
            folder,
            ..Self::default()
        }
    }

    pub fn original_order(&self) -> &[PathBuf] {
        &self.original_order
    }

    pub fn play_order(&self) -> &[PathBuf] {
        &self.play_order
    }

    pub fn len(&self) -> usize {
        self.play_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.play_order.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.play_order.get(index).map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub end_of_media: EndOfMediaPolicy,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_pending_polls")]
    pub max_pending_polls: u32,
    #[serde(default = "default_display_width")]
    pub display_width: u32,
    #[serde(default = "default_display_height")]
    pub display_height: u32,
    #[serde(default = "default_simulated_clip_seconds")]
    pub simulated_clip_seconds: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_pending_polls() -> u32 {
    20
}

fn default_display_width() -> u32 {
    1920
}

fn default_display_height() -> u32 {
    1080
}

fn default_simulated_clip_seconds() -> u64 {
    15
}

fn default_log_level() -> String {
    String::from("info")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            end_of_media: EndOfMediaPolicy::default(),
            poll_interval_ms: default_poll_interval_ms(),
            max_pending_polls: default_max_pending_polls(),
            display_width: default_display_width(),
            display_height: default_display_height(),
            simulated_clip_seconds: default_simulated_clip_seconds(),
            log_level: default_log_level(),
        }
    }
}
