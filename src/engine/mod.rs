use crate::error::ViewerError;
use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

#[cfg(test)]
pub(crate) mod fake;

/// Instance-wide options handed to the engine once, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub quiet: bool,
    pub collect_stats: bool,
    pub subtitle_autodetect: bool,
    pub input_repeat: u32,
}

impl EngineOptions {
    /// Instance option strings, same form as [`MediaOptions::as_args`].
    pub fn as_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.quiet {
            args.push(String::from("quiet"));
        }
        args.push(String::from(if self.collect_stats {
            "stats"
        } else {
            "no-stats"
        }));
        if !self.subtitle_autodetect {
            args.push(String::from("no-sub-autodetect-file"));
        }
        args.push(format!("input-repeat={}", self.input_repeat));
        args
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            quiet: true,
            collect_stats: false,
            subtitle_autodetect: false,
            input_repeat: 65_535,
        }
    }
}

/// Per-media options attached to every prepared handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOptions {
    pub hardware_acceleration: bool,
    pub decode_threads: u8,
    pub fast_decode: bool,
    pub skip_frames: bool,
    pub repeat: bool,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            hardware_acceleration: false,
            decode_threads: 1,
            fast_decode: true,
            skip_frames: false,
            repeat: true,
        }
    }
}

impl MediaOptions {
    /// Option strings in the `key=value` form string-configured backends take.
    /// The repeat count comes from the engine instance.
    pub fn as_args(&self, engine: &EngineOptions) -> Vec<String> {
        let mut args = vec![
            format!(
                "avcodec-hw={}",
                if self.hardware_acceleration { "any" } else { "none" }
            ),
            format!("avcodec-threads={}", self.decode_threads),
            format!("skip-frames={}", u8::from(self.skip_frames)),
        ];
        if self.fast_decode {
            args.push(String::from("avcodec-fast"));
        }
        if self.repeat {
            args.push(format!("input-repeat={}", engine.input_repeat));
        }
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Pending,
    Parsed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Playing,
    Paused,
    Stopped,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaHealth {
    Ready,
    Pending,
    Unplayable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The media at this path played to its end.
    EndReached(PathBuf),
}

/// Engine-side end of the end-of-media channel. Safe to call from any thread;
/// the controller drains the other end on its own thread.
#[derive(Debug, Clone)]
pub struct EndOfMediaNotifier {
    tx: Sender<EngineEvent>,
}

impl EndOfMediaNotifier {
    pub fn new(tx: Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    pub fn notify(&self, path: &Path) {
        if self
            .tx
            .send(EngineEvent::EndReached(path.to_path_buf()))
            .is_err()
        {
            trace!("end-of-media dropped: controller is gone");
        }
    }
}

/// A parsed media resource. `release` frees the engine resources behind it
/// and is called exactly once by whoever owns the handle.
pub trait PreparedMedia {
    fn path(&self) -> &Path;
    fn parse_state(&self) -> ParseState;
    fn duration(&self) -> Option<Duration>;
    fn dimensions(&self) -> Option<(u32, u32)>;
    fn release(&mut self);

    fn health(&self) -> MediaHealth {
        match self.parse_state() {
            ParseState::Pending => MediaHealth::Pending,
            ParseState::Failed => MediaHealth::Unplayable,
            ParseState::Parsed => match self.duration() {
                Some(duration) if !duration.is_zero() => MediaHealth::Ready,
                _ => MediaHealth::Unplayable,
            },
        }
    }
}

pub trait MediaEngine {
    type Media: PreparedMedia;

    /// Creates a handle, attaches `options` and runs the metadata parse.
    fn prepare(&mut self, path: &Path, options: &MediaOptions) -> Self::Media;
    fn set_media(&mut self, media: &Self::Media);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to_start(&mut self);
    fn is_playing(&self) -> bool;
    fn state(&self) -> EngineState;
    /// Playback position as a fraction of the media length.
    fn position(&self) -> Option<f32>;
    fn video_dimensions(&self) -> Option<(u32, u32)>;
    fn subscribe_end_of_media(&mut self, notifier: EndOfMediaNotifier);
    fn tick(&mut self) {}
}

/// Engine without a decoder: every non-empty file is a clip of fixed length
/// played on a wall clock.
pub struct NullMediaEngine {
    options: EngineOptions,
    clip_length: Duration,
    prepared: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    state: EngineState,
    started_at: Option<Instant>,
    position_offset: Duration,
    notifier: Option<EndOfMediaNotifier>,
    end_sent: bool,
}

impl NullMediaEngine {
    pub fn new(options: EngineOptions, clip_length: Duration) -> Result<Self, ViewerError> {
        if clip_length.is_zero() {
            return Err(ViewerError::EngineInitFailure(String::from(
                "simulated clip length must be positive",
            )));
        }
        if options.input_repeat == 0 {
            return Err(ViewerError::EngineInitFailure(String::from(
                "input repeat count must be positive",
            )));
        }
        debug!(
            "null media engine up: {:?}, clip {clip_length:?}",
            options.as_args()
        );

        Ok(Self {
            options,
            clip_length,
            prepared: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            current: None,
            track_duration: None,
            state: EngineState::Idle,
            started_at: None,
            position_offset: Duration::ZERO,
            notifier: None,
            end_sent: false,
        })
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles prepared and not yet released.
    pub fn live_handles(&self) -> usize {
        self.prepared_count()
            .saturating_sub(self.released_count())
    }

    pub fn current_media(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if self.state == EngineState::Playing
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        match self.track_duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl MediaEngine for NullMediaEngine {
    type Media = NullMedia;

    fn prepare(&mut self, path: &Path, options: &MediaOptions) -> NullMedia {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        let playable = fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > 0);
        trace!(
            "prepared {} with {:?}",
            path.display(),
            options.as_args(&self.options)
        );

        NullMedia {
            path: path.to_path_buf(),
            parse_state: if playable {
                ParseState::Parsed
            } else {
                ParseState::Failed
            },
            duration: playable.then_some(self.clip_length),
            options: options.clone(),
            released: false,
            release_counter: Arc::clone(&self.released),
        }
    }

    fn set_media(&mut self, media: &NullMedia) {
        self.stop();
        self.current = Some(media.path.clone());
        self.track_duration = media.duration;
    }

    fn play(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.state == EngineState::Ended {
            self.position_offset = Duration::ZERO;
        }
        if self.state != EngineState::Playing {
            self.started_at = Some(Instant::now());
        }
        self.state = EngineState::Playing;
        self.end_sent = false;
    }

    fn pause(&mut self) {
        if self.state != EngineState::Playing {
            return;
        }
        self.position_offset = self.current_position();
        self.started_at = None;
        self.state = EngineState::Paused;
    }

    fn stop(&mut self) {
        if self.current.is_some() {
            self.state = EngineState::Stopped;
        }
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.end_sent = false;
    }

    fn seek_to_start(&mut self) {
        self.position_offset = Duration::ZERO;
        self.started_at = (self.state == EngineState::Playing).then(Instant::now);
    }

    fn is_playing(&self) -> bool {
        self.state == EngineState::Playing
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn position(&self) -> Option<f32> {
        self.current.as_ref()?;
        let duration = self.track_duration.filter(|d| !d.is_zero())?;
        Some((self.current_position().as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0))
    }

    fn video_dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn subscribe_end_of_media(&mut self, notifier: EndOfMediaNotifier) {
        self.notifier = Some(notifier);
    }

    fn tick(&mut self) {
        if self.state != EngineState::Playing {
            return;
        }
        let Some(duration) = self.track_duration else {
            return;
        };
        if self.current_position() < duration {
            return;
        }

        self.position_offset = duration;
        self.started_at = None;
        self.state = EngineState::Ended;
        if !self.end_sent {
            self.end_sent = true;
            if let (Some(notifier), Some(path)) = (&self.notifier, &self.current) {
                notifier.notify(path);
            }
        }
    }
}

#[derive(Debug)]
pub struct NullMedia {
    path: PathBuf,
    parse_state: ParseState,
    duration: Option<Duration>,
    options: MediaOptions,
    released: bool,
    release_counter: Arc<AtomicUsize>,
}

impl NullMedia {
    pub fn options(&self) -> &MediaOptions {
        &self.options
    }
}

impl PreparedMedia for NullMedia {
    fn path(&self) -> &Path {
        &self.path
    }

    fn parse_state(&self) -> ParseState {
        self.parse_state
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.release_counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use tempfile::tempdir;

    fn engine_with_clip(ms: u64) -> NullMediaEngine {
        NullMediaEngine::new(EngineOptions::default(), Duration::from_millis(ms))
            .expect("engine should start")
    }

    fn clip_fixture(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not really a video").expect("fixture should be written");
        path
    }

    #[test]
    fn zero_clip_length_fails_to_start() {
        let err = NullMediaEngine::new(EngineOptions::default(), Duration::ZERO)
            .err()
            .expect("zero clip should be rejected");
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_or_missing_files_do_not_parse() {
        let dir = tempdir().expect("tempdir");
        let empty = dir.path().join("empty.mp4");
        fs::write(&empty, b"").expect("fixture should be written");

        let mut engine = engine_with_clip(1_000);
        let options = MediaOptions::default();
        let empty_media = engine.prepare(&empty, &options);
        let missing_media = engine.prepare(&dir.path().join("missing.mp4"), &options);

        assert_eq!(empty_media.health(), MediaHealth::Unplayable);
        assert_eq!(missing_media.health(), MediaHealth::Unplayable);
    }

    #[test]
    fn prepared_media_carries_fixed_options() {
        let dir = tempdir().expect("tempdir");
        let path = clip_fixture(dir.path(), "a.mp4");

        let mut engine = engine_with_clip(1_000);
        let media = engine.prepare(&path, &MediaOptions::default());

        assert_eq!(media.health(), MediaHealth::Ready);
        assert!(!media.options().hardware_acceleration);
        assert_eq!(media.options().decode_threads, 1);
        assert!(media.options().repeat);
        assert!(
            media
                .options()
                .as_args(&EngineOptions::default())
                .contains(&String::from("avcodec-hw=none"))
        );
    }

    #[test]
    fn repeat_count_follows_engine_options() {
        let engine = EngineOptions {
            input_repeat: 3,
            ..EngineOptions::default()
        };
        let args = MediaOptions::default().as_args(&engine);
        assert!(args.contains(&String::from("input-repeat=3")));

        let once = MediaOptions {
            repeat: false,
            ..MediaOptions::default()
        };
        assert!(!once.as_args(&engine).iter().any(|arg| arg.starts_with("input-repeat")));

        let instance = engine.as_args();
        assert!(instance.contains(&String::from("quiet")));
        assert!(instance.contains(&String::from("no-stats")));
        assert!(instance.contains(&String::from("input-repeat=3")));
    }

    #[test]
    fn release_is_counted_once() {
        let dir = tempdir().expect("tempdir");
        let path = clip_fixture(dir.path(), "a.mp4");

        let mut engine = engine_with_clip(1_000);
        let mut media = engine.prepare(&path, &MediaOptions::default());
        assert_eq!(engine.live_handles(), 1);

        media.release();
        media.release();
        assert_eq!(engine.released_count(), 1);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn pause_freezes_position() {
        let dir = tempdir().expect("tempdir");
        let path = clip_fixture(dir.path(), "a.mp4");

        let mut engine = engine_with_clip(10_000);
        let media = engine.prepare(&path, &MediaOptions::default());
        engine.set_media(&media);
        engine.play();
        thread::sleep(Duration::from_millis(20));

        engine.pause();
        let paused = engine.position().expect("position should be present");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.position(), Some(paused));
        assert!(!engine.is_playing());

        engine.play();
        thread::sleep(Duration::from_millis(20));
        let resumed = engine.position().expect("position should be present");
        assert!(resumed > paused, "position should continue after resume");
    }

    #[test]
    fn elapsed_clip_ends_and_notifies_once() {
        let dir = tempdir().expect("tempdir");
        let path = clip_fixture(dir.path(), "a.mp4");
        let (tx, rx) = mpsc::channel();

        let mut engine = engine_with_clip(30);
        engine.subscribe_end_of_media(EndOfMediaNotifier::new(tx));
        let media = engine.prepare(&path, &MediaOptions::default());
        engine.set_media(&media);
        engine.play();

        thread::sleep(Duration::from_millis(60));
        engine.tick();
        engine.tick();

        assert_eq!(engine.state(), EngineState::Ended);
        assert_eq!(engine.position(), Some(1.0));
        assert_eq!(rx.try_recv(), Ok(EngineEvent::EndReached(path)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn seek_to_start_then_play_restarts_ended_clip() {
        let dir = tempdir().expect("tempdir");
        let path = clip_fixture(dir.path(), "a.mp4");

        let mut engine = engine_with_clip(20);
        let media = engine.prepare(&path, &MediaOptions::default());
        engine.set_media(&media);
        engine.play();
        thread::sleep(Duration::from_millis(40));
        engine.tick();
        assert_eq!(engine.state(), EngineState::Ended);

        engine.seek_to_start();
        engine.play();
        assert_eq!(engine.state(), EngineState::Playing);
        assert!(engine.position().expect("position") < 0.5);
    }
}
