use crate::cache::MediaCache;
use crate::config;
use crate::engine::{
    EndOfMediaNotifier, EngineEvent, EngineState, MediaEngine, MediaHealth, MediaOptions,
    PreparedMedia,
};
use crate::error::ViewerError;
use crate::library;
use crate::model::{ControllerState, EndOfMediaPolicy, PlayerStatus, Playlist, Settings};
use crate::shell::{Intent, PresentationShell, fit_window};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

/// Position fraction treated as "ended" by the liveness check.
const NEAR_END: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Owns the playlist position, the media cache and the player, and is the
/// only thing that changes any of them. Runs on one thread; engine
/// callbacks reach it through [`EndOfMediaNotifier`].
pub struct PlaybackController<E: MediaEngine, S: PresentationShell> {
    engine: E,
    shell: S,
    settings: Settings,
    playlist: Playlist,
    cache: MediaCache<E::Media>,
    current_index: Option<usize>,
    state: ControllerState,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    shuffle_rng: SmallRng,
    last_check: Instant,
    pending_polls: u32,
    pub status: String,
    pub dirty: bool,
}

impl<E: MediaEngine, S: PresentationShell> PlaybackController<E, S> {
    pub fn new(mut engine: E, shell: S, settings: Settings) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        engine.subscribe_end_of_media(EndOfMediaNotifier::new(events_tx.clone()));

        Self {
            engine,
            shell,
            settings,
            playlist: Playlist::default(),
            cache: MediaCache::new(MediaOptions::default()),
            current_index: None,
            state: ControllerState::Idle,
            events_tx,
            events_rx,
            shuffle_rng: SmallRng::from_os_rng(),
            last_check: Instant::now(),
            pending_polls: 0,
            status: String::from("Ready"),
            dirty: true,
        }
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.shuffle_rng = rng;
        self
    }

    /// A sender for end-of-media events, usable from any thread.
    pub fn end_of_media_notifier(&self) -> EndOfMediaNotifier {
        EndOfMediaNotifier::new(self.events_tx.clone())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn cache(&self) -> &MediaCache<E::Media> {
        &self.cache
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.playlist.get(self.current_index?)
    }

    pub fn current_media(&self) -> Option<&E::Media> {
        self.cache.get(self.current_index?)
    }

    pub fn player_status(&self) -> PlayerStatus {
        match self.engine.state() {
            EngineState::Playing => PlayerStatus::Playing,
            EngineState::Paused => PlayerStatus::Paused,
            _ => PlayerStatus::Stopped,
        }
    }

    pub fn position(&self) -> Option<f32> {
        self.current_index?;
        self.engine.position()
    }

    pub fn cycle_end_of_media_policy(&mut self) {
        self.settings.end_of_media = self.settings.end_of_media.next();
        self.set_status(&format!("End of video: {:?}", self.settings.end_of_media));
    }

    pub fn dispatch(&mut self, intent: Intent) -> Result<Flow, ViewerError> {
        match intent {
            Intent::Next => {
                self.navigate_next();
            }
            Intent::Previous => {
                self.navigate_previous();
            }
            Intent::TogglePlayPause => self.toggle_play_pause(),
            Intent::RevealCurrent => self.reveal_current(),
            Intent::SelectFolder(folder) => {
                self.open_folder(&folder)?;
            }
            Intent::Shutdown => {
                self.shutdown();
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Scans `folder` and starts playing it. A folder without videos is
    /// rejected and whatever was playing keeps playing.
    pub fn open_folder(&mut self, folder: &Path) -> Result<usize, ViewerError> {
        let playlist = library::scan_folder(folder, &mut self.shuffle_rng)?;
        if playlist.is_empty() {
            if self.playlist.is_empty() {
                self.shell.show_no_videos(folder);
            }
            self.set_status(&format!("No videos found in {}", folder.display()));
            return Err(ViewerError::invalid_directory(
                folder,
                "no supported video files",
            ));
        }

        let count = playlist.len();
        self.load_playlist(playlist);
        Ok(count)
    }

    pub fn load_playlist(&mut self, playlist: Playlist) {
        self.engine.stop();
        self.discard_queued_events();
        self.cache.release_all();
        self.playlist = playlist;
        self.pending_polls = 0;

        if self.playlist.is_empty() {
            self.current_index = None;
            self.state = ControllerState::Idle;
            self.shell.show_no_videos(&self.playlist.folder);
            self.set_status(&format!(
                "No videos found in {}",
                self.playlist.folder.display()
            ));
            return;
        }

        info!(
            "loaded {} videos from {}",
            self.playlist.len(),
            self.playlist.folder.display()
        );
        self.current_index = Some(0);
        self.state = ControllerState::Loading;
        self.load_current();
    }

    pub fn navigate_next(&mut self) -> bool {
        let Some(current) = self.current_index else {
            return false;
        };
        if self.state == ControllerState::Idle || current + 1 >= self.playlist.len() {
            return false;
        }
        self.step_to(current + 1);
        true
    }

    pub fn navigate_previous(&mut self) -> bool {
        let Some(current) = self.current_index else {
            return false;
        };
        if self.state == ControllerState::Idle || current == 0 {
            return false;
        }
        self.step_to(current - 1);
        true
    }

    /// Flips whatever the engine says it is doing.
    pub fn toggle_play_pause(&mut self) {
        if !matches!(
            self.state,
            ControllerState::Playing | ControllerState::Paused
        ) {
            return;
        }

        if self.engine.is_playing() {
            self.engine.pause();
            self.state = ControllerState::Paused;
            self.set_status("Paused");
        } else {
            self.engine.play();
            self.state = ControllerState::Playing;
            self.last_check = Instant::now();
            self.set_status("Playing");
        }
    }

    pub fn reveal_current(&mut self) {
        let Some(path) = self.current_path().map(config::normalize_path) else {
            self.set_status("Nothing to reveal");
            return;
        };
        self.shell.reveal_in_file_manager(&path);
        self.set_status(&format!("Revealed {}", path.display()));
    }

    pub fn handle_end_of_media(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        if !matches!(
            self.state,
            ControllerState::Playing | ControllerState::Paused
        ) {
            debug!("ignoring end of media while {:?}", self.state);
            return;
        }

        self.state = ControllerState::EndTransitioning;
        match self.settings.end_of_media {
            EndOfMediaPolicy::LoopOne => self.restart_current(),
            EndOfMediaPolicy::Advance => {
                let next = (current + 1) % self.playlist.len();
                if next == current {
                    self.restart_current();
                } else {
                    self.step_to(next);
                }
            }
        }
    }

    /// Applies every end-of-media event the engine has posted so far for
    /// the current video. Events for any other media are dropped.
    pub fn pump_engine_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                EngineEvent::EndReached(path) => {
                    if self.current_path() != Some(path.as_path()) {
                        debug!("ignoring end of media for {}", path.display());
                        continue;
                    }
                    self.handle_end_of_media();
                }
            }
            handled += 1;
        }
        handled
    }

    /// One turn of the control loop: engine housekeeping, posted events,
    /// and every poll interval either the liveness check or a retry of a
    /// media whose parse has not finished.
    pub fn tick(&mut self, now: Instant) {
        self.engine.tick();
        self.pump_engine_events();

        if now.saturating_duration_since(self.last_check) < self.poll_interval() {
            return;
        }
        self.last_check = now;

        match self.state {
            ControllerState::Playing => self.check_liveness(),
            ControllerState::Loading => {
                self.pending_polls = self.pending_polls.saturating_add(1);
                self.load_current();
            }
            _ => {}
        }
    }

    pub fn shutdown(&mut self) {
        self.engine.stop();
        self.cache.release_all();
        self.state = ControllerState::Idle;
        info!("playback shut down");
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.settings.poll_interval_ms)
    }

    fn check_liveness(&mut self) {
        let ended = self.engine.state() == EngineState::Ended;
        let near_end = self
            .engine
            .position()
            .is_some_and(|position| position >= NEAR_END);
        if ended || near_end {
            debug!("liveness check caught the end (ended: {ended})");
            self.handle_end_of_media();
        }
    }

    fn step_to(&mut self, index: usize) {
        self.engine.stop();
        self.discard_queued_events();
        self.current_index = Some(index);
        self.state = ControllerState::Loading;
        self.pending_polls = 0;
        self.dirty = true;
        self.load_current();
    }

    /// Anything still queued was posted for the media being left.
    fn discard_queued_events(&mut self) {
        let dropped = self.events_rx.try_iter().count();
        if dropped > 0 {
            debug!("dropped {dropped} end-of-media events for the previous video");
        }
    }

    fn restart_current(&mut self) {
        self.engine.seek_to_start();
        self.engine.play();
        self.state = ControllerState::Playing;
        self.last_check = Instant::now();
        if let Some(path) = self.current_path() {
            debug!("restarted {}", path.display());
        }
        self.dirty = true;
    }

    /// Makes the current index playable, walking forward past files that
    /// fail to parse. Ends in `Idle` when nothing ahead can play.
    fn load_current(&mut self) {
        let Some(mut index) = self.current_index else {
            return;
        };
        let len = self.playlist.len();

        loop {
            let health = self
                .cache
                .ensure(index, self.playlist.play_order(), &mut self.engine)
                .map_or(MediaHealth::Unplayable, |media| media.health());

            match health {
                MediaHealth::Ready => {
                    self.current_index = Some(index);
                    self.activate(index);
                    return;
                }
                MediaHealth::Pending if self.pending_polls < self.settings.max_pending_polls => {
                    self.current_index = Some(index);
                    self.state = ControllerState::Loading;
                    self.set_status(&format!("Loading {}", self.display_name(index)));
                    return;
                }
                MediaHealth::Pending | MediaHealth::Unplayable => {
                    let path = self.playlist.get(index).map(Path::to_path_buf);
                    let err = ViewerError::UnplayableMedia {
                        path: path.unwrap_or_default(),
                        index,
                    };
                    warn!("{err}; skipping");
                    self.pending_polls = 0;
                    if index + 1 >= len {
                        break;
                    }
                    index += 1;
                }
            }
        }

        self.engine.stop();
        self.cache.release_all();
        self.current_index = None;
        self.state = ControllerState::Idle;
        self.shell.show_no_videos(&self.playlist.folder);
        self.set_status("No playable videos left");
    }

    fn activate(&mut self, index: usize) {
        let Some(media) = self.cache.get(index) else {
            return;
        };
        self.engine.set_media(media);
        let dimensions = media.dimensions();
        let path: PathBuf = media.path().to_path_buf();

        self.engine.play();
        let dimensions = dimensions.or_else(|| self.engine.video_dimensions());
        let hint = fit_window(dimensions, self.shell.display_bounds());
        self.shell.set_content_size_hint(hint);

        self.cache
            .reconcile(index, self.playlist.play_order(), &mut self.engine);

        self.state = ControllerState::Playing;
        self.pending_polls = 0;
        self.last_check = Instant::now();
        info!(
            "playing {} ({}/{})",
            path.display(),
            index + 1,
            self.playlist.len()
        );
        self.set_status(&format!("Playing {}", self.display_name(index)));
    }

    fn display_name(&self, index: usize) -> String {
        self.playlist
            .get(index)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("#{index}"))
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
