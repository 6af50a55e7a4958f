use super::{
    EndOfMediaNotifier, EngineState, MediaEngine, MediaOptions, ParseState, PreparedMedia,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Everything the fake engine saw, shared with the test that drives it.
#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub prepared: Vec<PathBuf>,
    pub released: Vec<u64>,
    pub broken: HashSet<PathBuf>,
    pub pending: HashSet<PathBuf>,
    pub dimensions: HashMap<PathBuf, (u32, u32)>,
    pub last_options: Option<MediaOptions>,
    pub active: Option<PathBuf>,
    pub state: Option<EngineState>,
    pub position: f32,
    pub seeks: usize,
    pub plays: usize,
    pub stops: usize,
    pub notifier: Option<EndOfMediaNotifier>,
    next_serial: u64,
}

impl FakeLog {
    pub fn released_count(&self, serial: u64) -> usize {
        self.released.iter().filter(|id| **id == serial).count()
    }
}

pub(crate) type SharedLog = Rc<RefCell<FakeLog>>;

pub(crate) struct FakeEngine {
    log: SharedLog,
}

impl FakeEngine {
    pub fn new() -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            Self {
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

#[derive(Debug)]
pub(crate) struct FakeMedia {
    pub path: PathBuf,
    pub serial: u64,
    log: SharedLog,
}

impl PreparedMedia for FakeMedia {
    fn path(&self) -> &Path {
        &self.path
    }

    fn parse_state(&self) -> ParseState {
        let log = self.log.borrow();
        if log.broken.contains(&self.path) {
            ParseState::Failed
        } else if log.pending.contains(&self.path) {
            ParseState::Pending
        } else {
            ParseState::Parsed
        }
    }

    fn duration(&self) -> Option<Duration> {
        (self.parse_state() == ParseState::Parsed).then(|| Duration::from_secs(10))
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.log.borrow().dimensions.get(&self.path).copied()
    }

    fn release(&mut self) {
        self.log.borrow_mut().released.push(self.serial);
    }
}

impl MediaEngine for FakeEngine {
    type Media = FakeMedia;

    fn prepare(&mut self, path: &Path, options: &MediaOptions) -> FakeMedia {
        let mut log = self.log.borrow_mut();
        log.prepared.push(path.to_path_buf());
        log.last_options = Some(options.clone());
        log.next_serial += 1;
        FakeMedia {
            path: path.to_path_buf(),
            serial: log.next_serial,
            log: Rc::clone(&self.log),
        }
    }

    fn set_media(&mut self, media: &FakeMedia) {
        let mut log = self.log.borrow_mut();
        log.active = Some(media.path.clone());
        log.state = Some(EngineState::Stopped);
        log.position = 0.0;
    }

    fn play(&mut self) {
        let mut log = self.log.borrow_mut();
        log.plays += 1;
        log.state = Some(EngineState::Playing);
    }

    fn pause(&mut self) {
        self.log.borrow_mut().state = Some(EngineState::Paused);
    }

    fn stop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.stops += 1;
        log.state = Some(EngineState::Stopped);
        log.position = 0.0;
    }

    fn seek_to_start(&mut self) {
        let mut log = self.log.borrow_mut();
        log.seeks += 1;
        log.position = 0.0;
    }

    fn is_playing(&self) -> bool {
        self.log.borrow().state == Some(EngineState::Playing)
    }

    fn state(&self) -> EngineState {
        self.log.borrow().state.unwrap_or(EngineState::Idle)
    }

    fn position(&self) -> Option<f32> {
        let log = self.log.borrow();
        log.active.as_ref()?;
        Some(log.position)
    }

    fn video_dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn subscribe_end_of_media(&mut self, notifier: EndOfMediaNotifier) {
        self.log.borrow_mut().notifier = Some(notifier);
    }
}
