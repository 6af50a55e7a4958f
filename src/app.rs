use crate::config;
use crate::controller::{Flow, PlaybackController};
use crate::engine::{EngineOptions, MediaEngine, NullMediaEngine};
use crate::library;
use crate::model::Settings;
use crate::shell::{Intent, PresentationShell, SizeHint};
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{error, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::{File, OpenOptions};
use std::io::{self, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct StartupOptions {
    pub folder: Option<PathBuf>,
}

/// The terminal stand-in for the video window: it remembers the content
/// size the player asked for and any "no videos" notice.
#[derive(Debug)]
pub struct TerminalShell {
    display: (u32, u32),
    hint: Option<SizeHint>,
    notice: Option<String>,
}

impl TerminalShell {
    pub fn new(display: (u32, u32)) -> Self {
        Self {
            display,
            hint: None,
            notice: None,
        }
    }

    pub fn hint(&self) -> Option<SizeHint> {
        self.hint
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

impl PresentationShell for TerminalShell {
    fn display_bounds(&self) -> (u32, u32) {
        self.display
    }

    fn set_content_size_hint(&mut self, hint: SizeHint) {
        self.hint = Some(hint);
        self.notice = None;
    }

    fn show_no_videos(&mut self, folder: &Path) {
        self.hint = None;
        self.notice = Some(format!("No playable videos in {}", folder.display()));
    }
}

/// Text being typed into the "open folder" popup.
#[derive(Debug, Default)]
pub struct FolderPrompt {
    pub buffer: String,
    pub error: Option<String>,
}

impl FolderPrompt {
    fn starting_at(folder: &Path, error: Option<String>) -> Self {
        Self {
            buffer: folder.display().to_string(),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyAction {
    Intent(Intent),
    OpenPrompt,
    CyclePolicy,
}

pub fn run(options: StartupOptions) -> Result<()> {
    let (root, root_error) = match config::ensure_config_dir() {
        Ok(root) => (Some(root), None),
        Err(err) => (None, Some(err)),
    };
    let (settings, settings_error) = match root.as_deref().map(config::load_settings_in) {
        Some(Ok(settings)) => (settings, None),
        Some(Err(err)) => (Settings::default(), Some(err)),
        None => (Settings::default(), None),
    };
    let mut log_error = None;
    let log_target: Box<dyn Write + Send> = match root.as_deref().map(open_log_file) {
        Some(Ok(file)) => Box::new(file),
        Some(Err(err)) => {
            log_error = Some(err);
            Box::new(io::sink())
        }
        None => Box::new(io::sink()),
    };
    init_logging(log_target, &settings)?;

    match &root {
        Some(root) => info!("vfeed starting, config at {}", root.display()),
        None => info!("vfeed starting without a config directory"),
    }
    if let Some(err) = root_error {
        warn!("{err:#}; running without a last-folder record");
    }
    if let Some(err) = log_error {
        warn!("{err:#}; logging is disabled");
    }
    if let Some(err) = settings_error {
        warn!("{err:#}; using default settings");
    }

    let engine = NullMediaEngine::new(
        EngineOptions::default(),
        Duration::from_secs(settings.simulated_clip_seconds),
    )
    .inspect_err(|err| error!("media engine failed to start: {err}"))?;
    let shell = TerminalShell::new((settings.display_width, settings.display_height));
    let mut controller = PlaybackController::new(engine, shell, settings);

    let start = config::resolve_start_folder(options.folder, root.as_deref());
    let mut prompt = match controller.open_folder(&start) {
        Ok(_) => None,
        Err(err) => {
            warn!("{err}");
            Some(FolderPrompt::starting_at(&start, Some(err.to_string())))
        }
    };

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        controller.tick(Instant::now());

        if controller.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| crate::ui::draw(frame, &controller, prompt.as_ref()))?;
            controller.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let event = event::read()?;
        if let Event::Mouse(mouse) = event {
            if prompt.is_none()
                && let Some(intent) = intent_for_scroll(mouse.kind)
            {
                apply(&mut controller, intent);
            }
            continue;
        }

        let Event::Key(key) = event else {
            controller.dirty = true;
            continue;
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(active) = prompt.as_mut() {
            match key.code {
                KeyCode::Esc => {
                    if controller.playlist().is_empty() {
                        break Ok(());
                    }
                    prompt = None;
                }
                KeyCode::Enter => {
                    if submit_folder(&mut controller, root.as_deref(), active) {
                        prompt = None;
                    }
                }
                KeyCode::Backspace => {
                    active.buffer.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    break Ok(());
                }
                KeyCode::Char(ch) => active.buffer.push(ch),
                _ => {}
            }
            controller.dirty = true;
            continue;
        }

        match action_for_key(key) {
            Some(KeyAction::Intent(intent)) => {
                if apply(&mut controller, intent) == Flow::Exit {
                    break Ok(());
                }
            }
            Some(KeyAction::OpenPrompt) => {
                let folder = controller.playlist().folder.clone();
                prompt = Some(FolderPrompt::starting_at(&folder, None));
                controller.dirty = true;
            }
            Some(KeyAction::CyclePolicy) => controller.cycle_end_of_media_policy(),
            None => {}
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    controller.shutdown();
    info!("vfeed exiting");
    result
}

fn open_log_file(root: &Path) -> Result<File> {
    let log_path = config::log_path(root);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))
}

fn init_logging(target: Box<dyn Write + Send>, settings: &Settings) -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .format_timestamp_millis()
    .target(env_logger::Target::Pipe(target))
    .try_init()
    .context("logger already initialized")?;
    Ok(())
}

fn action_for_key(key: KeyEvent) -> Option<KeyAction> {
    let action = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyAction::Intent(Intent::Shutdown)
        }
        KeyCode::Esc | KeyCode::Char('q') => KeyAction::Intent(Intent::Shutdown),
        KeyCode::Down | KeyCode::Char('j') => KeyAction::Intent(Intent::Next),
        KeyCode::Up | KeyCode::Char('k') => KeyAction::Intent(Intent::Previous),
        KeyCode::Char(' ') => KeyAction::Intent(Intent::TogglePlayPause),
        KeyCode::Enter => KeyAction::Intent(Intent::RevealCurrent),
        KeyCode::Char('o') => KeyAction::OpenPrompt,
        KeyCode::Char('m') => KeyAction::CyclePolicy,
        _ => return None,
    };
    Some(action)
}

fn intent_for_scroll(kind: MouseEventKind) -> Option<Intent> {
    match kind {
        MouseEventKind::ScrollDown => Some(Intent::Next),
        MouseEventKind::ScrollUp => Some(Intent::Previous),
        _ => None,
    }
}

fn apply<E: MediaEngine, S: PresentationShell>(
    controller: &mut PlaybackController<E, S>,
    intent: Intent,
) -> Flow {
    match controller.dispatch(intent) {
        Ok(flow) => flow,
        Err(err) => {
            if err.is_fatal() {
                error!("{err}");
            } else {
                warn!("{err}");
            }
            controller.status = err.to_string();
            controller.dirty = true;
            Flow::Continue
        }
    }
}

/// Opens the typed folder. On success the folder becomes the remembered
/// start folder, when there is a config root to remember it in, and `true`
/// is returned.
fn submit_folder<E: MediaEngine, S: PresentationShell>(
    controller: &mut PlaybackController<E, S>,
    root: Option<&Path>,
    prompt: &mut FolderPrompt,
) -> bool {
    let input = prompt.buffer.trim();
    if input.is_empty() {
        prompt.error = Some(String::from("Type a folder path"));
        return false;
    }

    let folder = PathBuf::from(input);
    if !library::has_video_files(&folder) {
        prompt.error = Some(format!("No videos found in {}", folder.display()));
        return false;
    }

    match controller.dispatch(Intent::SelectFolder(folder.clone())) {
        Ok(_) => {
            if let Some(root) = root
                && let Err(err) = config::save_last_folder_in(root, &folder)
            {
                warn!("{err}");
            }
            true
        }
        Err(err) => {
            prompt.error = Some(err.to_string());
            false
        }
    }
}
