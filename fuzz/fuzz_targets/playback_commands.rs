#![no_main]

use libfuzzer_sys::fuzz_target;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use vfeed::controller::PlaybackController;
use vfeed::engine::{EngineOptions, NullMediaEngine};
use vfeed::model::Settings;
use vfeed::shell::{Intent, PresentationShell, SizeHint};

struct NoShell;

impl PresentationShell for NoShell {
    fn display_bounds(&self) -> (u32, u32) {
        (1920, 1080)
    }

    fn set_content_size_hint(&mut self, _hint: SizeHint) {}

    fn show_no_videos(&mut self, _folder: &Path) {}

    fn reveal_in_file_manager(&mut self, _path: &Path) {}
}

// Every fourth clip is empty and fails to parse.
fn clip_folder() -> &'static PathBuf {
    static FOLDER: OnceLock<PathBuf> = OnceLock::new();
    FOLDER.get_or_init(|| {
        let folder = std::env::temp_dir().join("vfeed-fuzz-clips");
        let _ = fs::create_dir_all(&folder);
        for n in 0..16 {
            let body: &[u8] = if n % 4 == 3 { b"" } else { b"clip" };
            let _ = fs::write(folder.join(format!("clip_{n:02}.mp4")), body);
        }
        folder
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(engine) = NullMediaEngine::new(EngineOptions::default(), Duration::from_secs(30))
    else {
        return;
    };
    let mut controller = PlaybackController::new(engine, NoShell, Settings::default());
    if controller.open_folder(clip_folder()).is_err() {
        return;
    }

    let start = Instant::now();
    for (step, byte) in data.iter().enumerate() {
        let intent = match byte % 6 {
            0 | 1 => Intent::Next,
            2 => Intent::Previous,
            3 => Intent::TogglePlayPause,
            4 => {
                controller.handle_end_of_media();
                continue;
            }
            _ => {
                controller.tick(start + Duration::from_millis(600 * step as u64));
                continue;
            }
        };
        let _ = controller.dispatch(intent);

        let len = controller.playlist().len();
        if let Some(index) = controller.current_index() {
            assert!(index < len);
        }
        if controller.state().is_active() {
            let index = controller.current_index().expect("active without index");
            assert!(controller.cache().contains(index));
            assert!(controller.cache().is_contiguous_window());
        }
    }

    controller.shutdown();
    assert_eq!(controller.engine().live_handles(), 0);
});
