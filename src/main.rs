use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use drumseq::audio::{self, SamplerDevice};
use drumseq::loader::{pattern_loader, sample_loader};
use drumseq::middle::{Middle, Request};
use drumseq::pipeline::persistence;
use drumseq::scheduler::{AudioClock, ThreadTimer};
use drumseq::session::PlaybackSession;
use drumseq::shared::InputEvent;

const KITS_DIR: &str = "kits";
const PATTERNS_FILE: &str = "patterns.json";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    init_logging(&project_dir)?;

    let project = persistence::load_project(&project_dir).unwrap_or_default();
    let audio = audio::start_audio()?;
    let device = audio.device();

    let kits_root = project_dir.join(KITS_DIR);
    let kit_dirs = sample_loader::list_kits(&kits_root).unwrap_or_else(|e| {
        log::warn!(target: "loader", "{e:#}");
        Vec::new()
    });
    let kit_names: Vec<String> = kit_dirs
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let patterns_path = project_dir.join(PATTERNS_FILE);
    let patterns = if patterns_path.is_file() {
        pattern_loader::load_patterns(&patterns_path).unwrap_or_else(|e| {
            log::error!(target: "loader", "{e:#}, using built-in patterns");
            pattern_loader::builtin_patterns()
        })
    } else {
        pattern_loader::builtin_patterns()
    };

    let clock: Arc<dyn AudioClock> = device.clone();
    let session = PlaybackSession::new(device.clone(), clock.clone(), Box::new(ThreadTimer::new()), project.scheduler_config());
    let mut middle = Middle::new(session, clock, patterns, kit_names, &project);
    if let Some(kit) = middle.selected_kit().map(str::to_string) {
        let text = install_kit(&device, &kits_root, &kit);
        middle.set_display_text(text);
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        middle.tick();
        let ds = middle.display_state();

        term.draw(|frame| {
            drumseq::tui::view::render(frame, frame.area(), &ds, blink_on);
        })?;

        for event in drumseq::tui::input::poll_input(tick_rate)? {
            if event == InputEvent::Quit {
                // save before quitting
                if let Err(e) = persistence::save_project(&project_dir, &middle.project_state(&project)) {
                    log::error!(target: "session", "saving project: {e:#}");
                }
                log::info!(target: "session", "quit");
                return Ok(());
            }
            for request in middle.handle_input(event) {
                match request {
                    Request::LoadKit(name) => {
                        let text = install_kit(&device, &kits_root, &name);
                        middle.set_display_text(text);
                    }
                }
            }
        }
    }
}

// returns the text to flash on screen
fn install_kit(device: &SamplerDevice, kits_root: &Path, name: &str) -> String {
    match sample_loader::load_kit(&kits_root.join(name), device.sample_rate()) {
        Ok(kit) => {
            device.install_kit(kit);
            format!("KIT {name}")
        }
        Err(e) => {
            log::error!(target: "loader", "{e:#}");
            format!("KIT {name} FAILED")
        }
    }
}

// raw mode owns the terminal, so logs go to <project>/.drumseq/drumseq.log
fn init_logging(project_dir: &Path) -> anyhow::Result<()> {
    persistence::ensure_project_dir(project_dir)?;
    let path = persistence::log_file_path(project_dir);
    let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
