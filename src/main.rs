use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spelldrill::{
    app::{App, AppSetup},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    progress::{FileProgressStore, ProgressStore},
    runtime::{CrosstermEventSource, DrillEvent, FixedTicker, Runner, SpeechWorker},
    session::{session_id, DrillMode},
    speech::{list_voices, PiperSpeaker, SpeedPreset},
    stats::StatsDb,
    ui::screen::draw,
    words::{FileWordStore, WordStore},
};

const TICK_RATE_MS: u64 = 100;
const EMPTY_LIST_MESSAGE: &str = "The word list is empty. Nothing to study.";

/// listen-and-type spelling drills spoken by piper
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Listen to each word spoken by a local piper voice and type it back. Missed words earn escalating letter hints, and words answered correctly often enough are retired as mastered."
)]
pub struct Cli {
    /// word list, one word or phrase per line
    #[clap(required_unless_present = "list_voices")]
    word_file: Option<PathBuf>,

    /// dictation speaks the word, spelling speaks its letters
    #[clap(short, long, value_enum)]
    mode: Option<DrillMode>,

    /// speech rate
    #[clap(short, long, value_enum)]
    speed: Option<SpeedPreset>,

    /// voice model name (file stem inside the voices directory)
    #[clap(long)]
    voice: Option<String>,

    /// correct answers needed to master a word
    #[clap(short = 't', long)]
    threshold: Option<u32>,

    /// regular attempts before hints start
    #[clap(short = 'a', long)]
    attempts: Option<u32>,

    /// attempts allowed once hints are shown
    #[clap(long)]
    hint_attempts: Option<u32>,

    /// path to the piper executable
    #[clap(long)]
    piper: Option<PathBuf>,

    /// directory holding .onnx voice models
    #[clap(long)]
    voices_dir: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long)]
    config: Option<PathBuf>,

    /// print the installed voices and exit
    #[clap(long)]
    list_voices: bool,

    /// forget saved progress for this word list before starting
    #[clap(long)]
    reset_progress: bool,

    /// do not speak feedback phrases, only the words
    #[clap(long)]
    mute_feedback: bool,

    /// debug level logging
    #[clap(short, long)]
    verbose: bool,
}

impl Cli {
    /// Overlay command line choices on the stored config
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
        if let Some(voice) = &self.voice {
            config.piper.voice = voice.clone();
        }
        if let Some(threshold) = self.threshold {
            config.mastery_threshold = threshold;
        }
        if let Some(attempts) = self.attempts {
            config.regular_attempts = attempts;
        }
        if let Some(hint_attempts) = self.hint_attempts {
            config.hint_attempts = hint_attempts;
        }
        if let Some(piper) = &self.piper {
            config.piper.executable = piper.clone();
        }
        if let Some(dir) = &self.voices_dir {
            config.piper.voices_dir = dir.clone();
        }
        if self.mute_feedback {
            config.speak_feedback = false;
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

/// Log to a file: the terminal belongs to the TUI
fn init_logging(verbose: bool) -> Option<PathBuf> {
    let path = AppDirs::log_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "spelldrill=debug"
        } else {
            "spelldrill=info"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(cli.verbose);

    let store = cli.config_store();
    let stored = store.load();
    let mut config = stored.clone();
    cli.apply(&mut config);

    if cli.list_voices {
        let voices = list_voices(&config.piper.voices_dir);
        if voices.is_empty() {
            println!(
                "No voices found in {}",
                config.piper.voices_dir.display()
            );
        }
        for voice in voices {
            println!("{}\t{}", voice.name, voice.model.display());
        }
        return Ok(());
    }

    let word_file = cli
        .word_file
        .clone()
        .context("a word list file is required")?;
    let words = FileWordStore.load(&word_file)?;
    if words.is_empty() {
        println!("{}", EMPTY_LIST_MESSAGE);
        return Ok(());
    }

    let progress = FileProgressStore::new();
    if cli.reset_progress {
        for mode in DrillMode::ALL {
            progress.clear(&session_id(&word_file, mode))?;
        }
        info!("progress reset for {}", word_file.display());
    }

    let speaker = PiperSpeaker::new(&config.piper);
    speaker
        .check()
        .map_err(|e| {
            for tip in e.troubleshooting() {
                eprintln!("  - {}", tip);
            }
            e
        })
        .context("speech is not available")?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let stats = AppDirs::db_path().and_then(|path| match StatsDb::new(&path) {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("history disabled: {}", e);
            None
        }
    });

    let mut app = App::new(AppSetup {
        word_list: word_file,
        words,
        voices: list_voices(&config.piper.voices_dir),
        config,
        progress: Box::new(progress),
        stats,
        rng: StdRng::from_entropy(),
    })?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app, Box::new(speaker));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    outcome?;

    for line in app.finish(AppDirs::session_log_path().as_deref()) {
        println!("{}", line);
    }

    let mut saved = stored;
    saved.mode = app.config.mode;
    saved.speed = app.config.speed;
    saved.piper.voice = app.config.piper.voice.clone();
    if let Err(e) = store.save(&saved) {
        warn!("could not save config to {}: {}", store.path().display(), e);
    }
    if let Some(path) = log_path {
        info!("log written to {}", path.display());
    }

    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    speaker: Box<dyn spelldrill::speech::Speaker>,
) -> Result<()> {
    let events = CrosstermEventSource::new();
    let worker = SpeechWorker::spawn(speaker, events.sender());
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    app.start();
    loop {
        for command in app.take_speech() {
            if !worker.send(command) {
                warn!("speech worker is gone");
            }
        }
        terminal.draw(|f| draw(app, f))?;

        match runner.step() {
            DrillEvent::Tick => app.on_tick(),
            DrillEvent::Resize => {}
            DrillEvent::Key(key) => app.on_key(key),
            DrillEvent::Speech(report) => app.on_speech(report),
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
