//! Headless application state.
//!
//! `App` owns one drill session per mode and turns key presses and speech
//! reports into engine calls. It never touches the terminal or the audio
//! device: speech goes out through [`App::take_speech`] and comes back as
//! [`SpeechReport`]s, so the whole flow can be driven from tests.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::celebration::{Celebration, Milestone};
use crate::config::Config;
use crate::drill::{DrillEngine, Phase, Presentation, Verdict};
use crate::error::DrillResult;
use crate::level::{LevelTracker, Tier};
use crate::progress::{restore_session, ProgressStore};
use crate::runtime::{SpeechCommand, SpeechPurpose, SpeechReport, Utterance};
use crate::session::{session_id, DrillMode, DrillSession, SessionTally};
use crate::speech::{SpeedPreset, Voice};
use crate::stats::{
    append_session_log, PresentationOutcome, PresentationStat, SessionLogRow, StatsDb,
    WordSummary,
};

pub const FEEDBACK_CORRECT: &str = "Congratulations! You got the word right!";
pub const FEEDBACK_CORRECT_HINTED: &str = "Congratulations! You got the word right with the hint!";
pub const FEEDBACK_HINT: &str = "You used all your regular attempts. Here is a hint.";
pub const FEEDBACK_FAILED: &str = "You used all your hint attempts. Don't give up! Keep practicing!";
pub const FEEDBACK_ALL_MASTERED: &str = "Congratulations! You have mastered every word in the list!";

pub fn mastered_phrase(word: &str) -> String {
    format!("Congratulations! You have mastered the word {}!", word)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Drill,
    History,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

/// Message block shown under the answer box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub tone: Tone,
    pub lines: Vec<String>,
}

impl Feedback {
    fn new<I, S>(tone: Tone, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tone,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySort {
    Word,
    Presentations,
    SuccessRate,
    Failed,
    LastSeen,
}

#[derive(Debug)]
pub struct HistoryState {
    pub rows: Vec<WordSummary>,
    pub sort_by: HistorySort,
    pub sort_ascending: bool,
    pub scroll_offset: usize,
    /// Why there is nothing to show, when the database could not be read
    pub unavailable: Option<String>,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            sort_by: HistorySort::Word,
            sort_ascending: true,
            scroll_offset: 0,
            unavailable: None,
        }
    }
}

impl HistoryState {
    pub fn sorted_rows(&self) -> Vec<&WordSummary> {
        let mut rows: Vec<&WordSummary> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            let cmp = match self.sort_by {
                HistorySort::Word => a.word.cmp(&b.word),
                HistorySort::Presentations => a.presentations.cmp(&b.presentations),
                HistorySort::SuccessRate => a
                    .success_rate()
                    .partial_cmp(&b.success_rate())
                    .unwrap_or(std::cmp::Ordering::Equal),
                HistorySort::Failed => a.failed.cmp(&b.failed),
                HistorySort::LastSeen => a.last_seen.cmp(&b.last_seen),
            };
            if self.sort_ascending {
                cmp
            } else {
                cmp.reverse()
            }
        });
        rows
    }

    fn sort(&mut self, by: HistorySort) {
        self.sort_by = by;
        self.scroll_offset = 0;
    }
}

/// One mode's session and the word currently on offer in it
#[derive(Debug)]
pub struct ModeTab {
    pub mode: DrillMode,
    pub session_id: String,
    pub session: DrillSession,
    pub presentation: Option<Presentation>,
    pub tally: SessionTally,
    pub visited: bool,
}

/// Everything `App::new` needs, gathered by the binary
pub struct AppSetup {
    pub word_list: PathBuf,
    pub words: Vec<String>,
    pub config: Config,
    pub voices: Vec<Voice>,
    pub progress: Box<dyn ProgressStore>,
    pub stats: Option<StatsDb>,
    pub rng: StdRng,
}

pub struct App {
    word_list: PathBuf,
    tabs: Vec<ModeTab>,
    active: usize,
    engine: DrillEngine,
    levels: LevelTracker,
    pub config: Config,
    pub input: String,
    pub feedback: Option<Feedback>,
    voices: Vec<Voice>,
    voice_idx: Option<usize>,
    pub celebration: Celebration,
    pub warnings: Vec<String>,
    outbox: Vec<SpeechCommand>,
    awaiting_speech: bool,
    continue_pending: bool,
    ticket: u64,
    trophy: bool,
    progress: Box<dyn ProgressStore>,
    stats: Option<StatsDb>,
    pub screen: Screen,
    return_to: Screen,
    pub history: HistoryState,
    should_quit: bool,
    viewport: (u16, u16),
    started_at: DateTime<Local>,
}

impl App {
    /// Restore both mode sessions. Fails only for an empty word list;
    /// unreadable progress or level tables end up in `warnings`.
    pub fn new(setup: AppSetup) -> DrillResult<Self> {
        let AppSetup {
            word_list,
            words,
            config,
            voices,
            progress,
            stats,
            rng,
        } = setup;

        let (levels, tier_warning) = config.level_tracker();
        let mut warnings: Vec<String> = tier_warning.into_iter().collect();
        let policy = config.policy();

        let mut tabs = Vec::with_capacity(DrillMode::ALL.len());
        for mode in DrillMode::ALL {
            let id = session_id(&word_list, mode);
            let (session, warning) =
                restore_session(progress.as_ref(), &id, words.clone(), policy.mastery_threshold)?;
            warnings.extend(warning);
            tabs.push(ModeTab {
                mode,
                session_id: id,
                session,
                presentation: None,
                tally: SessionTally::default(),
                visited: false,
            });
        }

        let active = tabs.iter().position(|t| t.mode == config.mode).unwrap_or(0);
        let voice_idx = voices.iter().position(|v| v.name == config.piper.voice);
        let feedback = if warnings.is_empty() {
            None
        } else {
            Some(Feedback::new(Tone::Warning, warnings.clone()))
        };

        Ok(Self {
            word_list,
            tabs,
            active,
            engine: DrillEngine::with_rng(policy, rng),
            levels,
            config,
            input: String::new(),
            feedback,
            voices,
            voice_idx,
            celebration: Celebration::new(),
            warnings,
            outbox: Vec::new(),
            awaiting_speech: false,
            continue_pending: false,
            ticket: 0,
            trophy: false,
            progress,
            stats,
            screen: Screen::Drill,
            return_to: Screen::Drill,
            history: HistoryState::default(),
            should_quit: false,
            viewport: (80, 24),
            started_at: Local::now(),
        })
    }

    /// Present the first word of the active mode
    pub fn start(&mut self) {
        info!(
            "drilling {} in {} mode",
            self.word_list.display(),
            self.active_mode()
        );
        self.enter_tab();
    }

    pub fn word_list_name(&self) -> String {
        self.word_list
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "words".to_string())
    }

    pub fn tabs(&self) -> &[ModeTab] {
        &self.tabs
    }

    pub fn active_tab(&self) -> &ModeTab {
        &self.tabs[self.active]
    }

    pub fn active_mode(&self) -> DrillMode {
        self.active_tab().mode
    }

    pub fn session(&self) -> &DrillSession {
        &self.active_tab().session
    }

    pub fn presentation(&self) -> Option<&Presentation> {
        self.active_tab().presentation.as_ref()
    }

    pub fn tally(&self) -> &SessionTally {
        &self.active_tab().tally
    }

    pub fn tier(&self) -> &Tier {
        self.levels.tier_for(self.session().streak)
    }

    pub fn next_tier(&self) -> Option<(&Tier, u32)> {
        self.levels.next_tier(self.session().streak)
    }

    pub fn speed(&self) -> SpeedPreset {
        self.config.speed
    }

    pub fn voice_name(&self) -> &str {
        &self.config.piper.voice
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn show_trophy(&self) -> bool {
        self.trophy
    }

    pub fn awaiting_speech(&self) -> bool {
        self.awaiting_speech
    }

    pub fn continue_pending(&self) -> bool {
        self.continue_pending
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }

    /// Drain speech queued since the last call
    pub fn take_speech(&mut self) -> Vec<SpeechCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn on_tick(&mut self) {
        self.celebration.update();
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::History => self.on_history_key(key),
            Screen::Drill | Screen::Complete => self.on_drill_key(key, ctrl),
        }
    }

    fn on_drill_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.switch_mode(),
            KeyCode::Char('t') if ctrl => self.open_history(),
            KeyCode::Char('r') if ctrl => self.repeat_word(),
            KeyCode::Char('s') if ctrl => self.cycle_speed(),
            KeyCode::Char('v') if ctrl => self.cycle_voice(),
            _ if self.screen == Screen::Complete => {}
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !ctrl => self.input.push(c),
            _ => {}
        }
    }

    fn on_history_key(&mut self, key: KeyEvent) {
        let history = &mut self.history;
        match key.code {
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                self.screen = self.return_to;
            }
            KeyCode::Up => history.scroll_offset = history.scroll_offset.saturating_sub(1),
            KeyCode::Down => history.scroll_offset += 1,
            KeyCode::PageUp => history.scroll_offset = history.scroll_offset.saturating_sub(10),
            KeyCode::PageDown => history.scroll_offset += 10,
            KeyCode::Home => history.scroll_offset = 0,
            KeyCode::Char('1') => history.sort(HistorySort::Word),
            KeyCode::Char('2') => history.sort(HistorySort::Presentations),
            KeyCode::Char('3') => history.sort(HistorySort::SuccessRate),
            KeyCode::Char('4') => history.sort(HistorySort::Failed),
            KeyCode::Char('5') => history.sort(HistorySort::LastSeen),
            KeyCode::Char(' ') => {
                history.sort_ascending = !history.sort_ascending;
                history.scroll_offset = 0;
            }
            _ => {}
        }
    }

    /// Grade the typed answer, or move on after an unspoken word
    pub fn submit(&mut self) {
        if self.continue_pending {
            self.present_next();
            return;
        }
        if self.awaiting_speech {
            self.feedback = Some(Feedback::new(Tone::Info, ["Listen to the word first..."]));
            return;
        }
        if self.input.trim().is_empty() {
            return;
        }
        let typed = std::mem::take(&mut self.input);

        let tab = &mut self.tabs[self.active];
        let Some(presentation) = tab.presentation.as_mut() else {
            return;
        };
        let streak_before = tab.session.streak;
        let verdict = self
            .engine
            .submit_attempt(&mut tab.session, presentation, &typed);
        let word = presentation.word().to_string();
        let attempts = presentation.attempts();
        let hint_level = presentation.max_level_shown();
        debug!(word = %word, ?verdict, "graded");

        self.trophy = false;
        match verdict {
            Verdict::Correct {
                hinted,
                mastered,
                streak,
            } => {
                let tally = &mut self.tabs[self.active].tally;
                tally.presentations += 1;
                if hinted {
                    tally.hinted += 1;
                } else {
                    tally.correct += 1;
                }
                tally.observe_streak(streak);
                if mastered {
                    tally.newly_mastered += 1;
                }

                let phrase = if hinted {
                    FEEDBACK_CORRECT_HINTED
                } else {
                    FEEDBACK_CORRECT
                };
                let mut lines = vec![phrase.to_string()];
                self.say_feedback(phrase);
                self.trophy = true;

                if mastered {
                    let phrase = mastered_phrase(&word);
                    self.say_feedback(&phrase);
                    lines.push(phrase);
                    self.celebrate(Milestone::Mastered(word.clone()));
                }
                if let Some(tier) = self.levels.promotion(streak_before, streak) {
                    let name = tier.name.clone();
                    info!("promoted to {}", name);
                    lines.push(format!("Level up! You are now a {}.", name));
                    self.celebrate(Milestone::Promotion(name));
                }
                self.feedback = Some(Feedback::new(Tone::Success, lines));

                let outcome = if hinted {
                    PresentationOutcome::Hinted
                } else {
                    PresentationOutcome::Correct
                };
                self.record_presentation(&word, outcome, attempts, hint_level);
                self.present_next();
            }
            Verdict::Retry { remaining } => {
                self.feedback = Some(Feedback::new(
                    Tone::Warning,
                    [format!("Incorrect. Try again. ({} attempts left)", remaining)],
                ));
                self.respeak_after_miss();
            }
            Verdict::Hint {
                level,
                hint,
                remaining,
                escalated,
            } => {
                let mut lines = Vec::new();
                if escalated {
                    self.say_feedback(FEEDBACK_HINT);
                    lines.push(FEEDBACK_HINT.to_string());
                } else {
                    lines.push("Incorrect. Here is a bigger hint.".to_string());
                }
                lines.push(format!(
                    "Hint {}: {} ({} attempts left)",
                    level, hint, remaining
                ));
                self.feedback = Some(Feedback::new(Tone::Warning, lines));
                self.respeak_after_miss();
            }
            Verdict::Failed => {
                let tally = &mut self.tabs[self.active].tally;
                tally.presentations += 1;
                tally.failed += 1;
                self.say_feedback(FEEDBACK_FAILED);
                self.feedback = Some(Feedback::new(
                    Tone::Error,
                    [
                        FEEDBACK_FAILED.to_string(),
                        format!("The word was \"{}\". Type it to continue.", word),
                    ],
                ));
                self.record_presentation(&word, PresentationOutcome::Failed, attempts, hint_level);
            }
            Verdict::Confirmed => self.present_next(),
            Verdict::RetypeRequired => {
                self.feedback = Some(Feedback::new(
                    Tone::Error,
                    [format!("Type \"{}\" to continue.", word)],
                ));
            }
            Verdict::Ignored => {}
        }
    }

    pub fn on_speech(&mut self, report: SpeechReport) {
        match report.purpose {
            SpeechPurpose::Present if report.ticket == self.ticket => {
                self.awaiting_speech = false;
                if let Some(error) = report.error {
                    self.forfeit_unspoken(error, report.tips);
                }
            }
            SpeechPurpose::Retry if report.ticket == self.ticket => {
                self.awaiting_speech = false;
                if let Some(error) = report.error {
                    let mut lines = vec![format!("Could not repeat the word: {}", error)];
                    lines.extend(report.tips.iter().map(|t| t.to_string()));
                    self.feedback = Some(Feedback::new(Tone::Error, lines));
                }
            }
            SpeechPurpose::Present | SpeechPurpose::Retry => {
                debug!(ticket = report.ticket, "ignoring a stale report");
            }
            SpeechPurpose::Repeat | SpeechPurpose::VoiceChange => {
                if let Some(error) = report.error {
                    let mut lines = vec![error];
                    lines.extend(report.tips.iter().map(|t| t.to_string()));
                    self.feedback = Some(Feedback::new(Tone::Error, lines));
                }
            }
            SpeechPurpose::Feedback => {
                if let Some(error) = report.error {
                    debug!("feedback phrase not spoken: {}", error);
                }
            }
        }
    }

    fn forfeit_unspoken(&mut self, error: String, tips: Vec<&'static str>) {
        let tab = &mut self.tabs[self.active];
        let Some(presentation) = tab.presentation.as_mut() else {
            return;
        };
        self.engine.forfeit(&mut tab.session, presentation);
        let word = presentation.word().to_string();
        tab.tally.presentations += 1;
        tab.tally.unspoken += 1;
        warn!("could not speak '{}': {}", word, error);

        let mut lines = vec![format!("Could not speak the word: {}", error)];
        lines.extend(tips.iter().map(|t| t.to_string()));
        lines.push("Press Enter to continue.".to_string());
        self.feedback = Some(Feedback::new(Tone::Error, lines));
        self.continue_pending = true;
        self.record_presentation(&word, PresentationOutcome::Unspoken, 0, 0);
    }

    fn enter_tab(&mut self) {
        let tab = &mut self.tabs[self.active];
        tab.visited = true;
        if tab.session.is_complete() {
            tab.presentation = None;
            self.screen = Screen::Complete;
            return;
        }
        self.screen = Screen::Drill;
        match tab.presentation.as_ref() {
            None => self.present_next(),
            Some(p) if p.phase() == Phase::Confirm => {
                let line = format!("Type \"{}\" to continue.", p.word());
                if let Some(feedback) = self.feedback.as_mut() {
                    feedback.lines.push(line);
                }
            }
            Some(_) => {}
        }
    }

    fn present_next(&mut self) {
        self.input.clear();
        self.continue_pending = false;

        let tab = &mut self.tabs[self.active];
        let Some(presentation) = self.engine.next_word(&mut tab.session) else {
            tab.presentation = None;
            self.complete();
            return;
        };
        let text = tab.mode.utterance(presentation.word());
        tab.presentation = Some(presentation);

        self.ticket += 1;
        self.awaiting_speech = true;
        self.say(text, SpeechPurpose::Present);
    }

    fn complete(&mut self) {
        info!("every word mastered in {} mode", self.active_mode());
        self.screen = Screen::Complete;
        self.awaiting_speech = false;
        self.say_feedback(FEEDBACK_ALL_MASTERED);
        self.celebrate(Milestone::AllMastered);
    }

    fn switch_mode(&mut self) {
        let tab = &mut self.tabs[self.active];
        // a failed word stays until it has been retyped
        let awaiting_retype = tab
            .presentation
            .as_ref()
            .is_some_and(|p| p.phase() == Phase::Confirm);
        if !awaiting_retype && tab.presentation.take().is_some() {
            debug!("abandoning the word on offer");
        }
        self.ticket += 1;
        self.awaiting_speech = false;
        self.continue_pending = false;
        self.trophy = false;
        self.input.clear();

        self.active = (self.active + 1) % self.tabs.len();
        let mode = self.active_mode();
        self.config.mode = mode;
        self.feedback = Some(Feedback::new(Tone::Info, [format!("{} mode", mode)]));
        self.enter_tab();
    }

    /// Say the word again and hold answers until it has been heard
    fn respeak_after_miss(&mut self) {
        let tab = &self.tabs[self.active];
        let Some(presentation) = tab.presentation.as_ref() else {
            return;
        };
        let text = tab.mode.utterance(presentation.word());
        self.ticket += 1;
        self.awaiting_speech = true;
        self.say(text, SpeechPurpose::Retry);
    }

    fn repeat_word(&mut self) {
        if self.continue_pending {
            return;
        }
        let tab = &self.tabs[self.active];
        let Some(presentation) = tab.presentation.as_ref() else {
            return;
        };
        if presentation.is_finished() {
            return;
        }
        let text = tab.mode.utterance(presentation.word());
        self.say(text, SpeechPurpose::Repeat);
    }

    fn cycle_speed(&mut self) {
        self.config.speed = self.config.speed.next();
        self.feedback = Some(Feedback::new(
            Tone::Info,
            [format!("Speed: {}", self.config.speed)],
        ));
        self.repeat_word();
    }

    fn cycle_voice(&mut self) {
        if self.voices.len() < 2 {
            self.feedback = Some(Feedback::new(
                Tone::Warning,
                [format!(
                    "No other voices found in {}",
                    self.config.piper.voices_dir.display()
                )],
            ));
            return;
        }
        let idx = self
            .voice_idx
            .map(|i| (i + 1) % self.voices.len())
            .unwrap_or(0);
        let voice = self.voices[idx].clone();
        self.voice_idx = Some(idx);
        self.config.piper.voice = voice.name.clone();
        self.feedback = Some(Feedback::new(Tone::Info, [format!("Voice: {}", voice.name)]));
        self.outbox.push(SpeechCommand::UseVoice(voice));
        self.repeat_word();
    }

    fn open_history(&mut self) {
        match &self.stats {
            Some(db) => match db.word_summary() {
                Ok(rows) => {
                    self.history.rows = rows;
                    self.history.unavailable = None;
                }
                Err(e) => {
                    warn!("could not read history: {}", e);
                    self.history.rows.clear();
                    self.history.unavailable = Some(format!("Could not read history: {}", e));
                }
            },
            None => {
                self.history.rows.clear();
                self.history.unavailable = Some("The history database is not available.".into());
            }
        }
        self.history.scroll_offset = 0;
        self.return_to = self.screen;
        self.screen = Screen::History;
    }

    fn say(&mut self, text: String, purpose: SpeechPurpose) {
        self.outbox.push(SpeechCommand::Say(Utterance {
            text,
            speed_scale: self.config.speed.length_scale(),
            purpose,
            ticket: self.ticket,
        }));
    }

    fn say_feedback(&mut self, phrase: &str) {
        if self.config.speak_feedback {
            self.say(phrase.to_string(), SpeechPurpose::Feedback);
        }
    }

    fn celebrate(&mut self, milestone: Milestone) {
        let (width, height) = self.viewport;
        self.celebration.start(width, height, milestone);
    }

    /// History row plus an autosave of the active session
    fn record_presentation(
        &mut self,
        word: &str,
        outcome: PresentationOutcome,
        attempts: u32,
        hint_level: u8,
    ) {
        let tab = &self.tabs[self.active];
        if let Some(db) = &self.stats {
            let stat = PresentationStat {
                word: word.to_string(),
                mode: tab.mode,
                outcome,
                attempts,
                hint_level,
                timestamp: Local::now(),
            };
            if let Err(e) = db.record_presentation(&stat) {
                warn!("could not record presentation: {}", e);
            }
        }
        if let Err(e) = self.progress.save(&tab.session_id, &tab.session) {
            warn!("could not save progress for {}: {}", tab.session_id, e);
        }
    }

    /// Save every visited session, log the run, and return the exit summary
    pub fn finish(&mut self, session_log: Option<&Path>) -> Vec<String> {
        let finished_at = Local::now();
        for tab in self.tabs.iter().filter(|t| t.visited) {
            if let Err(e) = self.progress.save(&tab.session_id, &tab.session) {
                warn!("could not save progress for {}: {}", tab.session_id, e);
            }
            let Some(path) = session_log else {
                continue;
            };
            if tab.tally.presentations == 0 {
                continue;
            }
            let row = SessionLogRow {
                started_at: self.started_at.to_rfc3339(),
                finished_at: finished_at.to_rfc3339(),
                word_list: self.word_list_name(),
                mode: tab.mode.slug().to_string(),
                presentations: tab.tally.presentations,
                correct: tab.tally.correct,
                hinted: tab.tally.hinted,
                failed: tab.tally.failed + tab.tally.unspoken,
                newly_mastered: tab.tally.newly_mastered,
                mastered_total: tab.session.mastered_count(),
                words_total: tab.session.records().len(),
                best_streak: tab.tally.best_streak,
            };
            if let Err(e) = append_session_log(path, &row) {
                warn!("could not append to {}: {}", path.display(), e);
            }
        }
        self.summary()
    }

    /// Per word status of every mode used in this run
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for tab in self.tabs.iter().filter(|t| t.visited) {
            lines.push(format!("{} results:", tab.mode));
            lines.extend(tab.session.summary_lines());
        }
        lines
    }
}
