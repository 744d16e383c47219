use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::{debug, warn};

use crate::speech::{Speaker, Voice};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum DrillEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Speech(SpeechReport),
}

/// Why something is being said
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechPurpose {
    /// First reading of a newly selected word
    Present,
    /// Re-reading after a miss; answers wait for it like `Present`
    Retry,
    Repeat,
    Feedback,
    VoiceChange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub speed_scale: f32,
    pub purpose: SpeechPurpose,
    /// Identifies the presentation this belongs to
    pub ticket: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpeechCommand {
    Say(Utterance),
    UseVoice(Voice),
}

/// Result of one speech command, sent back through the event channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechReport {
    pub purpose: SpeechPurpose,
    pub ticket: u64,
    pub error: Option<String>,
    pub tips: Vec<&'static str>,
}

impl SpeechReport {
    pub fn ok(purpose: SpeechPurpose, ticket: u64) -> Self {
        Self {
            purpose,
            ticket,
            error: None,
            tips: Vec::new(),
        }
    }

    pub fn failed(purpose: SpeechPurpose, ticket: u64, error: impl Into<String>) -> Self {
        Self {
            purpose,
            ticket,
            error: Some(error.into()),
            tips: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Source of terminal events (keyboard, resize, speech reports)
pub trait DrillEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<DrillEvent>,
    rx: Receiver<DrillEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let keys = tx.clone();

        thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => keys.send(DrillEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => keys.send(DrillEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Handle for other producers (the speech worker) to feed this source
    pub fn sender(&self) -> Sender<DrillEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DrillEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<DrillEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<DrillEvent>) -> Self {
        Self { rx }
    }
}

impl DrillEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: DrillEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: DrillEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> DrillEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                DrillEvent::Tick
            }
        }
    }
}

/// Owns the speaker on its own thread and speaks commands in order
pub struct SpeechWorker {
    commands: Option<Sender<SpeechCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl SpeechWorker {
    pub fn spawn(mut speaker: Box<dyn Speaker>, events: Sender<DrillEvent>) -> Self {
        let (tx, rx) = mpsc::channel::<SpeechCommand>();

        let handle = thread::spawn(move || {
            for command in rx {
                let report = match command {
                    SpeechCommand::Say(utterance) => {
                        debug!(text = %utterance.text, purpose = ?utterance.purpose, "speaking");
                        match speaker.speak(&utterance.text, utterance.speed_scale) {
                            Ok(()) => SpeechReport::ok(utterance.purpose, utterance.ticket),
                            Err(e) => {
                                warn!("{} could not speak: {}", speaker.name(), e);
                                let mut report = SpeechReport::failed(
                                    utterance.purpose,
                                    utterance.ticket,
                                    e.to_string(),
                                );
                                report.tips = e.troubleshooting();
                                report
                            }
                        }
                    }
                    SpeechCommand::UseVoice(voice) => match speaker.select_voice(&voice) {
                        Ok(()) => SpeechReport::ok(SpeechPurpose::VoiceChange, 0),
                        Err(e) => {
                            warn!("could not switch to voice {}: {}", voice.name, e);
                            SpeechReport::failed(SpeechPurpose::VoiceChange, 0, e.to_string())
                        }
                    },
                };
                if events.send(DrillEvent::Speech(report)).is_err() {
                    break;
                }
            }
        });

        Self {
            commands: Some(tx),
            handle: Some(handle),
        }
    }

    /// Queue a command; false once the worker is gone
    pub fn send(&self, command: SpeechCommand) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok())
    }

    /// Stop accepting commands and wait for queued speech to finish
    pub fn join(mut self) {
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SpeakFailure;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        said: Arc<Mutex<Vec<String>>>,
    }

    impl Speaker for Recorder {
        fn speak(&self, text: &str, _speed_scale: f32) -> Result<(), SpeakFailure> {
            if text == "boom" {
                return Err(SpeakFailure::Playback {
                    detail: "ALSA lib: unable to open slave".into(),
                });
            }
            self.said.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    fn say(text: &str, purpose: SpeechPurpose, ticket: u64) -> SpeechCommand {
        SpeechCommand::Say(Utterance {
            text: text.into(),
            speed_scale: 1.0,
            purpose,
            ticket,
        })
    }

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            DrillEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(DrillEvent::Resize).unwrap();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            DrillEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn worker_speaks_in_order_and_reports_back() {
        let said = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();
        let worker = SpeechWorker::spawn(
            Box::new(Recorder {
                said: Arc::clone(&said),
            }),
            tx,
        );

        assert!(worker.send(say("cat", SpeechPurpose::Present, 1)));
        assert!(worker.send(say("well done", SpeechPurpose::Feedback, 1)));
        worker.join();

        assert_eq!(*said.lock().unwrap(), vec!["cat", "well done"]);
        let reports: Vec<SpeechReport> = rx
            .try_iter()
            .filter_map(|ev| match ev {
                DrillEvent::Speech(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], SpeechReport::ok(SpeechPurpose::Present, 1));
        assert_eq!(reports[1].purpose, SpeechPurpose::Feedback);
    }

    #[test]
    fn worker_reports_failures_with_tips() {
        let (tx, rx) = mpsc::channel();
        let worker = SpeechWorker::spawn(
            Box::new(Recorder {
                said: Arc::new(Mutex::new(Vec::new())),
            }),
            tx,
        );
        worker.send(say("boom", SpeechPurpose::Present, 7));
        worker.join();

        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(DrillEvent::Speech(report)) => {
                assert_eq!(report.ticket, 7);
                assert!(!report.is_ok());
                assert!(report.error.unwrap().contains("unable to open slave"));
                assert!(report.tips.iter().any(|t| t.contains("audio")));
            }
            other => panic!("expected a speech report, got {:?}", other),
        }
    }
}
