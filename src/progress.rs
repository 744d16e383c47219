//! Saving and restoring word progress between runs.
//!
//! Progress is a flat JSON mapping from word text to its counters plus the
//! streak. A file that fails to parse is never merged: the drill starts
//! fresh and the caller gets a warning to show.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::app_dirs::AppDirs;
use crate::error::{DrillError, DrillResult};
use crate::session::DrillSession;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordProgress {
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub mastered: bool,
    pub presented: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub streak: u32,
    pub words: BTreeMap<String, WordProgress>,
}

impl ProgressSnapshot {
    /// Records sharing a text merge into one entry: the higher counters win
    /// and mastery is kept if either copy reached it.
    pub fn capture(session: &DrillSession) -> Self {
        let mut words: BTreeMap<String, WordProgress> = BTreeMap::new();
        for r in session.records() {
            let entry = words.entry(r.text().to_string()).or_default();
            entry.correct_count = entry.correct_count.max(r.correct_count);
            entry.incorrect_count = entry.incorrect_count.max(r.incorrect_count);
            entry.mastered |= r.mastered;
            entry.presented |= r.presented;
        }
        Self {
            streak: session.streak,
            words,
        }
    }

    /// Copy saved counters onto the records with the same text. A word stays
    /// mastered only if it still meets `mastery_threshold`.
    pub fn apply(&self, session: &mut DrillSession, mastery_threshold: u32) {
        session.streak = self.streak;
        for record in session.records_mut() {
            if let Some(saved) = self.words.get(record.text()) {
                record.correct_count = saved.correct_count;
                record.incorrect_count = saved.incorrect_count;
                record.presented = saved.presented;
                record.mastered = saved.mastered && saved.correct_count >= mastery_threshold;
            }
        }
    }
}

pub trait ProgressStore {
    fn save(&self, session_id: &str, session: &DrillSession) -> DrillResult<()>;
    fn load(&self, session_id: &str) -> DrillResult<ProgressSnapshot>;
    fn clear(&self, session_id: &str) -> DrillResult<()>;
}

/// One JSON file per session id
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let dir = AppDirs::progress_dir().unwrap_or_else(|| PathBuf::from("spelldrill_progress"));
        Self { dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }
}

impl Default for FileProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore for FileProgressStore {
    fn save(&self, session_id: &str, session: &DrillSession) -> DrillResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session_id);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(&ProgressSnapshot::capture(session))?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        debug!("saved progress to {}", path.display());
        Ok(())
    }

    fn load(&self, session_id: &str) -> DrillResult<ProgressSnapshot> {
        let path = self.path_for(session_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DrillError::ProgressNotFound(session_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| DrillError::MalformedProgress {
            session_id: session_id.to_string(),
            reason: e.to_string(),
        })
    }

    fn clear(&self, session_id: &str) -> DrillResult<()> {
        match fs::remove_file(self.path_for(session_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Build a session for `words`, restoring saved progress when it is readable.
/// Only an empty word list is an error; unreadable progress becomes a warning.
pub fn restore_session(
    store: &dyn ProgressStore,
    session_id: &str,
    words: Vec<String>,
    mastery_threshold: u32,
) -> DrillResult<(DrillSession, Option<String>)> {
    let mut session = DrillSession::new(words)?;

    match store.load(session_id) {
        Ok(snapshot) => {
            snapshot.apply(&mut session, mastery_threshold);
            info!(
                "restored progress for {} ({} mastered)",
                session_id,
                session.mastered_count()
            );
            Ok((session, None))
        }
        Err(DrillError::ProgressNotFound(_)) => {
            debug!("no saved progress for {}", session_id);
            Ok((session, None))
        }
        Err(e) => {
            warn!("starting fresh: {}", e);
            Ok((session, Some(format!("{}; starting fresh", e))))
        }
    }
}
