use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DrillError, DrillResult};
use crate::words::WordRecord;

/// How a word is read out loud. Grading is the same for both.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum DrillMode {
    #[default]
    Dictation,
    Spelling,
}

impl DrillMode {
    pub const ALL: [DrillMode; 2] = [DrillMode::Dictation, DrillMode::Spelling];

    /// Text handed to the speaker for `word`
    pub fn utterance(&self, word: &str) -> String {
        match self {
            DrillMode::Dictation => word.to_string(),
            DrillMode::Spelling => word
                .chars()
                .map(|c| {
                    if c.is_whitespace() {
                        "space".to_string()
                    } else {
                        c.to_string()
                    }
                })
                .join(", "),
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            DrillMode::Dictation => "dictation",
            DrillMode::Spelling => "spelling",
        }
    }
}

/// Derive the progress key for a word list file and mode, e.g. `animals-dictation`
pub fn session_id(word_list: &Path, mode: DrillMode) -> String {
    let stem = word_list
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() {
        "words".to_string()
    } else {
        stem
    };
    format!("{}-{}", stem, mode.slug())
}

/// All word records of one word list in one mode, plus the running streak
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillSession {
    records: Vec<WordRecord>,
    pub streak: u32,
}

impl DrillSession {
    pub fn new(words: Vec<String>) -> DrillResult<Self> {
        if words.is_empty() {
            return Err(DrillError::EmptyWordList);
        }
        Ok(Self {
            records: words.into_iter().map(WordRecord::new).collect(),
            streak: 0,
        })
    }

    pub fn records(&self) -> &[WordRecord] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&WordRecord> {
        self.records.get(idx)
    }

    pub(crate) fn record_mut(&mut self, idx: usize) -> Option<&mut WordRecord> {
        self.records.get_mut(idx)
    }

    pub(crate) fn records_mut(&mut self) -> &mut [WordRecord] {
        &mut self.records
    }

    /// Indices of words that are not mastered yet
    pub fn active_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.records.iter().all(|r| r.mastered)
    }

    pub fn mastered_count(&self) -> usize {
        self.records.iter().filter(|r| r.mastered).count()
    }

    /// One line per word, as printed when the program exits
    pub fn summary_lines(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| {
                let status = if r.mastered {
                    format!(
                        "Mastered (correct: {}, incorrect: {})",
                        r.correct_count, r.incorrect_count
                    )
                } else if r.presented {
                    format!(
                        "Attempted (correct: {}, incorrect: {})",
                        r.correct_count, r.incorrect_count
                    )
                } else {
                    "Not studied".to_string()
                };
                format!("- {}: {}", r.text(), status)
            })
            .collect()
    }
}

/// Running totals for the current program run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTally {
    pub presentations: u32,
    pub correct: u32,
    pub hinted: u32,
    pub failed: u32,
    pub unspoken: u32,
    pub newly_mastered: u32,
    pub best_streak: u32,
}

impl SessionTally {
    pub fn observe_streak(&mut self, streak: u32) {
        self.best_streak = self.best_streak.max(streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::path::PathBuf;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn empty_word_list_is_rejected() {
        assert_matches!(DrillSession::new(vec![]), Err(DrillError::EmptyWordList));
    }

    #[test]
    fn records_follow_input_order() {
        let session = DrillSession::new(words(&["cat", "dog", "bird"])).unwrap();
        let texts: Vec<&str> = session.records().iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["cat", "dog", "bird"]);
        assert_eq!(session.streak, 0);
        assert_eq!(session.active_indices(), vec![0, 1, 2]);
        assert!(!session.is_complete());
    }

    #[test]
    fn active_indices_skip_mastered() {
        let mut session = DrillSession::new(words(&["cat", "dog"])).unwrap();
        session.record_mut(0).unwrap().mastered = true;
        assert_eq!(session.active_indices(), vec![1]);
        assert_eq!(session.mastered_count(), 1);
        session.record_mut(1).unwrap().mastered = true;
        assert!(session.is_complete());
    }

    #[test]
    fn summary_lines_describe_each_word() {
        let mut session = DrillSession::new(words(&["cat", "dog", "owl"])).unwrap();
        {
            let cat = session.record_mut(0).unwrap();
            cat.presented = true;
            cat.mastered = true;
            cat.correct_count = 2;
        }
        {
            let dog = session.record_mut(1).unwrap();
            dog.presented = true;
            dog.incorrect_count = 1;
        }
        assert_eq!(
            session.summary_lines(),
            vec![
                "- cat: Mastered (correct: 2, incorrect: 0)",
                "- dog: Attempted (correct: 0, incorrect: 1)",
                "- owl: Not studied",
            ]
        );
    }

    #[test]
    fn dictation_speaks_word_verbatim() {
        assert_eq!(DrillMode::Dictation.utterance("Cat"), "Cat");
    }

    #[test]
    fn spelling_speaks_letters() {
        assert_eq!(DrillMode::Spelling.utterance("cat"), "c, a, t");
        assert_eq!(DrillMode::Spelling.utterance("a b"), "a, space, b");
    }

    #[test]
    fn session_id_uses_stem_and_mode() {
        let path = PathBuf::from("/tmp/lists/Animals List.txt");
        assert_eq!(
            session_id(&path, DrillMode::Dictation),
            "animals_list-dictation"
        );
        assert_eq!(session_id(&path, DrillMode::Spelling), "animals_list-spelling");
    }

    #[test]
    fn session_id_falls_back_for_odd_paths() {
        assert_eq!(session_id(Path::new(""), DrillMode::Spelling), "words-spelling");
    }

    #[test]
    fn tally_tracks_best_streak() {
        let mut tally = SessionTally::default();
        tally.observe_streak(3);
        tally.observe_streak(1);
        assert_eq!(tally.best_streak, 3);
    }
}
