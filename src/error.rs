//! Error types shared across the drill.

use std::path::PathBuf;
use thiserror::Error;

use crate::speech::SpeakFailure;

#[derive(Error, Debug)]
pub enum DrillError {
    #[error("word list not found: '{}'", .0.display())]
    WordListNotFound(PathBuf),

    #[error("the word list is empty")]
    EmptyWordList,

    #[error("no saved progress for '{0}'")]
    ProgressNotFound(String),

    #[error("saved progress for '{session_id}' is unreadable: {reason}")]
    MalformedProgress { session_id: String, reason: String },

    #[error("invalid level table: {0}")]
    InvalidTiers(String),

    #[error(transparent)]
    Speak(#[from] SpeakFailure),

    #[error("stats database error: {0}")]
    Stats(#[from] rusqlite::Error),

    #[error("session log error: {0}")]
    Log(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type DrillResult<T> = Result<T, DrillError>;
