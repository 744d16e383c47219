use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{DrillError, DrillResult};

/// Practice state of a single word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRecord {
    text: String,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub mastered: bool,
    pub presented: bool,
}

impl WordRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            correct_count: 0,
            incorrect_count: 0,
            mastered: false,
            presented: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_active(&self) -> bool {
        !self.mastered
    }
}

/// Source of drill word lists
pub trait WordStore {
    fn load(&self, path: &Path) -> DrillResult<Vec<String>>;
}

/// Plain text word lists, one word (or phrase) per line
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWordStore;

impl WordStore for FileWordStore {
    fn load(&self, path: &Path) -> DrillResult<Vec<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(parse_word_list(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DrillError::WordListNotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Trimmed, non-empty lines in file order
pub fn parse_word_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
