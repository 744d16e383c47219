use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

use crate::error::DrillResult;
use crate::session::DrillMode;

/// How a single presentation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PresentationOutcome {
    Correct,
    Hinted,
    Failed,
    Unspoken,
}

/// One finished presentation of a word
#[derive(Debug, Clone)]
pub struct PresentationStat {
    pub word: String,
    pub mode: DrillMode,
    pub outcome: PresentationOutcome,
    pub attempts: u32,
    pub hint_level: u8,
    pub timestamp: DateTime<Local>,
}

/// Aggregated history for one word across all sessions
#[derive(Debug, Clone, PartialEq)]
pub struct WordSummary {
    pub word: String,
    pub presentations: i64,
    pub correct: i64,
    pub hinted: i64,
    pub failed: i64,
    pub last_seen: Option<DateTime<Local>>,
}

impl WordSummary {
    /// Share of presentations answered right, hinted or not, in percent
    pub fn success_rate(&self) -> f64 {
        if self.presentations == 0 {
            0.0
        } else {
            (self.correct + self.hinted) as f64 * 100.0 / self.presentations as f64
        }
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS presentations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        word TEXT NOT NULL,
        mode TEXT NOT NULL,
        outcome TEXT NOT NULL,
        attempts INTEGER NOT NULL,
        hint_level INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_presentations_word ON presentations(word);
    CREATE INDEX IF NOT EXISTS idx_presentations_timestamp ON presentations(timestamp);
"#;

/// Database of every presentation ever made
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open (or create) the history database at `db_path`
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    pub fn record_presentation(&self, stat: &PresentationStat) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO presentations
            (word, mode, outcome, attempts, hint_level, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                stat.word,
                stat.mode.slug(),
                stat.outcome.to_string(),
                stat.attempts,
                stat.hint_level,
                stat.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Per word totals, ordered by word
    pub fn word_summary(&self) -> Result<Vec<WordSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                word,
                COUNT(*) as total,
                SUM(CASE WHEN outcome = 'correct' THEN 1 ELSE 0 END) as correct,
                SUM(CASE WHEN outcome = 'hinted' THEN 1 ELSE 0 END) as hinted,
                SUM(CASE WHEN outcome IN ('failed', 'unspoken') THEN 1 ELSE 0 END) as failed,
                MAX(timestamp) as last_seen
            FROM presentations
            GROUP BY word
            ORDER BY word
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let last_seen: Option<String> = row.get(5)?;
            let last_seen = match last_seen {
                Some(ts) => Some(
                    DateTime::parse_from_rfc3339(&ts)
                        .map_err(|_| {
                            rusqlite::Error::InvalidColumnType(
                                5,
                                "last_seen".to_string(),
                                rusqlite::types::Type::Text,
                            )
                        })?
                        .with_timezone(&Local),
                ),
                None => None,
            };
            Ok(WordSummary {
                word: row.get(0)?,
                presentations: row.get(1)?,
                correct: row.get(2)?,
                hinted: row.get(3)?,
                failed: row.get(4)?,
                last_seen,
            })
        })?;

        rows.collect()
    }

    pub fn presentation_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM presentations", [], |row| row.get(0))
    }
}

/// One line of the session log
#[derive(Debug, Clone, Serialize)]
pub struct SessionLogRow {
    pub started_at: String,
    pub finished_at: String,
    pub word_list: String,
    pub mode: String,
    pub presentations: u32,
    pub correct: u32,
    pub hinted: u32,
    pub failed: u32,
    pub newly_mastered: u32,
    pub mastered_total: usize,
    pub words_total: usize,
    pub best_streak: u32,
}

/// Append `row` to the CSV log at `path`, writing the header for a new file
pub fn append_session_log(path: &Path, row: &SessionLogRow) -> DrillResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}
