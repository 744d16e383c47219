use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::drill::DrillPolicy;
use crate::level::{default_tiers, LevelTracker, Tier};
use crate::session::DrillMode;
use crate::speech::{PiperConfig, SpeedPreset};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mastery_threshold: u32,
    pub regular_attempts: u32,
    pub hint_attempts: u32,
    pub max_hint_level: u8,
    pub mode: DrillMode,
    pub speed: SpeedPreset,
    pub speak_feedback: bool,
    pub tiers: Vec<Tier>,
    pub piper: PiperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mastery_threshold: 2,
            regular_attempts: 3,
            hint_attempts: 3,
            max_hint_level: 3,
            mode: DrillMode::Dictation,
            speed: SpeedPreset::Normal,
            speak_feedback: true,
            tiers: default_tiers(),
            piper: PiperConfig::default(),
        }
    }
}

impl Config {
    pub fn policy(&self) -> DrillPolicy {
        DrillPolicy::new(
            self.mastery_threshold,
            self.regular_attempts,
            self.hint_attempts,
            self.max_hint_level,
        )
    }

    /// The configured level table, or the default one plus a warning when it is unusable
    pub fn level_tracker(&self) -> (LevelTracker, Option<String>) {
        match LevelTracker::new(self.tiers.clone()) {
            Ok(tracker) => (tracker, None),
            Err(e) => {
                warn!("{}; using the default levels", e);
                (
                    LevelTracker::default(),
                    Some(format!("{}; using the default levels", e)),
                )
            }
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("spelldrill_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("ignoring unreadable config {}: {}", self.path.display(), e);
                    Config::default()
                }
            },
            Err(_) => {
                debug!("no config at {}, using defaults", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            mastery_threshold: 3,
            regular_attempts: 2,
            hint_attempts: 1,
            max_hint_level: 2,
            mode: DrillMode::Spelling,
            speed: SpeedPreset::Slow,
            speak_feedback: false,
            tiers: vec![Tier::new(0, "zero"), Tier::new(5, "five")],
            piper: PiperConfig {
                voice: "en_GB-alan-low".into(),
                ..PiperConfig::default()
            },
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "mastery_threshold": 4, "speed": "very-slow" }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.mastery_threshold, 4);
        assert_eq!(cfg.speed, SpeedPreset::VerySlow);
        assert_eq!(cfg.regular_attempts, 3);
        assert_eq!(cfg.piper, PiperConfig::default());
    }

    #[test]
    fn garbage_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn policy_reflects_config() {
        let cfg = Config {
            mastery_threshold: 5,
            regular_attempts: 2,
            ..Config::default()
        };
        let policy = cfg.policy();
        assert_eq!(policy.mastery_threshold, 5);
        assert_eq!(policy.regular_attempts, 2);
        assert_eq!(policy.hint_attempts, 3);
    }

    #[test]
    fn bad_tiers_fall_back_with_warning() {
        let cfg = Config {
            tiers: vec![Tier::new(3, "late start")],
            ..Config::default()
        };
        let (tracker, warning) = cfg.level_tracker();
        assert_eq!(tracker, LevelTracker::default());
        assert!(warning.unwrap().contains("default levels"));

        let (_, none) = Config::default().level_tracker();
        assert!(none.is_none());
    }
}
