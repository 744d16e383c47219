//! Speech output.
//!
//! The drill only needs "say this text at this speed". Synthesis and playback
//! live behind the [`Speaker`] trait so the engine and UI never touch
//! processes or audio devices directly.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod piper;

pub use piper::{PiperConfig, PiperSpeaker, PlayerCommand};

#[derive(Error, Debug)]
pub enum SpeakFailure {
    #[error("piper executable not found at '{}'", .0.display())]
    MissingExecutable(PathBuf),

    #[error("voice model not found at '{}'", .0.display())]
    MissingModel(PathBuf),

    #[error("piper failed: {0}")]
    Synthesis(String),

    #[error("piper reported success but '{}' was not written", .0.display())]
    NoOutput(PathBuf),

    #[error("no audio player could play the sound: {detail}")]
    Playback { detail: String },

    #[error("speech i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpeakFailure {
    /// Setup advice to show alongside the error
    pub fn troubleshooting(&self) -> Vec<&'static str> {
        match self {
            SpeakFailure::MissingExecutable(_) => {
                vec!["Download piper from https://github.com/rhasspy/piper/releases"]
            }
            SpeakFailure::MissingModel(_) => vec![
                "Download an English voice (e.g. en_US-lessac-medium.onnx and its .onnx.json)",
                "Keep the .onnx.json next to the .onnx with the same base name",
            ],
            SpeakFailure::Playback { detail } => {
                let mut tips = vec![
                    "Install alsa-utils (aplay) or pulseaudio-utils (paplay)",
                ];
                if detail.contains("ALSA") || detail.contains("unable to open slave") {
                    tips.push("Add your user to the 'audio' group: sudo usermod -aG audio $USER, then log in again");
                    tips.push("Check that no other application holds the audio device exclusively");
                    tips.push("If you use PulseAudio or PipeWire, make sure it is running");
                }
                tips
            }
            _ => Vec::new(),
        }
    }
}

/// Something that can read text out loud
pub trait Speaker: Send {
    /// Speak `text`; `speed_scale` 1.0 is the voice's normal pace, smaller is faster
    fn speak(&self, text: &str, speed_scale: f32) -> Result<(), SpeakFailure>;

    /// Switch to another voice model
    fn select_voice(&mut self, _voice: &Voice) -> Result<(), SpeakFailure> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Speech rate choices offered to the user
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedPreset {
    #[strum(to_string = "Very slow")]
    VerySlow,
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 4] = [
        SpeedPreset::VerySlow,
        SpeedPreset::Slow,
        SpeedPreset::Normal,
        SpeedPreset::Fast,
    ];

    pub fn length_scale(&self) -> f32 {
        match self {
            SpeedPreset::VerySlow => 1.6,
            SpeedPreset::Slow => 1.3,
            SpeedPreset::Normal => 1.0,
            SpeedPreset::Fast => 0.7,
        }
    }

    /// Next preset, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// An installed piper voice model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub model: PathBuf,
}

impl Voice {
    pub fn from_model(model: &Path) -> Option<Self> {
        let name = model.file_stem()?.to_string_lossy().to_string();
        Some(Self {
            name,
            model: model.to_path_buf(),
        })
    }
}

/// `.onnx` models in `dir` that have their `.onnx.json` sidecar, sorted by name
pub fn list_voices(dir: &Path) -> Vec<Voice> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut voices: Vec<Voice> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "onnx"))
        .filter(|path| sidecar_path(path).exists())
        .filter_map(|path| Voice::from_model(&path))
        .collect();
    voices.sort_by(|a, b| a.name.cmp(&b.name));
    voices
}

/// `voice.onnx` -> `voice.onnx.json`
pub fn sidecar_path(model: &Path) -> PathBuf {
    let mut name = model.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}
