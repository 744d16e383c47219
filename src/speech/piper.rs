//! Piper TTS backend calling a local binary, then an external audio player

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

use super::{sidecar_path, SpeakFailure, Speaker, Voice};

static UTTERANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An audio player invocation; the wav path is appended after `args`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCommand {
    pub name: String,
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

pub fn default_players() -> Vec<PlayerCommand> {
    vec![
        PlayerCommand::new("aplay", "/usr/bin/aplay", &["-q"]),
        PlayerCommand::new("paplay", "/usr/bin/paplay", &[]),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiperConfig {
    pub executable: PathBuf,
    pub voices_dir: PathBuf,
    /// Model file stem inside `voices_dir`
    pub voice: String,
    pub players: Vec<PlayerCommand>,
}

impl Default for PiperConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./piper/piper"),
            voices_dir: PathBuf::from("./piper_voices"),
            voice: "en_US-hfc_female-medium".to_string(),
            players: default_players(),
        }
    }
}

impl PiperConfig {
    pub fn model_path(&self) -> PathBuf {
        self.voices_dir.join(format!("{}.onnx", self.voice))
    }
}

#[derive(Debug)]
pub struct PiperSpeaker {
    executable: PathBuf,
    model: PathBuf,
    players: Vec<PlayerCommand>,
    scratch_dir: PathBuf,
}

/// Removes the generated wav however speaking ends
struct ScratchWav(PathBuf);

impl Drop for ScratchWav {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = fs::remove_file(&self.0) {
                warn!("could not remove {}: {}", self.0.display(), e);
            }
        }
    }
}

impl PiperSpeaker {
    pub fn new(config: &PiperConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            model: config.model_path(),
            players: config.players.clone(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.scratch_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn model(&self) -> &Path {
        &self.model
    }

    /// Verify the executable and voice model are in place
    pub fn check(&self) -> Result<(), SpeakFailure> {
        if !self.executable.exists() {
            return Err(SpeakFailure::MissingExecutable(self.executable.clone()));
        }
        if !self.model.exists() {
            return Err(SpeakFailure::MissingModel(self.model.clone()));
        }
        let sidecar = sidecar_path(&self.model);
        if !sidecar.exists() {
            return Err(SpeakFailure::MissingModel(sidecar));
        }
        Ok(())
    }

    fn scratch_wav(&self) -> ScratchWav {
        let n = UTTERANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        ScratchWav(
            self.scratch_dir
                .join(format!("spelldrill_{}_{}.wav", std::process::id(), n)),
        )
    }

    fn synthesize(&self, text: &str, speed_scale: f32, wav: &Path) -> Result<(), SpeakFailure> {
        let mut child = Command::new(&self.executable)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_file")
            .arg(wav)
            .arg("--length_scale")
            .arg(format!("{:.2}", speed_scale))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                error!("failed to spawn piper: {}", e);
                if e.kind() == ErrorKind::NotFound {
                    SpeakFailure::MissingExecutable(self.executable.clone())
                } else {
                    SpeakFailure::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // piper may exit early on a bad model; its stderr says why
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SpeakFailure::Synthesis(format!(
                "{} ({})",
                stderr, output.status
            )));
        }

        if !wav.exists() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            debug!("piper stdout: {}", stdout.trim());
            return Err(SpeakFailure::NoOutput(wav.to_path_buf()));
        }
        Ok(())
    }

    fn play(&self, wav: &Path) -> Result<(), SpeakFailure> {
        let mut last_error = String::from("no audio player is configured");

        for player in &self.players {
            if player.program.is_absolute() && !player.program.exists() {
                debug!("skipping {}: {} missing", player.name, player.program.display());
                last_error = format!("{} not found", player.name);
                continue;
            }

            match Command::new(&player.program)
                .args(&player.args)
                .arg(wav)
                .output()
            {
                Ok(out) if out.status.success() => {
                    debug!("played with {}", player.name);
                    return Ok(());
                }
                Ok(out) => {
                    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                    let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
                    last_error = if !stderr.is_empty() {
                        format!("{} ({}): {}", player.name, out.status, stderr)
                    } else if !stdout.is_empty() {
                        format!("{} ({}): {}", player.name, out.status, stdout)
                    } else {
                        format!("{} ({}) without error output", player.name, out.status)
                    };
                    debug!("player failed: {}", last_error);
                }
                Err(e) => {
                    last_error = format!("{}: {}", player.name, e);
                    debug!("player failed to start: {}", last_error);
                }
            }
        }

        Err(SpeakFailure::Playback { detail: last_error })
    }
}

impl Speaker for PiperSpeaker {
    fn speak(&self, text: &str, speed_scale: f32) -> Result<(), SpeakFailure> {
        info!("piper speaking '{}' at {:.2}", text, speed_scale);
        self.check()?;

        let wav = self.scratch_wav();
        self.synthesize(text, speed_scale, &wav.0)?;
        self.play(&wav.0)
    }

    fn select_voice(&mut self, voice: &Voice) -> Result<(), SpeakFailure> {
        if !voice.model.exists() {
            return Err(SpeakFailure::MissingModel(voice.model.clone()));
        }
        info!("switching piper voice to {}", voice.name);
        self.model = voice.model.clone();
        Ok(())
    }

    fn name(&self) -> &str {
        "piper"
    }
}
