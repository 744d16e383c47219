// Exit paths of the binary that do not need a terminal.
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

/// The binary with HOME and XDG dirs pointed into a scratch directory
fn spelldrill(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("spelldrill").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG");
    cmd
}

fn home() -> TempDir {
    tempdir().unwrap()
}

#[test]
fn missing_word_file_exits_with_error() {
    let home = home();
    let output = spelldrill(home.path())
        .arg(home.path().join("nope.txt"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("word list not found"), "stderr: {stderr}");
}

#[test]
fn empty_word_list_has_nothing_to_study() {
    let home = home();
    let list = home.path().join("blank.txt");
    fs::write(&list, "\n   \n\t\n").unwrap();

    let output = spelldrill(home.path()).arg(&list).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "The word list is empty. Nothing to study."
    );
}

#[test]
fn list_voices_prints_models_with_sidecars() {
    let home = home();
    let voices = home.path().join("voices");
    fs::create_dir_all(&voices).unwrap();
    for name in [
        "en_US-lessac-medium.onnx",
        "en_US-lessac-medium.onnx.json",
        "en_GB-alan-low.onnx",
        "en_GB-alan-low.onnx.json",
        "broken.onnx",
    ] {
        fs::write(voices.join(name), b"").unwrap();
    }

    let output = spelldrill(home.path())
        .arg("--list-voices")
        .arg("--voices-dir")
        .arg(&voices)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout
        .lines()
        .map(|l| l.split('\t').next().unwrap_or(""))
        .collect();
    assert_eq!(names, vec!["en_GB-alan-low", "en_US-lessac-medium"]);
}

#[test]
fn list_voices_reports_an_empty_directory() {
    let home = home();
    let output = spelldrill(home.path())
        .args(["--list-voices", "--voices-dir"])
        .arg(home.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No voices found"));
}

#[test]
fn missing_piper_fails_preflight_with_guidance() {
    let home = home();
    let list = home.path().join("animals.txt");
    fs::write(&list, "cat\ndog\n").unwrap();

    let output = spelldrill(home.path())
        .arg(&list)
        .arg("--piper")
        .arg(home.path().join("no-piper"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("piper executable not found"), "stderr: {stderr}");
    assert!(stderr.contains("github.com/rhasspy/piper/releases"));
}

#[test]
fn word_file_is_required() {
    let home = home();
    let output = spelldrill(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}
