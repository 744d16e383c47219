// Minimal integration test that drives the compiled binary through a PTY.
// This exercises the real event loop, the speech worker and crossterm input
// handling, with a shell script standing in for piper and for the player.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_answers_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();

    let piper = root.join("piper");
    fs::write(
        &piper,
        "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--output_file\" ]; then out=\"$2\"; fi\n  shift\ndone\ncat > /dev/null\nprintf 'RIFF' > \"$out\"\n",
    )?;
    fs::set_permissions(&piper, fs::Permissions::from_mode(0o755))?;

    let voices = root.join("voices");
    fs::create_dir_all(&voices)?;
    fs::write(voices.join("fake.onnx"), b"")?;
    fs::write(voices.join("fake.onnx.json"), b"{}")?;

    let config = root.join("config.json");
    fs::write(
        &config,
        r#"{ "piper": { "voice": "fake", "players": [ { "name": "true", "program": "/bin/true" } ] } }"#,
    )?;

    let words = root.join("one.txt");
    fs::write(&words, "hi\n")?;

    let bin = assert_cmd::cargo::cargo_bin("spelldrill");
    let cmd = format!(
        "env HOME={} {} --config {} --piper {} --voices-dir {} {}",
        root.display(),
        bin.display(),
        config.display(),
        piper.display(),
        voices.display(),
        words.display()
    );

    let mut p = spawn(cmd)?;

    // Give the app time to draw and speak the first word
    std::thread::sleep(Duration::from_millis(500));

    p.send("hi\r")?;
    std::thread::sleep(Duration::from_millis(300));

    p.send("\x1b")?; // ESC
    p.expect("- hi: Attempted (correct: 1, incorrect: 0)")?;
    p.expect(Eof)?;
    Ok(())
}
