//! FluidSynth subprocess sink
//!
//! Runs a `fluidsynth` process with no MIDI driver and feeds it note and
//! control commands over its command shell on stdin. Synthesizer output
//! (stderr) is forwarded to the log.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{MidiEvent, MidiKind, MidiSink, SinkError};

/// How long to wait after `quit` before killing the process
const QUIT_GRACE: Duration = Duration::from_secs(2);

/// Options for spawning the synthesizer process
#[derive(Debug, Clone)]
pub struct FluidsynthOptions {
    /// Executable to run
    pub command: String,
    /// SoundFont file to load; must exist
    pub soundfont: PathBuf,
    /// Audio driver passed via `-a` (e.g. "pulseaudio", "alsa")
    pub audio_driver: Option<String>,
    /// Additional command-line arguments
    pub extra_options: Vec<String>,
}

impl FluidsynthOptions {
    pub fn new(soundfont: impl Into<PathBuf>) -> Self {
        Self {
            command: "fluidsynth".to_string(),
            soundfont: soundfont.into(),
            audio_driver: None,
            extra_options: Vec::new(),
        }
    }
}

/// Sink that feeds a FluidSynth process
pub struct FluidsynthSink {
    label: String,
    child: Child,
    stdin: ChildStdin,
}

impl FluidsynthSink {
    /// Spawn the synthesizer. Fails early when the SoundFont is missing or
    /// the executable cannot be started.
    pub fn spawn(options: &FluidsynthOptions) -> Result<Self, SinkError> {
        if !options.soundfont.exists() {
            return Err(SinkError::SoundFontMissing(options.soundfont.clone()));
        }

        let mut command = Command::new(&options.command);
        // -n: no MIDI driver, events arrive on stdin only
        command.arg("-n");
        if let Some(driver) = &options.audio_driver {
            command.arg("-a").arg(driver);
        }
        command.args(&options.extra_options);
        command.arg(&options.soundfont);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| SinkError::Spawn {
            command: options.command.clone(),
            source,
        })?;
        let stdin = child.stdin.take().ok_or(SinkError::Disconnected)?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }
        info!(
            "started {} with SoundFont {}",
            options.command,
            options.soundfont.display()
        );

        Ok(Self {
            label: format!("fluidsynth:{}", options.soundfont.display()),
            child,
            stdin,
        })
    }
}

/// Forward synthesizer diagnostics to the log
async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("fluidsynth: {line}");
    }
}

/// Shell command FluidSynth understands for one event
fn command_line(event: &MidiEvent) -> String {
    match event.kind {
        MidiKind::NoteOn => format!("noteon {} {} {}\n", event.channel, event.data1, event.data2),
        // the shell's noteoff takes no velocity
        MidiKind::NoteOff => format!("noteoff {} {}\n", event.channel, event.data1),
        MidiKind::ControlChange => {
            format!("cc {} {} {}\n", event.channel, event.data1, event.data2)
        }
    }
}

#[async_trait]
impl MidiSink for FluidsynthSink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn accept(&mut self, event: &MidiEvent) -> Result<(), SinkError> {
        self.stdin
            .write_all(command_line(event).as_bytes())
            .await
            .map_err(|_| SinkError::Disconnected)
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        // Ask politely first; the process may already be gone.
        let _ = self.stdin.write_all(b"quit\n").await;
        let _ = self.stdin.shutdown().await;
        match timeout(QUIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                if !status.success() {
                    warn!("fluidsynth exited with {status}");
                }
                Ok(())
            }
            Ok(Err(e)) => Err(SinkError::Io(e)),
            Err(_) => {
                warn!("fluidsynth did not quit in time, killing it");
                self.child.kill().await.map_err(SinkError::Io)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn noteon_command() {
        let event = MidiEvent::note_on(9, 38, 100, Duration::ZERO);
        assert_eq!(command_line(&event), "noteon 9 38 100\n");
    }

    #[test]
    fn noteoff_command_has_no_velocity() {
        let event = MidiEvent::note_off(0, 60, 64, Duration::ZERO);
        assert_eq!(command_line(&event), "noteoff 0 60\n");
    }

    #[test]
    fn cc_command() {
        let event = MidiEvent::control_change(2, 74, 15, Duration::ZERO);
        assert_eq!(command_line(&event), "cc 2 74 15\n");
    }

    #[test]
    fn missing_soundfont_fails_early() {
        let options = FluidsynthOptions::new("/nonexistent/never.sf2");
        match FluidsynthSink::spawn(&options) {
            Err(SinkError::SoundFontMissing(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/never.sf2"));
            }
            Err(other) => panic!("expected SoundFontMissing, got {other}"),
            Ok(_) => panic!("spawn succeeded without a SoundFont"),
        }
    }
}
