//! Session orchestration: startup, the main event loop, graceful shutdown
//!
//! One session owns the whole pipeline. Input pumps run as background
//! tasks feeding a single merged channel; translation and dispatch happen
//! sequentially in the loop below, so event order always matches arrival
//! order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use rimshot_keymap::Keymap;
use rimshot_midi::{BoxedSink, FluidsynthOptions, FluidsynthSink, MidiEvent, PortSink, SinkError};

use crate::config::{Config, PlayerBackend};
use crate::dispatcher::Dispatcher;
use crate::input::{self, InputError, InputSource, RawInputEvent};
use crate::translator::Translator;

/// Opening riff played once the sinks are up (0 is a rest)
const INTRO_NOTES: [u8; 5] = [0, 38, 38, 0, 49];
const INTRO_STEP: Duration = Duration::from_millis(200);
const INTRO_CHANNEL: u8 = 9;
const INTRO_VELOCITY: u8 = 127;

/// Capacity of the merged input event channel
const EVENT_QUEUE: usize = 256;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Running,
    ShuttingDown,
    Stopped,
}

/// Restricts which config sections a session uses (`--input`/`--player`)
#[derive(Debug, Default, Clone)]
pub struct Selection {
    pub input: Option<String>,
    pub player: Option<String>,
}

/// Messages from the input pump tasks
enum SourceMessage {
    Event { unit: usize, event: RawInputEvent },
    Closed { unit: usize },
    Failed { unit: usize, error: InputError },
}

/// An input feed with its own translator (and therefore its own keymap
/// scope and key state)
struct InputUnit {
    label: String,
    translator: Translator,
}

pub struct Session {
    config: Config,
    config_path: PathBuf,
    selection: Selection,
    state: SessionState,
}

impl Session {
    pub fn new(config: Config, config_path: PathBuf, selection: Selection) -> Self {
        Self {
            config,
            config_path,
            selection,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion. `Ok` means a clean operator-initiated
    /// shutdown; any `Err` is fatal and maps to a non-zero exit.
    pub async fn run(mut self) -> Result<()> {
        self.state = SessionState::Loading;
        let epoch = Instant::now();

        let mut dispatcher = self.attach_players()?;
        let (mut units, sources) = self.open_inputs(epoch)?;

        self.state = SessionState::Running;
        info!(
            "session running with {} input(s) and {} sink(s)",
            units.len(),
            dispatcher.active_sinks()
        );
        play_intro(&dispatcher, epoch).await;

        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE);
        let mut pumps = Vec::new();
        for (unit, source) in sources.into_iter().enumerate() {
            pumps.push(tokio::spawn(pump(unit, source, tx.clone())));
        }
        drop(tx);

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        let mut alive = units.len();
        let mut backend_lost = false;
        loop {
            tokio::select! {
                _ = &mut interrupt => {
                    info!("interrupt received, shutting down");
                    break;
                }
                message = rx.recv() => match message {
                    Some(SourceMessage::Event { unit, event }) => {
                        let events = units[unit].translator.translate(&event);
                        if !events.is_empty() {
                            dispatcher.dispatch(&events);
                        }
                    }
                    Some(SourceMessage::Closed { unit }) => {
                        warn!("input {} disconnected", units[unit].label);
                        alive -= 1;
                        if alive == 0 {
                            backend_lost = true;
                            break;
                        }
                    }
                    Some(SourceMessage::Failed { unit, error }) => {
                        warn!("input {} failed: {error}", units[unit].label);
                        alive -= 1;
                        if alive == 0 {
                            backend_lost = true;
                            break;
                        }
                    }
                    None => {
                        backend_lost = true;
                        break;
                    }
                }
            }
        }

        self.state = SessionState::ShuttingDown;
        // No new events past this point; a pump mid-send just sees the
        // closed channel. Pumps are cancelled in reverse-of-start order,
        // then sinks detach LIFO with their queues drained.
        rx.close();
        for pump in pumps.into_iter().rev() {
            pump.abort();
            let _ = pump.await;
        }
        dispatcher.close().await;
        self.state = SessionState::Stopped;
        info!("session stopped");

        if backend_lost {
            bail!("all input devices are gone");
        }
        Ok(())
    }

    /// Build and attach every selected player sink. Individual failures
    /// are logged; ending up with zero sinks is fatal.
    fn attach_players(&self) -> Result<Dispatcher> {
        let mut dispatcher = Dispatcher::new();
        for section in &self.config.players {
            if section.disabled
                || !selected(&self.selection.player, &section.name, section.backend.kind_name())
            {
                continue;
            }
            match self.build_sink(&section.backend) {
                Ok(sink) => dispatcher.attach(sink),
                Err(e) => warn!("cannot attach player {}: {e}", section.label()),
            }
        }
        if dispatcher.is_empty() {
            bail!("no output sink could be attached");
        }
        Ok(dispatcher)
    }

    fn build_sink(&self, backend: &PlayerBackend) -> Result<BoxedSink, SinkError> {
        match backend {
            PlayerBackend::MidiPort { port } => {
                Ok(Box::new(PortSink::connect(port.as_deref())?))
            }
            PlayerBackend::Fluidsynth {
                soundfont,
                command,
                audio_driver,
                extra_options,
            } => {
                let options = FluidsynthOptions {
                    command: command.clone(),
                    soundfont: Config::resolve(&self.config_path, soundfont),
                    audio_driver: audio_driver.clone(),
                    extra_options: extra_options.clone(),
                };
                Ok(Box::new(FluidsynthSink::spawn(&options)?))
            }
        }
    }

    /// Load keymaps and open input devices. A keymap parse failure is
    /// fatal; a device that fails to open is only a warning, but zero
    /// usable inputs is fatal.
    fn open_inputs(
        &self,
        epoch: Instant,
    ) -> Result<(Vec<InputUnit>, Vec<Box<dyn InputSource>>)> {
        let mut units = Vec::new();
        let mut sources = Vec::new();
        for section in &self.config.inputs {
            if section.disabled
                || !selected(&self.selection.input, &section.name, section.backend.kind_name())
            {
                continue;
            }
            let keymap_path = Config::resolve(&self.config_path, &section.keymap);
            let keymap = Keymap::load(&keymap_path).with_context(|| {
                format!(
                    "keymap {} for input {}",
                    keymap_path.display(),
                    section.label()
                )
            })?;
            if keymap.is_empty() {
                warn!("keymap {} maps no events", keymap_path.display());
            }
            let keymap = Arc::new(keymap);

            match input::open_sources(section, epoch) {
                Ok(opened) => {
                    for source in opened {
                        info!("listening on {}", source.name());
                        units.push(InputUnit {
                            label: source.name().to_string(),
                            translator: Translator::new(Arc::clone(&keymap)),
                        });
                        sources.push(source);
                    }
                }
                Err(e) => warn!("cannot open input {}: {e}", section.label()),
            }
        }
        if sources.is_empty() {
            bail!("no input device available");
        }
        Ok((units, sources))
    }
}

/// Does a section pass the `--input`/`--player` selector?
fn selected(filter: &Option<String>, name: &Option<String>, kind: &str) -> bool {
    match filter {
        None => true,
        Some(wanted) => name.as_deref() == Some(wanted.as_str()) || kind == wanted,
    }
}

/// The startup riff doubles as a smoke test for the attached sinks.
async fn play_intro(dispatcher: &Dispatcher, epoch: Instant) {
    for note in INTRO_NOTES {
        if note > 0 {
            let event = MidiEvent::note_on(INTRO_CHANNEL, note, INTRO_VELOCITY, epoch.elapsed());
            dispatcher.dispatch(&[event]);
        }
        tokio::time::sleep(INTRO_STEP).await;
    }
}

/// Forwards one input source into the merged session channel
async fn pump(unit: usize, mut source: Box<dyn InputSource>, tx: mpsc::Sender<SourceMessage>) {
    loop {
        match source.next_event().await {
            Ok(Some(event)) => {
                if tx.send(SourceMessage::Event { unit, event }).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                let _ = tx.send(SourceMessage::Closed { unit }).await;
                break;
            }
            Err(error) => {
                let _ = tx.send(SourceMessage::Failed { unit, error }).await;
                break;
            }
        }
    }
    source.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_name_or_kind() {
        let name = Some("pads".to_string());
        assert!(selected(&None, &name, "evdev"));
        assert!(selected(&Some("pads".into()), &name, "evdev"));
        assert!(selected(&Some("evdev".into()), &name, "evdev"));
        assert!(!selected(&Some("other".into()), &name, "evdev"));
        assert!(!selected(&Some("pads".into()), &None, "terminal"));
    }

    #[test]
    fn new_session_starts_uninitialized() {
        let session = Session::new(
            Config::default(),
            PathBuf::from("rimshot.toml"),
            Selection::default(),
        );
        assert_eq!(session.state(), SessionState::Uninitialized);
    }
}
