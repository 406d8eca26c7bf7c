//! Terminal input backend
//!
//! Treats raw-mode stdin as an input device for setups without a usable
//! event device. Terminals report no key-up, so every character press is
//! followed by a synthesized release; the translator's state guard then
//! sees a complete tap and repeated taps replay.

use std::io::stdin;
use std::time::Instant;

use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::tty::IsTty;
use futures::StreamExt;

use rimshot_keymap::InputEventId;

use super::{InputAction, InputError, InputSource, RawInputEvent};

pub struct TerminalSource {
    stream: EventStream,
    epoch: Instant,
    /// Synthesized release waiting to be delivered
    pending: Option<RawInputEvent>,
    raw_mode: bool,
}

impl TerminalSource {
    pub fn open(epoch: Instant) -> Result<Self, InputError> {
        if !stdin().is_tty() {
            return Err(InputError::NotATty);
        }
        enable_raw_mode()?;
        Ok(Self {
            stream: EventStream::new(),
            epoch,
            pending: None,
            raw_mode: true,
        })
    }

    fn restore(&mut self) {
        if self.raw_mode {
            let _ = disable_raw_mode();
            self.raw_mode = false;
        }
    }
}

#[async_trait]
impl InputSource for TerminalSource {
    fn name(&self) -> &str {
        "terminal"
    }

    async fn next_event(&mut self) -> Result<Option<RawInputEvent>, InputError> {
        if let Some(event) = self.pending.take() {
            return Ok(Some(event));
        }
        loop {
            let Some(result) = self.stream.next().await else {
                return Ok(None);
            };
            let Event::Key(key) = result? else {
                continue;
            };
            // Only real presses; kitty-style terminals also report
            // Release/Repeat, which would double up with our synthesis.
            if key.kind != KeyEventKind::Press {
                continue;
            }
            // Raw mode swallows SIGINT; Ctrl+C ends this stream instead.
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                return Ok(None);
            }
            let KeyCode::Char(c) = key.code else {
                continue;
            };
            let timestamp = self.epoch.elapsed();
            let id = InputEventId::Char(c);
            self.pending = Some(RawInputEvent {
                id,
                action: InputAction::Release,
                magnitude: 0.0,
                timestamp,
            });
            return Ok(Some(RawInputEvent {
                id,
                action: InputAction::Press,
                magnitude: 1.0,
                timestamp,
            }));
        }
    }

    async fn close(&mut self) {
        self.restore();
    }
}

impl Drop for TerminalSource {
    // Safety net for cancelled pump tasks: never leave the terminal raw.
    fn drop(&mut self) {
        self.restore();
    }
}
