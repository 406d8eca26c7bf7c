//! Input backends
//!
//! Each backend produces `RawInputEvent`s from one device. The session
//! merges every source into a single ordered stream, so press/release
//! ordering across devices matches real-world arrival order.

pub mod evdev;
pub mod terminal;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use rimshot_keymap::InputEventId;

use crate::config::{InputBackend, InputSection};

/// Logical action carried by a raw input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Press,
    Release,
    /// Magnitude change while the control is held
    AnalogUpdate,
}

/// A device event after backend normalization, before translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawInputEvent {
    pub id: InputEventId,
    pub action: InputAction,
    /// Normalized input intensity, 0.0-1.0 (1.0 for plain key presses)
    pub magnitude: f32,
    /// Monotonic capture time, measured from session start
    pub timestamp: Duration,
}

/// Errors from opening or reading an input backend
#[derive(Error, Debug)]
pub enum InputError {
    #[error("no input device matches {0:?}")]
    NoDevice(String),

    #[error("stdin is not a terminal")]
    NotATty,

    #[error("invalid input configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One stream of raw input events
///
/// `next_event` returning `Ok(None)` signals end of stream (the device is
/// gone); the stream is not restartable.
#[async_trait]
pub trait InputSource: Send {
    /// Human-readable source name used in logs
    fn name(&self) -> &str;

    async fn next_event(&mut self) -> Result<Option<RawInputEvent>, InputError>;

    /// Release terminal/device state. Called once during shutdown.
    async fn close(&mut self) {}
}

/// Open every source a config section describes. An evdev device pattern
/// can match several devices; each becomes its own source.
pub fn open_sources(
    section: &InputSection,
    epoch: Instant,
) -> Result<Vec<Box<dyn InputSource>>, InputError> {
    match &section.backend {
        InputBackend::Evdev { device, axis } => {
            if axis.press <= axis.release {
                return Err(InputError::Config(format!(
                    "axis press threshold {} must be above release threshold {}",
                    axis.press, axis.release
                )));
            }
            let sources = evdev::EvdevSource::open_matching(device, *axis, epoch)?;
            Ok(sources
                .into_iter()
                .map(|source| Box::new(source) as Box<dyn InputSource>)
                .collect())
        }
        InputBackend::Terminal => Ok(vec![Box::new(terminal::TerminalSource::open(epoch)?)]),
    }
}
