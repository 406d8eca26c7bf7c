//! MIDI event model and output sinks for rimshot
//!
//! This crate provides the translated event type (`MidiEvent`) and a unified
//! interface for delivering events to output backends:
//!
//! - a wire MIDI port (ALSA/JACK via midir)
//! - a FluidSynth process fed over its command shell

pub mod error;
pub mod fluidsynth;
pub mod port;

pub use error::SinkError;
pub use fluidsynth::{FluidsynthOptions, FluidsynthSink};
pub use port::PortSink;

use async_trait::async_trait;
use std::time::Duration;

/// Kind of MIDI channel message rimshot can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiKind {
    NoteOn,
    NoteOff,
    ControlChange,
}

impl MidiKind {
    /// Status byte for this message kind on channel 0
    pub fn status(self) -> u8 {
        match self {
            MidiKind::NoteOff => 0x80,
            MidiKind::NoteOn => 0x90,
            MidiKind::ControlChange => 0xB0,
        }
    }
}

/// One translated MIDI event, immutable once produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// MIDI channel, 0-15
    pub channel: u8,
    pub kind: MidiKind,
    /// Note number for note messages, controller number for control change
    pub data1: u8,
    /// Velocity for note messages, controller value for control change
    pub data2: u8,
    /// Monotonic capture time, measured from session start
    pub timestamp: Duration,
}

impl MidiEvent {
    pub fn note_on(channel: u8, note: u8, velocity: u8, timestamp: Duration) -> Self {
        Self {
            channel,
            kind: MidiKind::NoteOn,
            data1: note,
            data2: velocity,
            timestamp,
        }
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8, timestamp: Duration) -> Self {
        Self {
            channel,
            kind: MidiKind::NoteOff,
            data1: note,
            data2: velocity,
            timestamp,
        }
    }

    pub fn control_change(channel: u8, controller: u8, value: u8, timestamp: Duration) -> Self {
        Self {
            channel,
            kind: MidiKind::ControlChange,
            data1: controller,
            data2: value,
            timestamp,
        }
    }

    /// Encode as a 3-byte wire message
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            self.kind.status() | (self.channel & 0x0F),
            self.data1 & 0x7F,
            self.data2 & 0x7F,
        ]
    }
}

/// An output consumer of MIDI events
///
/// Implementations must not assume exclusive ownership of the session: the
/// dispatcher attaches and detaches sinks while events keep flowing to the
/// other attached sinks.
#[async_trait]
pub trait MidiSink: Send {
    /// Human-readable sink name used in logs
    fn name(&self) -> &str;

    /// Deliver one event. Errors are reported by the caller and never abort
    /// delivery to other sinks.
    async fn accept(&mut self, event: &MidiEvent) -> Result<(), SinkError>;

    /// Release backend resources. Called once, after the last `accept`.
    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Type alias for a boxed sink
pub type BoxedSink = Box<dyn MidiSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_wire_format() {
        let event = MidiEvent::note_on(9, 38, 100, Duration::ZERO);
        assert_eq!(event.to_bytes(), [0x99, 38, 100]);
    }

    #[test]
    fn note_off_wire_format() {
        let event = MidiEvent::note_off(0, 60, 64, Duration::ZERO);
        assert_eq!(event.to_bytes(), [0x80, 60, 64]);
    }

    #[test]
    fn control_change_wire_format() {
        let event = MidiEvent::control_change(15, 74, 127, Duration::ZERO);
        assert_eq!(event.to_bytes(), [0xBF, 74, 127]);
    }

    #[test]
    fn wire_format_masks_out_of_range_bits() {
        // Data bytes must never have the high bit set on the wire
        let event = MidiEvent {
            channel: 0x12,
            kind: MidiKind::NoteOn,
            data1: 0x85,
            data2: 0xFF,
            timestamp: Duration::ZERO,
        };
        let bytes = event.to_bytes();
        assert_eq!(bytes[0], 0x92);
        assert_eq!(bytes[1], 0x05);
        assert_eq!(bytes[2], 0x7F);
    }
}
