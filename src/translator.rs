//! The translation engine: raw input events in, MIDI events out
//!
//! One translator serves one input device, holding the per-control
//! press/release state. All state mutation happens from the session's
//! event loop, so no locking is needed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use rimshot_keymap::{InputEventId, Keymap, KeymapEntry, TemplateKind};
use rimshot_midi::{MidiEvent, MidiKind};

use crate::input::{InputAction, RawInputEvent};

/// Press/release state for one input control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum KeyState {
    #[default]
    Released,
    Pressed,
}

/// Stateful, single-threaded converter from raw input events to MIDI events
pub struct Translator {
    keymap: Arc<Keymap>,
    states: HashMap<InputEventId, KeyState>,
}

impl Translator {
    pub fn new(keymap: Arc<Keymap>) -> Self {
        Self {
            keymap,
            states: HashMap::new(),
        }
    }

    /// Translate one raw event into zero or more MIDI events.
    ///
    /// Unmapped inputs and guard-suppressed transitions yield an empty
    /// vec; neither is an error. A press is honored only from Released,
    /// a release only from Pressed; duplicate hardware transitions are
    /// debounced here, once, for every backend.
    pub fn translate(&mut self, event: &RawInputEvent) -> Vec<MidiEvent> {
        let Some(entry) = self.keymap.lookup(&event.id) else {
            trace!("unmapped input {}", event.id);
            return Vec::new();
        };
        let state = self.states.entry(event.id).or_default();

        match (event.action, *state) {
            (InputAction::Press, KeyState::Released) => {
                *state = KeyState::Pressed;
                vec![press_event(entry, event)]
            }
            (InputAction::Release, KeyState::Pressed) => {
                *state = KeyState::Released;
                release_event(entry, event).into_iter().collect()
            }
            (InputAction::AnalogUpdate, KeyState::Pressed) if entry.velocity.is_derived() => {
                // magnitude change while held: re-emit with the new value,
                // state untouched
                vec![press_event(entry, event)]
            }
            _ => Vec::new(),
        }
    }
}

/// Build the entry's press template with the resolved data2 byte
fn press_event(entry: &KeymapEntry, event: &RawInputEvent) -> MidiEvent {
    let kind = match entry.kind {
        TemplateKind::NoteOn => MidiKind::NoteOn,
        TemplateKind::NoteOff => MidiKind::NoteOff,
        TemplateKind::ControlChange => MidiKind::ControlChange,
    };
    MidiEvent {
        channel: entry.channel,
        kind,
        data1: entry.data1,
        data2: entry.velocity.resolve(event.magnitude),
        timestamp: event.timestamp,
    }
}

/// The complementary event a release produces, when the entry asks for one
fn release_event(entry: &KeymapEntry, event: &RawInputEvent) -> Option<MidiEvent> {
    let value = entry.release?;
    let kind = match entry.kind {
        TemplateKind::NoteOn => MidiKind::NoteOff,
        TemplateKind::ControlChange => MidiKind::ControlChange,
        // a note-off template is a press-only trigger
        TemplateKind::NoteOff => return None,
    };
    Some(MidiEvent {
        channel: entry.channel,
        kind,
        data1: entry.data1,
        data2: value,
        timestamp: event.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PAD: InputEventId = InputEventId::Key(0x130); // BTN_SOUTH
    const WHEEL: InputEventId = InputEventId::Axis(5); // ABS_RZ

    fn keymap() -> Arc<Keymap> {
        let text = r#"
            [defaults]
            channel = 9

            [[key]]
            event = "BTN_SOUTH"
            note = 38
            velocity = 100

            [[key]]
            event = "KEY_Z"
            note = 40
            velocity = 90
            release = 64

            [[key]]
            event = "ABS_RZ"
            channel = 0
            controller = 74
            velocity = "input"
            release = 0
        "#;
        Arc::new(Keymap::parse(text).unwrap())
    }

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn press(id: InputEventId, magnitude: f32, ms: u64) -> RawInputEvent {
        RawInputEvent {
            id,
            action: InputAction::Press,
            magnitude,
            timestamp: at(ms),
        }
    }

    fn release(id: InputEventId, ms: u64) -> RawInputEvent {
        RawInputEvent {
            id,
            action: InputAction::Release,
            magnitude: 0.0,
            timestamp: at(ms),
        }
    }

    fn analog(id: InputEventId, magnitude: f32, ms: u64) -> RawInputEvent {
        RawInputEvent {
            id,
            action: InputAction::AnalogUpdate,
            magnitude,
            timestamp: at(ms),
        }
    }

    #[test]
    fn unmapped_input_is_silently_ignored() {
        let mut translator = Translator::new(keymap());
        assert!(translator.translate(&press(InputEventId::Key(999), 1.0, 0)).is_empty());
        assert!(translator.translate(&release(InputEventId::Char('q'), 1)).is_empty());
    }

    #[test]
    fn percussion_pad_press_and_silent_release() {
        // Pad entry has no release mapping: NoteOn fires, release is
        // silent, and the pad is immediately re-armed.
        let mut translator = Translator::new(keymap());

        let events = translator.translate(&press(PAD, 1.0, 0));
        assert_eq!(
            events,
            vec![MidiEvent::note_on(9, 38, 100, at(0))]
        );

        assert!(translator.translate(&release(PAD, 5)).is_empty());

        let events = translator.translate(&press(PAD, 1.0, 10));
        assert_eq!(events, vec![MidiEvent::note_on(9, 38, 100, at(10))]);
    }

    #[test]
    fn duplicate_press_is_debounced() {
        let mut translator = Translator::new(keymap());
        assert_eq!(translator.translate(&press(PAD, 1.0, 0)).len(), 1);
        assert!(translator.translate(&press(PAD, 1.0, 1)).is_empty());
    }

    #[test]
    fn duplicate_release_is_debounced() {
        let mut translator = Translator::new(keymap());
        assert!(translator.translate(&release(PAD, 0)).is_empty());
        translator.translate(&press(PAD, 1.0, 1));
        translator.translate(&release(PAD, 2));
        assert!(translator.translate(&release(PAD, 3)).is_empty());
    }

    #[test]
    fn press_release_press_emits_two_events() {
        let mut translator = Translator::new(keymap());
        let mut emitted = Vec::new();
        emitted.extend(translator.translate(&press(PAD, 1.0, 0)));
        emitted.extend(translator.translate(&release(PAD, 1)));
        emitted.extend(translator.translate(&press(PAD, 1.0, 2)));
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|e| e.kind == MidiKind::NoteOn));
    }

    #[test]
    fn mapped_release_emits_note_off() {
        let key = InputEventId::Key(44); // KEY_Z
        let mut translator = Translator::new(keymap());
        translator.translate(&press(key, 1.0, 0));
        let events = translator.translate(&release(key, 1));
        assert_eq!(events, vec![MidiEvent::note_off(9, 40, 64, at(1))]);
    }

    #[test]
    fn analog_axis_drives_control_change() {
        let mut translator = Translator::new(keymap());

        let events = translator.translate(&press(WHEEL, 0.5, 0));
        assert_eq!(events, vec![MidiEvent::control_change(0, 74, 64, at(0))]);

        // magnitude updates while held re-emit without changing state
        let events = translator.translate(&analog(WHEEL, 1.0, 1));
        assert_eq!(events, vec![MidiEvent::control_change(0, 74, 127, at(1))]);

        // release resets the controller via the mapped release value
        let events = translator.translate(&release(WHEEL, 2));
        assert_eq!(events, vec![MidiEvent::control_change(0, 74, 0, at(2))]);
    }

    #[test]
    fn analog_update_without_press_is_dropped() {
        let mut translator = Translator::new(keymap());
        assert!(translator.translate(&analog(WHEEL, 0.9, 0)).is_empty());
    }

    #[test]
    fn analog_update_on_fixed_velocity_entry_is_dropped() {
        let mut translator = Translator::new(keymap());
        translator.translate(&press(PAD, 1.0, 0));
        assert!(translator.translate(&analog(PAD, 0.5, 1)).is_empty());
    }

    #[test]
    fn capture_timestamps_pass_through() {
        let mut translator = Translator::new(keymap());
        let events = translator.translate(&press(PAD, 1.0, 1234));
        assert_eq!(events[0].timestamp, at(1234));
    }
}
