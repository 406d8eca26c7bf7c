//! Integration tests for the keymap → translator → dispatcher pipeline.
//!
//! These test the full public API: loading a keymap file, translating raw
//! input events, and fanning the results out to sinks, exercising the
//! boundary between `rimshot-keymap`, the translator and the dispatcher.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rimshot::dispatcher::Dispatcher;
use rimshot::input::{InputAction, RawInputEvent};
use rimshot::translator::Translator;
use rimshot_keymap::{InputEventId, Keymap, ParseError};
use rimshot_midi::{MidiEvent, MidiKind, MidiSink, SinkError};

const DRUMPAD: &str = r#"
    [defaults]
    channel = 9
    velocity = 100

    [[key]]
    event = "BTN_SOUTH"
    note = 38

    [[key]]
    event = "BTN_EAST"
    note = 49

    [[key]]
    event = "ABS_RZ"
    channel = 0
    controller = 74
    velocity = "input"
    release = 0
"#;

#[derive(Clone, Default)]
struct Tape(Arc<Mutex<Vec<MidiEvent>>>);

impl Tape {
    fn events(&self) -> Vec<MidiEvent> {
        self.0.lock().unwrap().clone()
    }
}

struct RecordingSink {
    label: String,
    tape: Tape,
}

#[async_trait]
impl MidiSink for RecordingSink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn accept(&mut self, event: &MidiEvent) -> Result<(), SinkError> {
        self.tape.0.lock().unwrap().push(*event);
        Ok(())
    }
}

/// Rejects its n-th event (1-based), delivers everything else
struct FlakySink {
    label: String,
    fail_on: usize,
    seen: usize,
    tape: Tape,
}

#[async_trait]
impl MidiSink for FlakySink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn accept(&mut self, event: &MidiEvent) -> Result<(), SinkError> {
        self.seen += 1;
        if self.seen == self.fail_on {
            return Err(SinkError::Disconnected);
        }
        self.tape.0.lock().unwrap().push(*event);
        Ok(())
    }
}

fn press(id: InputEventId, magnitude: f32, ms: u64) -> RawInputEvent {
    RawInputEvent {
        id,
        action: InputAction::Press,
        magnitude,
        timestamp: Duration::from_millis(ms),
    }
}

fn release(id: InputEventId, ms: u64) -> RawInputEvent {
    RawInputEvent {
        id,
        action: InputAction::Release,
        magnitude: 0.0,
        timestamp: Duration::from_millis(ms),
    }
}

// ── Keymap file loading ──

#[test]
fn keymap_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DRUMPAD.as_bytes()).unwrap();

    let keymap = Keymap::load(file.path()).unwrap();
    assert_eq!(keymap.len(), 3);
    assert!(keymap.lookup(&InputEventId::Key(0x130)).is_some());
}

#[test]
fn keymap_load_rejects_duplicates_with_no_partial_result() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let text = format!(
        "{DRUMPAD}\n[[key]]\nevent = \"BTN_SOUTH\"\nnote = 40\n"
    );
    file.write_all(text.as_bytes()).unwrap();

    match Keymap::load(file.path()) {
        Err(ParseError::Duplicate(name)) => assert_eq!(name, "BTN_SOUTH"),
        Err(other) => panic!("expected Duplicate, got {other}"),
        Ok(_) => panic!("duplicate keymap loaded"),
    }
}

// ── Full pipeline: translate → dispatch ──

#[tokio::test]
async fn percussion_pad_tap_reaches_every_sink_once() {
    let keymap = Arc::new(Keymap::parse(DRUMPAD).unwrap());
    let mut translator = Translator::new(Arc::clone(&keymap));
    let pad = InputEventId::Key(0x130);

    let (a, b) = (Tape::default(), Tape::default());
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(Box::new(RecordingSink {
        label: "a".into(),
        tape: a.clone(),
    }));
    dispatcher.attach(Box::new(RecordingSink {
        label: "b".into(),
        tape: b.clone(),
    }));

    // press emits the template, release is silent (no release mapping)
    dispatcher.dispatch(&translator.translate(&press(pad, 1.0, 0)));
    dispatcher.dispatch(&translator.translate(&release(pad, 5)));
    dispatcher.close().await;

    let expected = vec![MidiEvent::note_on(9, 38, 100, Duration::ZERO)];
    assert_eq!(a.events(), expected);
    assert_eq!(b.events(), expected);
}

#[tokio::test]
async fn sinks_see_a_multi_key_run_in_arrival_order() {
    let keymap = Arc::new(Keymap::parse(DRUMPAD).unwrap());
    let mut translator = Translator::new(Arc::clone(&keymap));
    let snare = InputEventId::Key(0x130);
    let crash = InputEventId::Key(0x131);

    let (a, b) = (Tape::default(), Tape::default());
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(Box::new(RecordingSink {
        label: "a".into(),
        tape: a.clone(),
    }));
    dispatcher.attach(Box::new(RecordingSink {
        label: "b".into(),
        tape: b.clone(),
    }));

    let inputs = [
        press(snare, 1.0, 0),
        release(snare, 10),
        press(crash, 1.0, 20),
        press(snare, 1.0, 30),
        release(crash, 40),
        release(snare, 50),
    ];
    for input in &inputs {
        dispatcher.dispatch(&translator.translate(input));
    }
    dispatcher.close().await;

    let expected = vec![
        MidiEvent::note_on(9, 38, 100, Duration::from_millis(0)),
        MidiEvent::note_on(9, 49, 100, Duration::from_millis(20)),
        MidiEvent::note_on(9, 38, 100, Duration::from_millis(30)),
    ];
    assert_eq!(a.events(), expected);
    assert_eq!(b.events(), expected);
}

#[tokio::test]
async fn a_failing_sink_never_silences_the_others() {
    let keymap = Arc::new(Keymap::parse(DRUMPAD).unwrap());
    let mut translator = Translator::new(Arc::clone(&keymap));
    let pad = InputEventId::Key(0x130);

    let (healthy, flaky) = (Tape::default(), Tape::default());
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(Box::new(FlakySink {
        label: "flaky".into(),
        fail_on: 2,
        seen: 0,
        tape: flaky.clone(),
    }));
    dispatcher.attach(Box::new(RecordingSink {
        label: "healthy".into(),
        tape: healthy.clone(),
    }));

    for beat in 0..4u64 {
        dispatcher.dispatch(&translator.translate(&press(pad, 1.0, beat * 10)));
        dispatcher.dispatch(&translator.translate(&release(pad, beat * 10 + 5)));
    }
    dispatcher.close().await;

    // the healthy sink got all four hits, including the one the flaky
    // sink rejected; the flaky sink lost exactly that one
    assert_eq!(healthy.events().len(), 4);
    assert_eq!(flaky.events().len(), 3);
    assert_eq!(healthy.events()[1].timestamp, Duration::from_millis(10));
}

#[tokio::test]
async fn analog_trigger_sweeps_a_controller() {
    let keymap = Arc::new(Keymap::parse(DRUMPAD).unwrap());
    let mut translator = Translator::new(Arc::clone(&keymap));
    let wheel = InputEventId::Axis(5);

    let tape = Tape::default();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(Box::new(RecordingSink {
        label: "synth".into(),
        tape: tape.clone(),
    }));

    let sweep = [
        press(wheel, 0.5, 0),
        RawInputEvent {
            id: wheel,
            action: InputAction::AnalogUpdate,
            magnitude: 0.75,
            timestamp: Duration::from_millis(1),
        },
        RawInputEvent {
            id: wheel,
            action: InputAction::AnalogUpdate,
            magnitude: 1.0,
            timestamp: Duration::from_millis(2),
        },
        release(wheel, 3),
    ];
    for input in &sweep {
        dispatcher.dispatch(&translator.translate(input));
    }
    dispatcher.close().await;

    let values: Vec<u8> = tape.events().iter().map(|e| e.data2).collect();
    assert_eq!(values, vec![64, 95, 127, 0]);
    assert!(tape.events().iter().all(|e| e.kind == MidiKind::ControlChange));
}
