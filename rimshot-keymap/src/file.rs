//! On-disk keymap schema
//!
//! Keymaps are TOML files with an optional `[defaults]` table and one
//! `[[key]]` table per mapping:
//!
//! ```toml
//! [defaults]
//! channel = 9
//! velocity = 100
//!
//! [[key]]
//! event = "BTN_SOUTH"
//! note = 38
//!
//! [[key]]
//! event = "ABS_RZ"
//! controller = 74
//! velocity = "input"
//! scale = 1.5
//! release = 0
//! ```
//!
//! `note` selects a note template (NoteOn unless `kind = "note-off"`),
//! `controller` selects control change. Array-of-tables keeps entries
//! ordered and makes duplicate events representable, so load can reject
//! them instead of merging silently.

use serde::Deserialize;

use crate::{InputEventId, KeymapEntry, ParseError, TemplateKind, VelocitySpec};

#[derive(Debug, Deserialize)]
struct KeymapFile {
    #[serde(default)]
    defaults: Defaults,
    #[serde(default, rename = "key")]
    keys: Vec<RawEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct Defaults {
    channel: Option<u8>,
    velocity: Option<RawVelocity>,
    scale: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    event: String,
    channel: Option<u8>,
    note: Option<u8>,
    controller: Option<u8>,
    kind: Option<RawKind>,
    velocity: Option<RawVelocity>,
    scale: Option<f32>,
    release: Option<u8>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawKind {
    NoteOn,
    NoteOff,
    ControlChange,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum RawVelocity {
    /// Fixed 0-127 value
    Fixed(u8),
    /// Derivation mode keyword
    Mode(VelocityMode),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum VelocityMode {
    /// Derived from input magnitude
    Input,
}

/// Parse keymap TOML into entries. Range validation happens later in
/// `Keymap::from_entries`; this stage resolves descriptors, applies the
/// defaults table and checks that each entry's shape is coherent.
pub(crate) fn parse_entries(text: &str) -> Result<Vec<KeymapEntry>, ParseError> {
    let file: KeymapFile = toml::from_str(text)?;
    file.keys
        .iter()
        .map(|raw| build_entry(raw, &file.defaults))
        .collect()
}

fn build_entry(raw: &RawEntry, defaults: &Defaults) -> Result<KeymapEntry, ParseError> {
    let id = InputEventId::parse(&raw.event)?;

    let channel = raw
        .channel
        .or(defaults.channel)
        .ok_or_else(|| ParseError::invalid(&raw.event, "no channel (entry or [defaults])"))?;

    let (kind, data1) = match (raw.kind, raw.note, raw.controller) {
        (_, Some(_), Some(_)) => {
            return Err(ParseError::invalid(
                &raw.event,
                "has both note and controller",
            ))
        }
        (_, None, None) => {
            return Err(ParseError::invalid(
                &raw.event,
                "needs either note or controller",
            ))
        }
        (None | Some(RawKind::NoteOn), Some(note), None) => (TemplateKind::NoteOn, note),
        (Some(RawKind::NoteOff), Some(note), None) => (TemplateKind::NoteOff, note),
        (None | Some(RawKind::ControlChange), None, Some(ctrl)) => {
            (TemplateKind::ControlChange, ctrl)
        }
        (Some(RawKind::ControlChange), Some(_), None) => {
            return Err(ParseError::invalid(
                &raw.event,
                "control-change takes controller, not note",
            ))
        }
        (Some(RawKind::NoteOn | RawKind::NoteOff), None, Some(_)) => {
            return Err(ParseError::invalid(
                &raw.event,
                "note templates take note, not controller",
            ))
        }
    };

    let scale = raw.scale.or(defaults.scale).unwrap_or(1.0);
    if scale <= 0.0 {
        return Err(ParseError::invalid(&raw.event, "scale must be positive"));
    }
    let velocity = match raw.velocity.or(defaults.velocity) {
        None => VelocitySpec::DEFAULT,
        Some(RawVelocity::Fixed(value)) => VelocitySpec::Fixed(value),
        Some(RawVelocity::Mode(VelocityMode::Input)) => VelocitySpec::FromInput { scale },
    };

    Ok(KeymapEntry {
        id,
        channel,
        kind,
        data1,
        velocity,
        release: raw.release,
    })
}
