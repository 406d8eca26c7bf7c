//! Keymap data model for rimshot
//!
//! A keymap maps input controls (keys, buttons, axes, terminal characters)
//! to MIDI event templates. Keymaps are loaded once at startup, validated
//! in full, and immutable afterwards, so lookups never need a lock.

pub mod entry;
pub mod error;
pub mod event_id;
mod file;

pub use entry::{KeymapEntry, TemplateKind, VelocitySpec};
pub use error::ParseError;
pub use event_id::InputEventId;

use std::collections::HashMap;
use std::path::Path;

/// An immutable, ordered mapping from input controls to MIDI templates
///
/// Duplicate event ids are rejected at load; an empty keymap is valid and
/// simply never produces events.
#[derive(Debug, Default)]
pub struct Keymap {
    entries: Vec<KeymapEntry>,
    index: HashMap<InputEventId, usize>,
}

impl Keymap {
    /// Load and validate a keymap file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse and validate keymap TOML
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::from_entries(file::parse_entries(text)?)
    }

    /// Build a keymap from entries, validating field ranges and rejecting
    /// duplicate event ids. No partial keymap survives a failure.
    pub fn from_entries(entries: Vec<KeymapEntry>) -> Result<Self, ParseError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            validate_ranges(entry)?;
            if index.insert(entry.id, position).is_some() {
                return Err(ParseError::Duplicate(entry.id.to_string()));
            }
        }
        Ok(Self { entries, index })
    }

    /// Look up the entry for an event id. Pure; O(1) expected.
    pub fn lookup(&self, id: &InputEventId) -> Option<&KeymapEntry> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = &KeymapEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_ranges(entry: &KeymapEntry) -> Result<(), ParseError> {
    let check = |field: &'static str, value: u8, max: u8| -> Result<(), ParseError> {
        if value > max {
            return Err(ParseError::OutOfRange {
                event: entry.id.to_string(),
                field,
                value: value.into(),
                min: 0,
                max,
            });
        }
        Ok(())
    };

    check("channel", entry.channel, 15)?;
    match entry.kind {
        TemplateKind::NoteOn | TemplateKind::NoteOff => check("note", entry.data1, 127)?,
        TemplateKind::ControlChange => check("controller", entry.data1, 127)?,
    }
    if let VelocitySpec::Fixed(value) = entry.velocity {
        check("velocity", value, 127)?;
    }
    if let Some(value) = entry.release {
        check("release", value, 127)?;
    }
    Ok(())
}
