//! Keymap load error types

use thiserror::Error;

/// Errors raised while loading or validating a keymap
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read keymap file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid keymap syntax: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("unknown input event descriptor {0:?}")]
    UnknownEvent(String),

    #[error("duplicate mapping for {0}")]
    Duplicate(String),

    #[error("{event}: {field} {value} out of range {min}-{max}")]
    OutOfRange {
        event: String,
        field: &'static str,
        value: u32,
        min: u8,
        max: u8,
    },

    #[error("{event}: {reason}")]
    Invalid { event: String, reason: String },
}

impl ParseError {
    pub(crate) fn invalid(event: impl ToString, reason: impl Into<String>) -> Self {
        ParseError::Invalid {
            event: event.to_string(),
            reason: reason.into(),
        }
    }
}
