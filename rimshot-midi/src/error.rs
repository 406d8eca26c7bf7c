//! Output sink error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening or feeding an output sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("no MIDI output port matches {0:?}")]
    PortNotFound(String),

    #[error("MIDI port error: {0}")]
    Port(String),

    #[error("SoundFont file {0:?} does not exist")]
    SoundFontMissing(PathBuf),

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("sink process is gone")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
