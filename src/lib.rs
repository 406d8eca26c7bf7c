//! rimshot core library
//!
//! Translates input-device events into MIDI events and fans them out to
//! output sinks. The pipeline is: input backend → translator (driven by a
//! keymap) → dispatcher → attached sinks. The binary in `main.rs` wires
//! this to the CLI.

pub mod config;
pub mod dispatcher;
pub mod input;
pub mod session;
pub mod translator;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use session::{Selection, Session, SessionState};
pub use translator::Translator;
