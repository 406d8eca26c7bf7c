//! Wire MIDI port sink (midir)

use async_trait::async_trait;
use midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

use crate::{MidiEvent, MidiSink, SinkError};

/// Client name registered with the system MIDI backend
const CLIENT_NAME: &str = "rimshot";

/// Sends events to a system MIDI output port
pub struct PortSink {
    label: String,
    conn: MidiOutputConnection,
}

impl PortSink {
    /// Connect to the first output port whose name contains `pattern`
    /// (case-insensitive). Without a pattern the first available port wins.
    pub fn connect(pattern: Option<&str>) -> Result<Self, SinkError> {
        let output = MidiOutput::new(CLIENT_NAME).map_err(|e| SinkError::Port(e.to_string()))?;
        let needle = pattern.map(str::to_lowercase);

        let mut chosen = None;
        for port in output.ports() {
            let name = output
                .port_name(&port)
                .map_err(|e| SinkError::Port(e.to_string()))?;
            if let Some(needle) = &needle {
                if !name.to_lowercase().contains(needle.as_str()) {
                    continue;
                }
            }
            chosen = Some((port, name));
            break;
        }

        let (port, name) =
            chosen.ok_or_else(|| SinkError::PortNotFound(pattern.unwrap_or("*").to_string()))?;
        info!("connecting to MIDI port {name:?}");
        let conn = output
            .connect(&port, "midi_out")
            .map_err(|e| SinkError::Port(e.to_string()))?;

        Ok(Self {
            label: format!("midi-port:{name}"),
            conn,
        })
    }
}

#[async_trait]
impl MidiSink for PortSink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn accept(&mut self, event: &MidiEvent) -> Result<(), SinkError> {
        self.conn
            .send(&event.to_bytes())
            .map_err(|e| SinkError::Port(e.to_string()))
    }

    // The connection is torn down on drop; nothing extra to flush.
}
