//! Runtime configuration
//!
//! `rimshot.toml` describes the inputs to listen to and the players
//! (output sinks) to feed:
//!
//! ```toml
//! [[input]]
//! type = "evdev"
//! device = "gamepad"
//! keymap = "drumpad.toml"
//!
//! [[player]]
//! type = "fluidsynth"
//! soundfont = "/usr/share/sounds/sf2/FluidR3_GM.sf2"
//! ```
//!
//! Keymap and SoundFont paths are resolved relative to the config file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "input")]
    pub inputs: Vec<InputSection>,
    #[serde(default, rename = "player")]
    pub players: Vec<PlayerSection>,
}

/// One configured input device feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSection {
    /// Label used by `--input` to select this section
    #[serde(default)]
    pub name: Option<String>,
    /// Keymap file, resolved relative to the config file
    pub keymap: PathBuf,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten)]
    pub backend: InputBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InputBackend {
    Evdev {
        /// Device-name fragment; empty matches every device
        #[serde(default)]
        device: String,
        #[serde(default)]
        axis: AxisThresholds,
    },
    Terminal,
}

impl InputBackend {
    pub fn kind_name(&self) -> &'static str {
        match self {
            InputBackend::Evdev { .. } => "evdev",
            InputBackend::Terminal => "terminal",
        }
    }
}

impl InputSection {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.backend.kind_name())
    }
}

/// Hysteresis thresholds converting axis magnitude into press/release
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisThresholds {
    /// Crossing above this magnitude counts as a press
    #[serde(default = "default_axis_press")]
    pub press: f32,
    /// Falling below this magnitude counts as a release
    #[serde(default = "default_axis_release")]
    pub release: f32,
}

fn default_axis_press() -> f32 {
    0.5
}
fn default_axis_release() -> f32 {
    0.25
}

impl Default for AxisThresholds {
    fn default() -> Self {
        Self {
            press: default_axis_press(),
            release: default_axis_release(),
        }
    }
}

/// One configured output sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSection {
    /// Label used by `--player` to select this section
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten)]
    pub backend: PlayerBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlayerBackend {
    MidiPort {
        /// Port-name fragment; the first matching output port is used
        #[serde(default)]
        port: Option<String>,
    },
    Fluidsynth {
        soundfont: PathBuf,
        #[serde(default = "default_fluidsynth_command")]
        command: String,
        #[serde(default, rename = "audio-driver")]
        audio_driver: Option<String>,
        #[serde(default, rename = "extra-options")]
        extra_options: Vec<String>,
    },
}

fn default_fluidsynth_command() -> String {
    "fluidsynth".to_string()
}

impl PlayerBackend {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PlayerBackend::MidiPort { .. } => "midi-port",
            PlayerBackend::Fluidsynth { .. } => "fluidsynth",
        }
    }
}

impl PlayerSection {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.backend.kind_name())
    }
}

impl Config {
    /// Default config path: `./rimshot.toml` when present, otherwise the
    /// user config directory.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("rimshot.toml");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rimshot")
            .join("config.toml")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Resolve a path from the config relative to the config file location
    pub fn resolve(config_path: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(path)
        }
    }
}
