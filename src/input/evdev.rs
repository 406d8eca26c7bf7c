//! Physical input devices via evdev
//!
//! Key events map directly to Press/Release. Absolute axes are normalized
//! against the device's reported range and converted to Press/Release/
//! AnalogUpdate with hysteresis thresholds, so the translator only ever
//! sees shaped events.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use evdev::{Device, EventStream, InputEventKind};
use tracing::{debug, warn};

use rimshot_keymap::InputEventId;

use super::{InputAction, InputError, InputSource, RawInputEvent};
use crate::config::AxisThresholds;

/// Per-axis normalization range and latched press state
struct AxisState {
    min: i32,
    max: i32,
    pressed: bool,
}

/// One opened event device
pub struct EvdevSource {
    label: String,
    stream: EventStream,
    epoch: Instant,
    thresholds: AxisThresholds,
    axes: HashMap<u16, AxisState>,
}

impl EvdevSource {
    /// Open every device whose name contains `pattern` (case-insensitive;
    /// an empty pattern matches all devices).
    pub fn open_matching(
        pattern: &str,
        thresholds: AxisThresholds,
        epoch: Instant,
    ) -> Result<Vec<Self>, InputError> {
        let needle = pattern.to_lowercase();
        let mut sources = Vec::new();
        for (path, device) in evdev::enumerate() {
            let name = device.name().unwrap_or("").to_string();
            if !needle.is_empty() && !name.to_lowercase().contains(&needle) {
                continue;
            }
            match Self::from_device(device, &name, &path, thresholds, epoch) {
                Ok(source) => sources.push(source),
                Err(e) => warn!("cannot open {}: {e}", path.display()),
            }
        }
        if sources.is_empty() {
            return Err(InputError::NoDevice(pattern.to_string()));
        }
        Ok(sources)
    }

    fn from_device(
        device: Device,
        name: &str,
        path: &Path,
        thresholds: AxisThresholds,
        epoch: Instant,
    ) -> Result<Self, InputError> {
        let mut axes = HashMap::new();
        if let Some(supported) = device.supported_absolute_axes() {
            let state = device.get_abs_state()?;
            for axis in supported.iter() {
                let info = state[axis.0 as usize];
                // a zero-width range cannot be normalized
                if info.maximum > info.minimum {
                    axes.insert(
                        axis.0,
                        AxisState {
                            min: info.minimum,
                            max: info.maximum,
                            pressed: false,
                        },
                    );
                }
            }
        }
        let label = format!("{} ({})", name, path.display());
        let stream = device.into_event_stream()?;
        Ok(Self {
            label,
            stream,
            epoch,
            thresholds,
            axes,
        })
    }
}

#[async_trait]
impl InputSource for EvdevSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn next_event(&mut self) -> Result<Option<RawInputEvent>, InputError> {
        loop {
            let event = match self.stream.next_event().await {
                Ok(event) => event,
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                    debug!("{}: device disappeared", self.label);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            let timestamp = self.epoch.elapsed();

            match event.kind() {
                InputEventKind::Key(key) => {
                    let (action, magnitude) = match event.value() {
                        1 => (InputAction::Press, 1.0),
                        0 => (InputAction::Release, 0.0),
                        // autorepeat
                        _ => continue,
                    };
                    return Ok(Some(RawInputEvent {
                        id: InputEventId::Key(key.code()),
                        action,
                        magnitude,
                        timestamp,
                    }));
                }
                InputEventKind::AbsAxis(axis) => {
                    let Some(state) = self.axes.get_mut(&axis.0) else {
                        continue;
                    };
                    let span = (state.max - state.min) as f32;
                    let magnitude = ((event.value() - state.min) as f32 / span).clamp(0.0, 1.0);
                    let action = if !state.pressed && magnitude >= self.thresholds.press {
                        state.pressed = true;
                        InputAction::Press
                    } else if state.pressed && magnitude <= self.thresholds.release {
                        state.pressed = false;
                        InputAction::Release
                    } else if state.pressed {
                        InputAction::AnalogUpdate
                    } else {
                        continue;
                    };
                    return Ok(Some(RawInputEvent {
                        id: InputEventId::Axis(axis.0),
                        action,
                        magnitude,
                        timestamp,
                    }));
                }
                _ => continue,
            }
        }
    }
}
