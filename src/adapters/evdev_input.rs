use crate::core::{AxisScale, InputEvent, InputSource};
use crate::utils::error::{RoverError, Result};
use async_trait::async_trait;
use evdev::{Device, EventStream, EventType, Key};
use std::io;
use std::path::PathBuf;

/// errno for a device that has been unplugged.
const ENODEV: i32 = 19;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub phys: String,
}

pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices: Vec<DeviceInfo> = evdev::enumerate()
        .map(|(path, device)| DeviceInfo {
            path,
            name: device.name().unwrap_or("unknown").to_string(),
            phys: device.physical_path().unwrap_or("").to_string(),
        })
        .collect();
    devices.sort_by(|a, b| a.path.cmp(&b.path));
    devices
}

fn is_gamepad(device: &Device) -> bool {
    device
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::BTN_SOUTH))
        && device.supported_absolute_axes().is_some()
}

/// Game controller read through the kernel's evdev interface.
pub struct EvdevInput {
    stream: EventStream,
    scale: AxisScale,
    name: String,
    path: PathBuf,
}

impl EvdevInput {
    /// Opens `path`, or the first enumerated device that looks like a gamepad.
    pub fn open(path: Option<&str>, scale: AxisScale) -> Result<Self> {
        let (path, device) = match path {
            Some(p) => {
                let device = Device::open(p).map_err(|e| RoverError::InputDeviceError {
                    message: format!("Cannot open {}: {}", p, e),
                })?;
                (PathBuf::from(p), device)
            }
            None => {
                let mut candidates: Vec<(PathBuf, Device)> =
                    evdev::enumerate().filter(|(_, d)| is_gamepad(d)).collect();
                candidates.sort_by(|a, b| a.0.cmp(&b.0));
                candidates
                    .into_iter()
                    .next()
                    .ok_or(RoverError::NoInputDevices)?
            }
        };

        let name = device.name().unwrap_or("unknown").to_string();
        let stream = device
            .into_event_stream()
            .map_err(|e| RoverError::InputDeviceError {
                message: format!("Cannot read events from {}: {}", path.display(), e),
            })?;
        tracing::info!("🎮 Using input device {} ({})", path.display(), name);

        Ok(Self {
            stream,
            scale,
            name,
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Maps a raw evdev event; `None` for SYN reports, MSC scancodes and
/// anything else the drive logic has no use for.
fn to_input_event(event: evdev::InputEvent, scale: &AxisScale) -> Option<InputEvent> {
    let code = event.code();
    let value = event.value();
    match event.event_type() {
        EventType::KEY => Some(InputEvent::Key {
            code,
            value,
            name: format!("{:?}", Key::new(code)),
        }),
        EventType::ABSOLUTE => Some(InputEvent::Abs {
            code,
            value,
            percentage: scale.percentage(code, value),
        }),
        _ => None,
    }
}

fn is_unplugged(error: &io::Error) -> bool {
    error.raw_os_error() == Some(ENODEV)
}

#[async_trait]
impl InputSource for EvdevInput {
    async fn next_event(&mut self) -> Result<Option<InputEvent>> {
        loop {
            let event = match self.stream.next_event().await {
                Ok(event) => event,
                Err(e) if is_unplugged(&e) => return Ok(None),
                Err(e) => {
                    return Err(RoverError::InputDeviceError {
                        message: e.to_string(),
                    })
                }
            };

            if let Some(event) = to_input_event(event, &self.scale) {
                return Ok(Some(event));
            }
        }
    }
}
