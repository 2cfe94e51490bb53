// Adapters layer: concrete links to the rover and the controller.

pub mod evdev_input;
pub mod serial;

pub use evdev_input::{list_devices, DeviceInfo, EvdevInput};
pub use serial::SerialTransport;
