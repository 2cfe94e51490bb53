pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "hardware")]
pub mod adapters;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

#[cfg(feature = "hardware")]
pub use crate::adapters::{EvdevInput, SerialTransport};

pub use crate::config::RoverConfig;
pub use crate::core::{
    drive::DriveController,
    rover::Rover,
    session::{DriveSession, SessionSummary},
};
pub use crate::utils::error::{Result, RoverError};
