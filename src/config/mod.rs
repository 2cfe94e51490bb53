pub mod toml_config;

pub use toml_config::RoverConfig;

#[cfg(feature = "cli")]
use crate::core::drive::DriveMode;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "rover-pilot")]
#[command(about = "Drive a Waveshare WAVE ROVER with a game controller")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Serial port of the rover's driver board
    #[arg(long)]
    pub port: Option<String>,

    #[arg(long)]
    pub baud: Option<u32>,

    /// Controller evdev node, e.g. /dev/input/event5
    #[arg(long)]
    pub device: Option<String>,

    /// Drive mapping: arcade or tank
    #[arg(long)]
    pub mode: Option<DriveMode>,

    /// Disable periodic battery telemetry
    #[arg(long)]
    pub no_telemetry: bool,

    /// Append power readings to this CSV file
    #[arg(long)]
    pub telemetry_csv: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// List input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Print controller events without connecting to the rover
    #[arg(long)]
    pub print_events: bool,

    /// Show the resolved configuration and exit
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the config file (or defaults) and applies command line overrides.
    pub fn load(&self) -> Result<RoverConfig> {
        let mut config = match &self.config {
            Some(path) => RoverConfig::from_file(path)?,
            None => RoverConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut RoverConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(device) = &self.device {
            config.input.device = Some(device.clone());
        }
        if let Some(mode) = self.mode {
            config.drive.mode = mode;
        }
        if self.no_telemetry {
            config.telemetry.enabled = false;
        }
        if let Some(csv_path) = &self.telemetry_csv {
            config.telemetry.csv_path = Some(csv_path.clone());
        }
    }
}
