use crate::core::drive::{DriveMode, DriveSettings};
use crate::core::session::SessionOptions;
use crate::core::AxisScale;
use crate::domain::model::MAX_WHEEL_SPEED;
use crate::utils::error::{RoverError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub serial: SerialConfig,
    pub input: InputConfig,
    pub drive: DriveConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Time the driver board gets to answer a command.
    pub response_delay_ms: u64,
    /// Silence that marks the end of a reply.
    pub read_idle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 1_000_000,
            response_delay_ms: 50,
            read_idle_ms: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// evdev node, e.g. `/dev/input/event5`. First gamepad found when unset.
    pub device: Option<String>,
    pub joystick_max: i32,
    pub trigger_max: i32,
    pub deadzone: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        let scale = AxisScale::default();
        Self {
            device: None,
            joystick_max: scale.joystick_max,
            trigger_max: scale.trigger_max,
            deadzone: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub mode: DriveMode,
    pub max_speed: i32,
    pub gears: Vec<u8>,
    pub initial_gear: usize,
}

impl Default for DriveConfig {
    fn default() -> Self {
        let settings = DriveSettings::default();
        Self {
            mode: settings.mode,
            max_speed: settings.max_speed,
            gears: settings.gears,
            initial_gear: settings.initial_gear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub csv_path: Option<String>,
    pub oled_status: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 30,
            csv_path: None,
            oled_status: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Plain-text log file next to the console output; `None` disables it.
    pub log_file: Option<String>,
    pub level: String,
    pub delete_old_logfile: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: Some("rover.log".to_string()),
            level: "debug".to_string(),
            delete_old_logfile: true,
        }
    }
}

impl RoverConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RoverError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML text after `${VAR}` substitution; missing sections take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RoverError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RoverError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("serial.port", &self.serial.port)?;
        validation::validate_positive_number("serial.baud_rate", self.serial.baud_rate, 1)?;
        validation::validate_range("serial.response_delay_ms", self.serial.response_delay_ms, 0, 5000)?;
        validation::validate_range("serial.read_idle_ms", self.serial.read_idle_ms, 1, 1000)?;

        if let Some(device) = &self.input.device {
            validation::validate_path("input.device", device)?;
        }
        validation::validate_positive_number("input.joystick_max", self.input.joystick_max, 1)?;
        validation::validate_positive_number("input.trigger_max", self.input.trigger_max, 1)?;
        validation::validate_range("input.deadzone", self.input.deadzone, 0, 100)?;

        validation::validate_range("drive.max_speed", self.drive.max_speed, 0, MAX_WHEEL_SPEED)?;
        if self.drive.gears.is_empty() {
            return Err(RoverError::InvalidConfigValueError {
                field: "drive.gears".to_string(),
                value: "[]".to_string(),
                reason: "At least one gear is required".to_string(),
            });
        }
        for gear in &self.drive.gears {
            validation::validate_range("drive.gears", *gear, 1, 100)?;
        }
        validation::validate_range(
            "drive.initial_gear",
            self.drive.initial_gear,
            0,
            self.drive.gears.len() - 1,
        )?;

        if self.telemetry.enabled {
            validation::validate_positive_number(
                "telemetry.interval_seconds",
                self.telemetry.interval_seconds,
                1,
            )?;
        }
        if let Some(csv_path) = &self.telemetry.csv_path {
            validation::validate_path("telemetry.csv_path", csv_path)?;
        }

        if let Some(log_file) = &self.logging.log_file {
            validation::validate_path("logging.log_file", log_file)?;
        }
        validation::validate_non_empty_string("logging.level", &self.logging.level)?;

        Ok(())
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.serial.response_delay_ms)
    }

    pub fn read_idle(&self) -> Duration {
        Duration::from_millis(self.serial.read_idle_ms)
    }

    pub fn axis_scale(&self) -> AxisScale {
        AxisScale {
            joystick_max: self.input.joystick_max,
            trigger_max: self.input.trigger_max,
        }
    }

    pub fn drive_settings(&self) -> DriveSettings {
        DriveSettings {
            mode: self.drive.mode,
            max_speed: self.drive.max_speed,
            deadzone: self.input.deadzone,
            gears: self.drive.gears.clone(),
            initial_gear: self.drive.initial_gear,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            telemetry_interval: self
                .telemetry
                .enabled
                .then(|| Duration::from_secs(self.telemetry.interval_seconds)),
            telemetry_csv: self.telemetry.csv_path.as_ref().map(PathBuf::from),
            oled_status: self.telemetry.oled_status,
        }
    }
}

impl Validate for RoverConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_wave_rover() {
        let config = RoverConfig::from_toml_str("").unwrap();

        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 1_000_000);
        assert_eq!(config.response_delay(), Duration::from_millis(50));
        assert_eq!(config.axis_scale(), AxisScale::default());
        assert_eq!(config.drive.mode, DriveMode::Arcade);
        assert_eq!(config.logging.log_file.as_deref(), Some("rover.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[serial]
port = "/dev/ttyACM0"

[input]
device = "/dev/input/event7"
deadzone = 12

[drive]
mode = "tank"
gears = [30, 60, 100]
initial_gear = 0

[telemetry]
enabled = false
"#;

        let config = RoverConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 1_000_000);
        assert_eq!(config.input.device.as_deref(), Some("/dev/input/event7"));

        let settings = config.drive_settings();
        assert_eq!(settings.mode, DriveMode::Tank);
        assert_eq!(settings.deadzone, 12);
        assert_eq!(settings.gears, vec![30, 60, 100]);

        assert_eq!(config.session_options().telemetry_interval, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ROVER_TEST_SERIAL_PORT", "/dev/ttyUSB3");

        let toml_content = r#"
[serial]
port = "${ROVER_TEST_SERIAL_PORT}"
"#;

        let config = RoverConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB3");

        std::env::remove_var("ROVER_TEST_SERIAL_PORT");
    }

    #[test]
    fn test_config_validation() {
        let config = RoverConfig::from_toml_str("[drive]\nmax_speed = 300\n").unwrap();
        assert!(config.validate().is_err());

        let config = RoverConfig::from_toml_str("[drive]\ngears = []\n").unwrap();
        assert!(config.validate().is_err());

        let config =
            RoverConfig::from_toml_str("[drive]\ngears = [50, 100]\ninitial_gear = 2\n").unwrap();
        assert!(config.validate().is_err());

        let config = RoverConfig::from_toml_str("[serial]\nport = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = RoverConfig::from_toml_str("[drive]\nmode = \"hover\"\n").unwrap_err();
        assert!(matches!(err, RoverError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[telemetry]
interval_seconds = 5
csv_path = "telemetry/power.csv"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = RoverConfig::from_file(temp_file.path()).unwrap();
        let options = config.session_options();
        assert_eq!(options.telemetry_interval, Some(Duration::from_secs(5)));
        assert_eq!(options.telemetry_csv, Some(PathBuf::from("telemetry/power.csv")));
        assert!(options.oled_status);
    }
}
