use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoverError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "hardware")]
    #[error("Serial port error: {0}")]
    SerialError(#[from] tokio_serial::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Rover did not answer command '{command}'")]
    NoResponse { command: String },

    #[error("Connection to the rover is closed")]
    ConnectionClosed,

    #[error("Input device error: {message}")]
    InputDeviceError { message: String },

    #[error("No input devices found")]
    NoInputDevices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Configuration,
    Protocol,
    Input,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RoverError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RoverError::IoError(_) | RoverError::ConnectionClosed => ErrorCategory::Connection,
            #[cfg(feature = "hardware")]
            RoverError::SerialError(_) => ErrorCategory::Connection,
            RoverError::SerializationError(_)
            | RoverError::ProtocolError { .. }
            | RoverError::NoResponse { .. } => ErrorCategory::Protocol,
            RoverError::CsvError(_) => ErrorCategory::Storage,
            RoverError::ConfigError { .. }
            | RoverError::ConfigValidationError { .. }
            | RoverError::InvalidConfigValueError { .. }
            | RoverError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RoverError::InputDeviceError { .. } | RoverError::NoInputDevices => {
                ErrorCategory::Input
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RoverError::NoResponse { .. } | RoverError::CsvError(_) => ErrorSeverity::Medium,
            RoverError::ProtocolError { .. } | RoverError::SerializationError(_) => {
                ErrorSeverity::Medium
            }
            RoverError::ConfigError { .. }
            | RoverError::ConfigValidationError { .. }
            | RoverError::InvalidConfigValueError { .. }
            | RoverError::MissingConfigError { .. } => ErrorSeverity::High,
            RoverError::InputDeviceError { .. } | RoverError::NoInputDevices => {
                ErrorSeverity::High
            }
            RoverError::IoError(_) | RoverError::ConnectionClosed => ErrorSeverity::Critical,
            #[cfg(feature = "hardware")]
            RoverError::SerialError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Connection => {
                "Check that the rover is powered on and the serial port (e.g. /dev/ttyUSB0) is correct and readable by your user"
            }
            ErrorCategory::Configuration => {
                "Review the configuration file and command line flags"
            }
            ErrorCategory::Protocol => {
                "Check the baud rate (the WAVE ROVER uses 1000000) or increase serial.response_delay_ms"
            }
            ErrorCategory::Input => {
                "Connect the controller and make sure its /dev/input/event* node is readable (input group)"
            }
            ErrorCategory::Storage => "Check that the telemetry CSV path is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RoverError::ConnectionClosed => "The rover connection was closed".to_string(),
            RoverError::NoInputDevices => {
                "No game controller was found. Is it connected?".to_string()
            }
            RoverError::NoResponse { command } => {
                format!("The rover did not answer the '{}' command", command)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = RoverError::InvalidConfigValueError {
            field: "drive.max_speed".to_string(),
            value: "300".to_string(),
            reason: "Value must be between 0 and 255".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("drive.max_speed"));
    }

    #[test]
    fn test_connection_errors_are_critical() {
        let err = RoverError::ConnectionClosed;
        assert_eq!(err.category(), ErrorCategory::Connection);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("serial port"));
    }

    #[test]
    fn test_no_response_message_names_command() {
        let err = RoverError::NoResponse {
            command: "ina219_info".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("ina219_info"));
    }
}
