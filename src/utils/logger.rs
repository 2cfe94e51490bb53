use crate::config::toml_config::LoggingConfig;
use crate::utils::error::{RoverError, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init_cli_logger(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("rover_pilot=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rover_pilot=info"))
    };

    let file_layer = match &logging.log_file {
        Some(path) => {
            let level = LevelFilter::from_str(&logging.level).map_err(|_| {
                RoverError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: logging.level.clone(),
                    reason: "Expected one of: off, error, warn, info, debug, trace".to_string(),
                }
            })?;

            if logging.delete_old_logfile {
                remove_old_logfile(path)?;
            }

            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
                    .with_target(true)
                    .with_filter(level),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_filter(filter),
        )
        .with(file_layer)
        .init();

    if let Some(path) = &logging.log_file {
        tracing::info!("Logging to [{}] at level [{}]", path, logging.level);
    }

    Ok(())
}

/// Plain console logger for the one-shot tools.
pub fn init_tool_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rover_pilot=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rover_pilot=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

fn remove_old_logfile(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_old_logfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rover.log");
        fs::write(&path, "old run").unwrap();

        remove_old_logfile(path.to_str().unwrap()).unwrap();
        assert!(!path.exists());

        // Missing file is fine.
        remove_old_logfile(path.to_str().unwrap()).unwrap();
    }
}
