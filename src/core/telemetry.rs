use crate::core::{PowerReading, PowerState};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct PowerReport {
    pub timestamp: DateTime<Utc>,
    pub reading: PowerReading,
    pub battery_percentage: f64,
    pub state: PowerState,
}

impl PowerReport {
    pub fn new(reading: PowerReading) -> Self {
        Self::at(Utc::now(), reading)
    }

    pub fn at(timestamp: DateTime<Utc>, reading: PowerReading) -> Self {
        Self {
            timestamp,
            battery_percentage: reading.battery_percentage(),
            state: reading.power_state(),
            reading,
        }
    }

    /// Short form for the 22-character OLED line.
    pub fn oled_line(&self) -> String {
        format!(
            "Bat {:.0}% {:.2}V",
            self.battery_percentage, self.reading.bus_v
        )
    }

    pub fn log(&self) {
        tracing::info!(
            "🔋 Battery {:.1}% - Bus: {:.3}V, Load: {:.3}V, Current: {:.1}mA, Power: {:.1}mW ({})",
            self.battery_percentage,
            self.reading.bus_v,
            self.reading.load_v,
            self.reading.current_ma,
            self.reading.power_mw,
            self.state
        );
    }
}

#[derive(Debug, Serialize)]
struct TelemetryRow<'a> {
    timestamp: String,
    bus_v: f64,
    load_v: f64,
    shunt_mv: f64,
    current_ma: f64,
    power_mw: f64,
    battery_pct: f64,
    state: &'a str,
}

/// Appends power reports to a CSV file.
pub struct TelemetryRecorder {
    path: PathBuf,
    rows_written: usize,
}

impl TelemetryRecorder {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rows_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn record(&mut self, report: &PowerReport) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        let state = report.state.to_string();
        writer.serialize(TelemetryRow {
            timestamp: report.timestamp.to_rfc3339(),
            bus_v: report.reading.bus_v,
            load_v: report.reading.load_v,
            shunt_mv: report.reading.shunt_mv,
            current_ma: report.reading.current_ma,
            power_mw: report.reading.power_mw,
            battery_pct: (report.battery_percentage * 10.0).round() / 10.0,
            state: &state,
        })?;
        writer.flush()?;

        self.rows_written += 1;
        Ok(())
    }
}
