use crate::core::drive::{Action, DriveController};
use crate::core::rover::Rover;
use crate::core::telemetry::{PowerReport, TelemetryRecorder};
use crate::core::{InputEvent, InputSource, Transport};
use crate::utils::error::Result;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Interval;

/// Upper bound on events folded into one burst, so a device that never
/// goes quiet cannot starve the telemetry and shutdown branches.
const MAX_BURST_EVENTS: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Poll the INA219 this often; `None` disables periodic telemetry.
    pub telemetry_interval: Option<Duration>,
    pub telemetry_csv: Option<PathBuf>,
    pub oled_status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    QuitButton,
    InputClosed,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub events: u64,
    /// Every command written to the rover, including OLED and telemetry requests.
    pub commands_sent: u64,
    pub drive_commands: u64,
    pub emergency_stops: u64,
    pub power_reports: u64,
    pub reason: ExitReason,
}

/// Drives the rover from a controller until told to stop.
///
/// Whatever ends the session, the rover is sent a zero speed and the
/// transport is closed before `run` returns.
pub struct DriveSession<I: InputSource, T: Transport> {
    input: I,
    rover: Rover<T>,
    controller: DriveController,
    recorder: Option<TelemetryRecorder>,
    options: SessionOptions,
    events: u64,
    drive_commands: u64,
    emergency_stops: u64,
    power_reports: u64,
}

impl<I: InputSource, T: Transport> DriveSession<I, T> {
    pub fn new(
        input: I,
        rover: Rover<T>,
        controller: DriveController,
        options: SessionOptions,
    ) -> Self {
        let recorder = options.telemetry_csv.as_ref().map(TelemetryRecorder::new);
        Self {
            input,
            rover,
            controller,
            recorder,
            options,
            events: 0,
            drive_commands: 0,
            emergency_stops: 0,
            power_reports: 0,
        }
    }

    pub async fn run<F>(mut self, shutdown: F) -> Result<SessionSummary>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("🚀 Drive session started");
        let outcome = self.run_loop(shutdown).await;

        if let Err(e) = self.rover.speed_input(0, 0).await {
            tracing::warn!("Failed to stop the rover on exit: {}", e);
        }
        if let Err(e) = self.rover.close().await {
            tracing::warn!("Failed to close the rover connection: {}", e);
        }

        let reason = outcome?;
        let summary = SessionSummary {
            events: self.events,
            commands_sent: self.rover.commands_sent(),
            drive_commands: self.drive_commands,
            emergency_stops: self.emergency_stops,
            power_reports: self.power_reports,
            reason,
        };
        tracing::info!(
            "✅ Drive session ended ({:?}): {} events, {} commands sent, {} drive commands, {} emergency stops",
            summary.reason,
            summary.events,
            summary.commands_sent,
            summary.drive_commands,
            summary.emergency_stops
        );
        Ok(summary)
    }

    async fn run_loop<F>(&mut self, shutdown: F) -> Result<ExitReason>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = self.options.telemetry_interval.map(tokio::time::interval);

        if self.options.oled_status {
            self.show_oled(0, "rover-pilot").await;
            self.show_drive_status().await;
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    return Ok(ExitReason::Shutdown);
                }
                _ = tick(&mut ticker) => {
                    self.report_power().await;
                }
                event = self.input.next_event() => {
                    if let Some(reason) = self.handle_burst(event?).await? {
                        return Ok(reason);
                    }
                }
            }
        }
    }

    /// Handles `first` together with every event already queued behind it.
    ///
    /// Only the last wheel speeds of the burst are sent, so the rover never
    /// replays a stick sweep that happened while a command was in flight.
    async fn handle_burst(&mut self, first: Option<InputEvent>) -> Result<Option<ExitReason>> {
        let mut pending_drive = None;
        let mut next = first;
        let mut handled = 0;

        loop {
            let Some(event) = next else {
                tracing::warn!("Input device closed");
                self.flush_drive(&mut pending_drive).await?;
                return Ok(Some(ExitReason::InputClosed));
            };
            self.events += 1;
            handled += 1;
            tracing::trace!("{}", event);

            for action in self.controller.handle(&event) {
                if let Some(reason) = self.dispatch(action, &mut pending_drive).await? {
                    return Ok(Some(reason));
                }
            }

            if handled >= MAX_BURST_EVENTS {
                break;
            }
            next = match self.queued_event().await {
                Some(event) => event?,
                None => break,
            };
        }

        if handled > 1 {
            tracing::trace!("Coalesced {} input events", handled);
        }
        self.flush_drive(&mut pending_drive).await?;
        Ok(None)
    }

    /// Polls the input once; `None` when no event is ready yet.
    async fn queued_event(&mut self) -> Option<Result<Option<InputEvent>>> {
        tokio::select! {
            biased;
            event = self.input.next_event() => Some(event),
            _ = std::future::ready(()) => None,
        }
    }

    async fn dispatch(
        &mut self,
        action: Action,
        pending_drive: &mut Option<(i32, i32)>,
    ) -> Result<Option<ExitReason>> {
        match action {
            Action::Drive { left, right } => {
                *pending_drive = Some((left, right));
            }
            Action::EmergencyStop => {
                // Queued speeds are stale once the stop is pressed.
                *pending_drive = None;
                tracing::warn!("🛑 Emergency stop, press Start to re-arm");
                self.rover.emergency_stop().await?;
                self.emergency_stops += 1;
                self.show_drive_status().await;
            }
            Action::Armed => {
                self.flush_drive(pending_drive).await?;
                tracing::info!("Drive re-armed");
                self.show_drive_status().await;
            }
            Action::GearChanged { gear, percent } => {
                self.flush_drive(pending_drive).await?;
                tracing::info!("Gear {} ({}% of max speed)", gear + 1, percent);
                self.show_drive_status().await;
            }
            Action::ReportPower => {
                self.flush_drive(pending_drive).await?;
                self.report_power().await;
            }
            Action::Quit => {
                tracing::info!("Quit requested from controller");
                return Ok(Some(ExitReason::QuitButton));
            }
        }
        Ok(None)
    }

    async fn flush_drive(&mut self, pending_drive: &mut Option<(i32, i32)>) -> Result<()> {
        if let Some((left, right)) = pending_drive.take() {
            tracing::debug!("Drive L={} R={}", left, right);
            self.rover.speed_input(left, right).await?;
            self.drive_commands += 1;
        }
        Ok(())
    }

    /// Telemetry problems are logged and never end the session.
    async fn report_power(&mut self) {
        let reading = match self.rover.ina219_info().await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("Power telemetry unavailable: {}", e);
                return;
            }
        };

        let report = PowerReport::new(reading);
        report.log();
        self.power_reports += 1;

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(&report) {
                tracing::warn!(
                    "Failed to record telemetry to {}: {}",
                    recorder.path().display(),
                    e
                );
            }
        }

        if self.options.oled_status {
            self.show_oled(3, &report.oled_line()).await;
        }
    }

    async fn show_drive_status(&mut self) {
        if !self.options.oled_status {
            return;
        }
        let status = if self.controller.is_armed() {
            format!(
                "Gear {} {}%",
                self.controller.gear() + 1,
                self.controller.gear_percent()
            )
        } else {
            "STOP - Start to arm".to_string()
        };
        self.show_oled(1, &status).await;
    }

    async fn show_oled(&mut self, line: u8, text: &str) {
        if let Err(e) = self.rover.oled_set(line, text).await {
            tracing::warn!("Failed to update OLED line {}: {}", line, e);
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
