use crate::core::{Command, PowerReading, Transport};
use crate::domain::model::OLED_LINES;
use crate::utils::error::{RoverError, Result};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_millis(50);

/// Client for the WAVE ROVER JSON command set.
///
/// Each command is written as compact JSON, then the driver board gets
/// `response_delay` to answer before pending input is drained.
pub struct Rover<T: Transport> {
    transport: T,
    response_delay: Duration,
    open: bool,
    commands_sent: u64,
}

impl<T: Transport> Rover<T> {
    pub fn new(transport: T) -> Self {
        Self::with_response_delay(transport, DEFAULT_RESPONSE_DELAY)
    }

    pub fn with_response_delay(transport: T, response_delay: Duration) -> Self {
        Self {
            transport,
            response_delay,
            open: true,
            commands_sent: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    pub async fn send(&mut self, command: &Command) -> Result<Option<Value>> {
        tracing::debug!("Sending {} command: {}", command.name(), command.to_json());
        self.send_bytes(&command.encode()).await
    }

    /// Sends an arbitrary JSON object, for commands without a typed variant.
    pub async fn send_raw(&mut self, value: &Value) -> Result<Option<Value>> {
        if !value.is_object() {
            return Err(RoverError::ProtocolError {
                message: format!("Command must be a JSON object, got: {}", value),
            });
        }
        tracing::debug!("Sending raw command: {}", value);
        self.send_bytes(value.to_string().as_bytes()).await
    }

    async fn send_bytes(&mut self, data: &[u8]) -> Result<Option<Value>> {
        if !self.open {
            return Err(RoverError::ConnectionClosed);
        }

        self.transport.write_all(data).await?;
        self.commands_sent += 1;

        tokio::time::sleep(self.response_delay).await;

        let raw = self.transport.read_available().await?;
        let response = parse_response(&raw);
        match &response {
            Some(value) => tracing::debug!("Command response: {}", value),
            None => tracing::debug!("No response to command"),
        }
        Ok(response)
    }

    /// Drains and returns whatever text the board has sent.
    pub async fn read_data(&mut self) -> Result<String> {
        if !self.open {
            return Err(RoverError::ConnectionClosed);
        }
        let raw = self.transport.read_available().await?;
        Ok(String::from_utf8_lossy(&raw).trim().to_string())
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.transport.close().await?;
            tracing::debug!("Rover connection closed after {} commands", self.commands_sent);
        }
        Ok(())
    }

    pub async fn emergency_stop(&mut self) -> Result<Option<Value>> {
        self.send(&Command::EmergencyStop).await
    }

    pub async fn speed_input(&mut self, left: i32, right: i32) -> Result<Option<Value>> {
        self.send(&Command::speed(left, right)).await
    }

    pub async fn pid_set(&mut self, p: i32, i: i32) -> Result<Option<Value>> {
        self.send(&Command::PidSet { p, i }).await
    }

    pub async fn oled_set(&mut self, line: u8, text: &str) -> Result<Option<Value>> {
        if line >= OLED_LINES {
            return Err(RoverError::ProtocolError {
                message: format!("OLED line must be 0..{}, got {}", OLED_LINES, line),
            });
        }
        self.send(&Command::oled(line, text)).await
    }

    pub async fn oled_clear(&mut self) -> Result<()> {
        for line in 0..OLED_LINES {
            self.send(&Command::oled(line, "")).await?;
        }
        Ok(())
    }

    pub async fn oled_default(&mut self) -> Result<Option<Value>> {
        self.send(&Command::OledDefault).await
    }

    pub async fn pwm_servo_control(&mut self, position: i32, speed: i32) -> Result<Option<Value>> {
        self.send(&Command::PwmServoCtrl { position, speed }).await
    }

    pub async fn pwm_servo_mid(&mut self) -> Result<Option<Value>> {
        self.send(&Command::PwmServoMid).await
    }

    pub async fn bus_servo_ctrl(
        &mut self,
        id: u8,
        position: i32,
        speed: i32,
        acceleration: i32,
    ) -> Result<Option<Value>> {
        self.send(&Command::BusServoCtrl {
            id,
            position,
            speed,
            acceleration,
        })
        .await
    }

    pub async fn bus_servo_mid(&mut self, id: u8) -> Result<Option<Value>> {
        self.send(&Command::BusServoMid { id }).await
    }

    pub async fn bus_servo_scan(&mut self, max_id: u8) -> Result<Option<Value>> {
        self.send(&Command::BusServoScan { max_id }).await
    }

    pub async fn bus_servo_info(&mut self, id: u8) -> Result<Option<Value>> {
        self.send(&Command::BusServoInfo { id }).await
    }

    pub async fn bus_servo_id_set(&mut self, old: u8, new: u8) -> Result<Option<Value>> {
        self.send(&Command::BusServoIdSet { old, new }).await
    }

    pub async fn bus_servo_torque_lock(&mut self, id: u8, enabled: bool) -> Result<Option<Value>> {
        self.send(&Command::BusServoTorqueLock { id, enabled }).await
    }

    pub async fn bus_servo_torque_limit(&mut self, id: u8, limit: i32) -> Result<Option<Value>> {
        self.send(&Command::BusServoTorqueLimit { id, limit }).await
    }

    pub async fn bus_servo_mode(&mut self, id: u8, mode: u8) -> Result<Option<Value>> {
        self.send(&Command::BusServoMode { id, mode }).await
    }

    pub async fn wifi_scan(&mut self) -> Result<Option<Value>> {
        self.send(&Command::WifiScan).await
    }

    pub async fn wifi_try_sta(&mut self) -> Result<Option<Value>> {
        self.send(&Command::WifiTrySta).await
    }

    /// Starts the rover's own hotspot (SSID `WAVE_ROVER`).
    pub async fn wifi_ap_default(&mut self) -> Result<Option<Value>> {
        self.send(&Command::WifiApDefault).await
    }

    pub async fn wifi_info(&mut self) -> Result<Option<Value>> {
        self.send(&Command::WifiInfo).await
    }

    pub async fn wifi_off(&mut self) -> Result<Option<Value>> {
        self.send(&Command::WifiOff).await
    }

    pub async fn ina219_info(&mut self) -> Result<PowerReading> {
        let command = Command::Ina219Info;
        let response = self
            .send(&command)
            .await?
            .ok_or_else(|| RoverError::NoResponse {
                command: command.name().to_string(),
            })?;
        let reading: PowerReading =
            serde_json::from_value(response.clone()).map_err(|e| RoverError::ProtocolError {
                message: format!("Unexpected reply to {}: {} ({})", command.name(), response, e),
            })?;

        tracing::debug!("Rover power state: {}", reading.power_state());
        tracing::debug!("Battery:        {:3.1}%", reading.battery_percentage());
        tracing::debug!("Shunt Voltage: {:9.6} mV", reading.shunt_mv);
        tracing::debug!("Bus Voltage:    {:6.3} V", reading.bus_v);
        tracing::debug!("Load Voltage:   {:6.3} V", reading.load_v);
        tracing::debug!("Current:        {:9.6} mA", reading.current_ma);
        tracing::debug!("Power:          {:6.3} mW", reading.power_mw);

        Ok(reading)
    }

    pub async fn imu_info(&mut self) -> Result<Option<Value>> {
        self.send(&Command::ImuInfo).await
    }

    /// Not available on the WAVE ROVER, which has no wheel encoders.
    pub async fn encoder_info(&mut self) -> Result<Option<Value>> {
        self.send(&Command::EncoderInfo).await
    }

    pub async fn device_info(&mut self) -> Result<Option<Value>> {
        self.send(&Command::DeviceInfo).await
    }

    pub async fn io_ir_cut(&mut self, high: bool) -> Result<Option<Value>> {
        self.send(&Command::IoIrCut { high }).await
    }

    pub async fn set_spd_rate(&mut self, left: f64, right: f64) -> Result<Option<Value>> {
        self.send(&Command::SetSpdRate { left, right }).await
    }

    pub async fn get_spd_rate(&mut self) -> Result<Option<Value>> {
        self.send(&Command::GetSpdRate).await
    }

    pub async fn spd_rate_save(&mut self) -> Result<Option<Value>> {
        self.send(&Command::SpdRateSave).await
    }

    pub async fn get_nvs_space(&mut self) -> Result<Option<Value>> {
        self.send(&Command::GetNvsSpace).await
    }

    pub async fn nvs_clear(&mut self) -> Result<Option<Value>> {
        self.send(&Command::NvsClear).await
    }
}

/// Picks the last line of `raw` that parses as JSON.
pub fn parse_response(raw: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(raw);
    let mut last = None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => last = Some(value),
            Err(_) => tracing::debug!("Ignoring non-JSON output from rover: {}", line),
        }
    }
    last
}
