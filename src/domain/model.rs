use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Longest text a single OLED line can show.
pub const OLED_LINE_WIDTH: usize = 22;
pub const OLED_LINES: u8 = 4;
pub const MAX_WHEEL_SPEED: i32 = 255;

/// A JSON command understood by the WAVE ROVER driver board.
///
/// Every command is an object carrying its type code under `"T"`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    EmergencyStop,
    /// Wheel speeds, -255 ..= 255 per side.
    SpeedInput { left: i32, right: i32 },
    /// Only meaningful on chassis with speed feedback.
    PidSet { p: i32, i: i32 },
    OledSet { line: u8, text: String },
    OledDefault,
    PwmServoCtrl { position: i32, speed: i32 },
    PwmServoMid,
    BusServoCtrl {
        id: u8,
        position: i32,
        speed: i32,
        acceleration: i32,
    },
    BusServoMid { id: u8 },
    BusServoScan { max_id: u8 },
    BusServoInfo { id: u8 },
    BusServoIdSet { old: u8, new: u8 },
    BusServoTorqueLock { id: u8, enabled: bool },
    /// `limit` is in tenths of a percent of locked rotor torque (500 = 50%).
    BusServoTorqueLimit { id: u8, limit: i32 },
    /// 0 = position servo mode, 3 = stepper servo mode.
    BusServoMode { id: u8, mode: u8 },
    WifiScan,
    WifiTrySta,
    WifiApDefault,
    WifiInfo,
    WifiOff,
    Ina219Info,
    ImuInfo,
    EncoderInfo,
    DeviceInfo,
    IoIrCut { high: bool },
    SetSpdRate { left: f64, right: f64 },
    GetSpdRate,
    SpdRateSave,
    GetNvsSpace,
    NvsClear,
}

impl Command {
    pub fn speed(left: i32, right: i32) -> Self {
        Command::SpeedInput {
            left: left.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED),
            right: right.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED),
        }
    }

    pub fn oled(line: u8, text: &str) -> Self {
        Command::OledSet {
            line,
            text: text.chars().take(OLED_LINE_WIDTH).collect(),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Command::EmergencyStop => 0,
            Command::SpeedInput { .. } => 1,
            Command::PidSet { .. } => 2,
            Command::OledSet { .. } => 3,
            Command::OledDefault => -3,
            Command::PwmServoCtrl { .. } => 40,
            Command::PwmServoMid => -4,
            Command::BusServoCtrl { .. } => 50,
            Command::BusServoMid { .. } => -5,
            Command::BusServoScan { .. } => 52,
            Command::BusServoInfo { .. } => 53,
            Command::BusServoIdSet { .. } => 54,
            Command::BusServoTorqueLock { .. } => 55,
            Command::BusServoTorqueLimit { .. } => 56,
            Command::BusServoMode { .. } => 57,
            Command::WifiScan => 60,
            Command::WifiTrySta => 61,
            Command::WifiApDefault => 62,
            Command::WifiInfo => 65,
            Command::WifiOff => 66,
            Command::Ina219Info => 70,
            Command::ImuInfo => 71,
            Command::EncoderInfo => 73,
            Command::DeviceInfo => 74,
            Command::IoIrCut { .. } => 80,
            Command::SetSpdRate { .. } => 901,
            Command::GetSpdRate => 902,
            Command::SpdRateSave => 903,
            Command::GetNvsSpace => 904,
            Command::NvsClear => 905,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::EmergencyStop => "emergency_stop",
            Command::SpeedInput { .. } => "speed_input",
            Command::PidSet { .. } => "pid_set",
            Command::OledSet { .. } => "oled_set",
            Command::OledDefault => "oled_default",
            Command::PwmServoCtrl { .. } => "pwm_servo_ctrl",
            Command::PwmServoMid => "pwm_servo_mid",
            Command::BusServoCtrl { .. } => "bus_servo_ctrl",
            Command::BusServoMid { .. } => "bus_servo_mid",
            Command::BusServoScan { .. } => "bus_servo_scan",
            Command::BusServoInfo { .. } => "bus_servo_info",
            Command::BusServoIdSet { .. } => "bus_servo_id_set",
            Command::BusServoTorqueLock { .. } => "bus_servo_torque_lock",
            Command::BusServoTorqueLimit { .. } => "bus_servo_torque_limit",
            Command::BusServoMode { .. } => "bus_servo_mode",
            Command::WifiScan => "wifi_scan",
            Command::WifiTrySta => "wifi_try_sta",
            Command::WifiApDefault => "wifi_ap_default",
            Command::WifiInfo => "wifi_info",
            Command::WifiOff => "wifi_off",
            Command::Ina219Info => "ina219_info",
            Command::ImuInfo => "imu_info",
            Command::EncoderInfo => "encoder_info",
            Command::DeviceInfo => "device_info",
            Command::IoIrCut { .. } => "io_ir_cut",
            Command::SetSpdRate { .. } => "set_spd_rate",
            Command::GetSpdRate => "get_spd_rate",
            Command::SpdRateSave => "spd_rate_save",
            Command::GetNvsSpace => "get_nvs_space",
            Command::NvsClear => "nvs_clear",
        }
    }

    pub fn to_json(&self) -> Value {
        let t = self.code();
        match self {
            Command::SpeedInput { left, right } => json!({"T": t, "L": left, "R": right}),
            Command::PidSet { p, i } => json!({"T": t, "P": p, "I": i}),
            Command::OledSet { line, text } => json!({"T": t, "lineNum": line, "Text": text}),
            Command::PwmServoCtrl { position, speed } => {
                json!({"T": t, "pos": position, "spd": speed})
            }
            Command::BusServoCtrl {
                id,
                position,
                speed,
                acceleration,
            } => json!({"T": t, "id": id, "pos": position, "spd": speed, "acc": acceleration}),
            Command::BusServoMid { id } | Command::BusServoInfo { id } => {
                json!({"T": t, "id": id})
            }
            Command::BusServoScan { max_id } => json!({"T": t, "num": max_id}),
            Command::BusServoIdSet { old, new } => json!({"T": t, "old": old, "new": new}),
            Command::BusServoTorqueLock { id, enabled } => {
                json!({"T": t, "id": id, "status": u8::from(*enabled)})
            }
            Command::BusServoTorqueLimit { id, limit } => {
                json!({"T": t, "id": id, "limit": limit})
            }
            Command::BusServoMode { id, mode } => json!({"T": t, "id": id, "mode": mode}),
            Command::IoIrCut { high } => json!({"T": t, "status": u8::from(*high)}),
            Command::SetSpdRate { left, right } => json!({"T": t, "L": left, "R": right}),
            _ => json!({ "T": t }),
        }
    }

    /// Compact JSON as written to the serial line.
    pub fn encode(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.to_json())
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// INA219 power monitor readout (`{"T":70}` reply).
///
/// Every field must be present in the reply; the board reports a
/// missing sensor value as `null`, which reads as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    #[serde(rename = "shunt_mV", deserialize_with = "null_as_zero")]
    pub shunt_mv: f64,
    #[serde(rename = "load_V", deserialize_with = "null_as_zero")]
    pub load_v: f64,
    #[serde(rename = "bus_V", deserialize_with = "null_as_zero")]
    pub bus_v: f64,
    #[serde(rename = "current_mA", deserialize_with = "null_as_zero")]
    pub current_ma: f64,
    #[serde(rename = "power_mW", deserialize_with = "null_as_zero")]
    pub power_mw: f64,
}

impl PowerReading {
    /// Battery charge estimated from bus voltage over the 9.0 V .. 12.6 V pack range.
    pub fn battery_percentage(&self) -> f64 {
        ((self.bus_v - 9.0) / 3.6 * 100.0).clamp(0.0, 100.0)
    }

    pub fn power_state(&self) -> PowerState {
        let shunt = self.shunt_mv;
        let load = self.load_v;
        if shunt < 0.0 && load < 1.0 {
            PowerState::ChargerOffSwitchOff
        } else if shunt < 0.0 && load > 1.0 {
            PowerState::ChargerOnSwitchOff
        } else if shunt > 0.0 && load > 11.7 {
            PowerState::ChargerOnSwitchOn
        } else if shunt > 0.0 && load < 11.7 {
            PowerState::ChargerOffSwitchOn
        } else {
            PowerState::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    ChargerOffSwitchOff,
    ChargerOnSwitchOff,
    ChargerOnSwitchOn,
    ChargerOffSwitchOn,
    Unknown,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PowerState::ChargerOffSwitchOff => "Charger: OFF, PowerSwitch: OFF",
            PowerState::ChargerOnSwitchOff => "Charger: ON, PowerSwitch: OFF",
            PowerState::ChargerOnSwitchOn => "Charger: ON, PowerSwitch: ON",
            PowerState::ChargerOffSwitchOn => "Charger: OFF, PowerSwitch: ON",
            PowerState::Unknown => "Unknown state",
        };
        f.write_str(text)
    }
}

/// One event read from the controller's evdev node.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Button; `value` is 0 = release, 1 = press, 2 = auto-repeat.
    Key { code: u16, value: i32, name: String },
    /// Analog axis with its value scaled to a percentage when the axis is known.
    Abs {
        code: u16,
        value: i32,
        percentage: Option<i32>,
    },
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEvent::Key { code, value, name } => {
                write!(f, "Key: {} KeyNumber: {} Value: {}", name, code, value)
            }
            InputEvent::Abs {
                code,
                value,
                percentage: Some(pct),
            } => write!(f, "KeyNumber: {} Value: {} Percentage: {}%", code, value, pct),
            InputEvent::Abs { code, value, .. } => {
                write!(f, "KeyNumber: {} Value: {}", code, value)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsAxis {
    LeftX,
    LeftY,
    LeftTrigger,
    RightX,
    RightY,
    RightTrigger,
}

impl AbsAxis {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(AbsAxis::LeftX),
            1 => Some(AbsAxis::LeftY),
            2 => Some(AbsAxis::LeftTrigger),
            3 => Some(AbsAxis::RightX),
            4 => Some(AbsAxis::RightY),
            5 => Some(AbsAxis::RightTrigger),
            _ => None,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, AbsAxis::LeftTrigger | AbsAxis::RightTrigger)
    }
}

/// Full-scale raw values of the controller's analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisScale {
    pub joystick_max: i32,
    pub trigger_max: i32,
}

impl Default for AxisScale {
    // Xbox One controller (M1142084-007).
    fn default() -> Self {
        Self {
            joystick_max: 32767,
            trigger_max: 1023,
        }
    }
}

impl AxisScale {
    /// Scales a raw axis value to a whole percentage.
    ///
    /// Stick readings are sign-inverted so pushing a stick forward reads
    /// positive; on the X axes that makes right negative. Unknown axes
    /// (D-pad hats and the like) and a non-positive full scale yield `None`.
    pub fn percentage(&self, code: u16, value: i32) -> Option<i32> {
        let axis = AbsAxis::from_code(code)?;
        let max = if axis.is_trigger() {
            self.trigger_max
        } else {
            self.joystick_max
        };
        if max <= 0 {
            return None;
        }
        let pct = (value as f64 / max as f64 * 100.0).trunc() as i32;
        if axis.is_trigger() {
            Some(pct)
        } else {
            Some(-pct)
        }
    }
}

/// Xbox controller buttons as reported by the Linux xpad driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
    Guide,
    LeftStick,
    RightStick,
}

impl Button {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            304 => Some(Button::A),
            305 => Some(Button::B),
            307 => Some(Button::X),
            308 => Some(Button::Y),
            310 => Some(Button::LeftBumper),
            311 => Some(Button::RightBumper),
            314 => Some(Button::Back),
            315 => Some(Button::Start),
            316 => Some(Button::Guide),
            317 => Some(Button::LeftStick),
            318 => Some(Button::RightStick),
            _ => None,
        }
    }
}
