use crate::domain::model::{AbsAxis, Button, InputEvent, MAX_WHEEL_SPEED};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    /// Triggers for throttle (RT forward, LT reverse), left stick X to steer.
    #[default]
    Arcade,
    /// Left stick Y drives the left wheels, right stick Y the right wheels.
    Tank,
}

impl std::str::FromStr for DriveMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arcade" => Ok(DriveMode::Arcade),
            "tank" => Ok(DriveMode::Tank),
            other => Err(format!("unknown drive mode '{}', expected arcade or tank", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriveSettings {
    pub mode: DriveMode,
    pub max_speed: i32,
    /// Stick readings below this percentage count as centred.
    pub deadzone: i32,
    /// Speed caps in percent of `max_speed`, lowest first.
    pub gears: Vec<u8>,
    pub initial_gear: usize,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            mode: DriveMode::Arcade,
            max_speed: MAX_WHEEL_SPEED,
            deadzone: 8,
            gears: vec![25, 50, 75, 100],
            initial_gear: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Drive { left: i32, right: i32 },
    EmergencyStop,
    Armed,
    GearChanged { gear: usize, percent: u8 },
    ReportPower,
    Quit,
}

/// Turns controller events into rover actions.
#[derive(Debug)]
pub struct DriveController {
    settings: DriveSettings,
    left_x: i32,
    left_y: i32,
    right_x: i32,
    right_y: i32,
    left_trigger: i32,
    right_trigger: i32,
    gear: usize,
    armed: bool,
    last_drive: (i32, i32),
}

impl DriveController {
    pub fn new(settings: DriveSettings) -> Self {
        let gear = settings
            .initial_gear
            .min(settings.gears.len().saturating_sub(1));
        Self {
            settings,
            left_x: 0,
            left_y: 0,
            right_x: 0,
            right_y: 0,
            left_trigger: 0,
            right_trigger: 0,
            gear,
            armed: true,
            last_drive: (0, 0),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn gear(&self) -> usize {
        self.gear
    }

    pub fn gear_percent(&self) -> u8 {
        self.settings.gears.get(self.gear).copied().unwrap_or(100)
    }

    pub fn handle(&mut self, event: &InputEvent) -> Vec<Action> {
        match event {
            InputEvent::Abs {
                code,
                percentage: Some(pct),
                ..
            } => {
                let Some(axis) = AbsAxis::from_code(*code) else {
                    return Vec::new();
                };
                self.set_axis(axis, *pct);
                self.drive_action().into_iter().collect()
            }
            InputEvent::Abs { .. } => Vec::new(),
            InputEvent::Key { code, value: 1, .. } => match Button::from_code(*code) {
                Some(button) => self.press(button),
                None => Vec::new(),
            },
            InputEvent::Key { .. } => Vec::new(),
        }
    }

    fn set_axis(&mut self, axis: AbsAxis, pct: i32) {
        let pct = pct.clamp(-100, 100);
        match axis {
            AbsAxis::LeftX => self.left_x = pct,
            AbsAxis::LeftY => self.left_y = pct,
            AbsAxis::RightX => self.right_x = pct,
            AbsAxis::RightY => self.right_y = pct,
            AbsAxis::LeftTrigger => self.left_trigger = pct,
            AbsAxis::RightTrigger => self.right_trigger = pct,
        }
    }

    fn press(&mut self, button: Button) -> Vec<Action> {
        match button {
            Button::B => {
                self.armed = false;
                self.last_drive = (0, 0);
                vec![Action::EmergencyStop]
            }
            Button::Start if !self.armed => {
                self.armed = true;
                vec![Action::Armed]
            }
            Button::RightBumper => self.shift(1),
            Button::LeftBumper => self.shift(-1),
            Button::Back => vec![Action::ReportPower],
            Button::Guide => vec![Action::Quit],
            _ => Vec::new(),
        }
    }

    fn shift(&mut self, step: isize) -> Vec<Action> {
        let top = self.settings.gears.len().saturating_sub(1);
        let next = self.gear.saturating_add_signed(step).min(top);
        if next == self.gear {
            return Vec::new();
        }
        self.gear = next;

        let mut actions = vec![Action::GearChanged {
            gear: self.gear,
            percent: self.gear_percent(),
        }];
        actions.extend(self.drive_action());
        actions
    }

    fn drive_action(&mut self) -> Option<Action> {
        if !self.armed {
            return None;
        }
        let (left, right) = self.wheel_speeds();
        if (left, right) == self.last_drive {
            return None;
        }
        self.last_drive = (left, right);
        Some(Action::Drive { left, right })
    }

    /// Current wheel speeds in rover units (-255 ..= 255).
    pub fn wheel_speeds(&self) -> (i32, i32) {
        let (left, right) = match self.settings.mode {
            DriveMode::Arcade => {
                let throttle = self.right_trigger - self.left_trigger;
                // Stick X percentages read negative to the right.
                let steer = -self.deadzoned(self.left_x);
                (
                    (throttle + steer).clamp(-100, 100),
                    (throttle - steer).clamp(-100, 100),
                )
            }
            DriveMode::Tank => (self.deadzoned(self.left_y), self.deadzoned(self.right_y)),
        };
        (self.scale(left), self.scale(right))
    }

    fn deadzoned(&self, pct: i32) -> i32 {
        if pct.abs() < self.settings.deadzone {
            0
        } else {
            pct
        }
    }

    fn scale(&self, pct: i32) -> i32 {
        let cap = self.settings.max_speed as f64 * self.gear_percent() as f64 / 100.0;
        (pct as f64 / 100.0 * cap).round() as i32
    }
}
