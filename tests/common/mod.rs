#![allow(dead_code)]

use async_trait::async_trait;
use rover_pilot::core::{InputEvent, InputSource, Transport};
use rover_pilot::Result;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory rover link. Records every command and answers INA219
/// requests with `power` when set.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub written: Arc<Mutex<Vec<Value>>>,
    pub pending: Arc<Mutex<Vec<u8>>>,
    pub power: Arc<Mutex<Option<Value>>>,
    pub closed: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn with_power(power: Value) -> Self {
        let transport = Self::default();
        *transport.power.lock().unwrap() = Some(power);
        transport
    }

    pub fn commands(&self) -> Vec<Value> {
        self.written.lock().unwrap().clone()
    }

    pub fn commands_of_type(&self, t: i64) -> Vec<Value> {
        self.commands()
            .into_iter()
            .filter(|c| c["T"].as_i64() == Some(t))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let command: Value = serde_json::from_slice(data)?;
        if command["T"] == json!(70) {
            if let Some(power) = self.power.lock().unwrap().as_ref() {
                let mut pending = self.pending.lock().unwrap();
                pending.extend_from_slice(power.to_string().as_bytes());
                pending.extend_from_slice(b"\r\n");
            }
        }
        self.written.lock().unwrap().push(command);
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut *self.pending.lock().unwrap()))
    }

    async fn close(&mut self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

enum Step {
    Event(InputEvent),
    /// Not ready yet: the next poll returns `Pending` once.
    Pause,
}

/// Replays a fixed list of events, then either reports the device as
/// gone or stays silent forever.
pub struct ScriptedInput {
    steps: VecDeque<Step>,
    hold_open: bool,
}

impl ScriptedInput {
    /// One event per read, as if the user paused between inputs.
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self::paced(events, false)
    }

    pub fn held_open(events: Vec<InputEvent>) -> Self {
        Self::paced(events, true)
    }

    /// Every event is already queued when the session first reads.
    pub fn burst(events: Vec<InputEvent>) -> Self {
        Self {
            steps: events.into_iter().map(Step::Event).collect(),
            hold_open: false,
        }
    }

    fn paced(events: Vec<InputEvent>, hold_open: bool) -> Self {
        Self {
            steps: events
                .into_iter()
                .flat_map(|event| [Step::Pause, Step::Event(event)])
                .collect(),
            hold_open,
        }
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_event(&mut self) -> Result<Option<InputEvent>> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Event(event)) => return Ok(Some(event)),
                Some(Step::Pause) => tokio::task::yield_now().await,
                None if self.hold_open => std::future::pending().await,
                None => return Ok(None),
            }
        }
    }
}

pub fn axis(code: u16, percentage: i32) -> InputEvent {
    InputEvent::Abs {
        code,
        value: 0,
        percentage: Some(percentage),
    }
}

pub fn press(code: u16) -> InputEvent {
    InputEvent::Key {
        code,
        value: 1,
        name: String::new(),
    }
}

pub const RIGHT_TRIGGER: u16 = 5;
pub const LEFT_STICK_X: u16 = 0;
pub const BUTTON_B: u16 = 305;
pub const BUTTON_START: u16 = 315;
pub const BUTTON_BACK: u16 = 314;
pub const BUTTON_GUIDE: u16 = 316;
pub const BUMPER_RIGHT: u16 = 311;

pub fn power_reply(bus_v: f64) -> Value {
    json!({
        "T": 1010,
        "shunt_mV": 2.1,
        "load_V": bus_v,
        "bus_V": bus_v,
        "current_mA": 410.0,
        "power_mW": 4700.0
    })
}
