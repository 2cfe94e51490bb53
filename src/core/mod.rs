pub mod drive;
pub mod rover;
pub mod session;
pub mod telemetry;

pub use crate::domain::model::{
    AbsAxis, AxisScale, Button, Command, InputEvent, PowerReading, PowerState,
};
pub use crate::domain::ports::{InputSource, Transport};
pub use crate::utils::error::Result;
