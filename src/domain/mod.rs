// Domain layer: protocol models and ports. No hardware crates in here.

pub mod model;
pub mod ports;
