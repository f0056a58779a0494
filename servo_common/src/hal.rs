//! Joint configuration, data model and motor SDK boundary.
//!
//! - [`config`] - fleet file and the joint configuration registry
//! - [`driver`] - `MotorSdk` capability trait and error taxonomy
//! - [`types`] - addresses, control modes, command/state buffers

pub mod config;
pub mod driver;
pub mod types;
