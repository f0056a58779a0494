//! Simulation SDK backend.
//!
//! This module provides software-emulated ports and nodes for development
//! and testing without physical hardware.

mod driver;
mod node;

pub use driver::{DEFAULT_NODES_PER_PORT, ERR_NO_NODE, ERR_NO_PORT, ERR_NOT_READY, ERR_PORTS_CLOSED, SimulatedSdk};
pub use node::{DEFAULT_RESOLUTION, ENABLE_DELAY_MS, HOMING_DURATION_MS, NodeFlags, SimNode};

use servo_common::hal::driver::MotorSdk;

/// Factory function to create a simulation backend instance.
pub fn create_sdk() -> Box<dyn MotorSdk> {
    Box::new(SimulatedSdk::new())
}
