//! Motor SDK backends.
//!
//! - [`simulation`] - Software simulation backend for development and testing
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `MotorSdk` trait from `servo_common::hal::driver`
//! 3. Register the factory in [`register_all_backends`]

pub mod simulation;

use crate::driver_registry::SdkRegistry;

/// Register all built-in SDK backends.
pub fn register_all_backends(registry: &mut SdkRegistry) {
    registry.register("simulation", simulation::create_sdk);
}
