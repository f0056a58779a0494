//! # Servo Fleet Core
//!
//! Control core of a servo fleet adapter: it turns a list of joint
//! descriptors into a configured, enabled and homed set of motor nodes and
//! then exchanges commands and measurements with them once per control tick.
//!
//! # Module Structure
//!
//! - [`system`] - `ServoSystem`, the owner of the SDK handle and joint state
//! - [`lifecycle`] - configure / activate / deactivate / cleanup
//! - [`mode`] - control-mode negotiation (prepare / commit)
//! - [`cycle`] - real-time read / write
//! - [`topology`] - port identifier → port index, joint → node address
//! - [`units`] - user units ↔ encoder counts
//! - [`core`] - `FleetCore` runner and control loop
//! - [`driver_registry`] - SDK backend factory registration
//! - [`drivers`] - SDK backend implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      servo_hal (single crate)                    │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ fleet.toml  │───►│  FleetCore   │◄──►│   SDK Registry      │  │
//! │  │(servo_common)│   │ (ctrl loop)  │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │                                     │
//! │                            ▼                                     │
//! │                   ┌────────────────┐     ┌────────────────┐      │
//! │                   │  ServoSystem   │────►│   MotorSdk     │      │
//! │                   │ lifecycle/mode │     │ (trait object) │      │
//! │                   │ read/write     │     └────────────────┘      │
//! │                   └────────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod cycle;
pub mod driver_registry;
pub mod drivers;
pub mod lifecycle;
pub mod mode;
pub mod system;
pub mod topology;
pub mod units;

// Re-export key types for convenience
pub use crate::core::{FleetCore, TimingStats};
pub use crate::driver_registry::SdkRegistry;
pub use crate::lifecycle::Transition;
pub use crate::mode::PreparedSwitch;
pub use crate::system::ServoSystem;
pub use crate::topology::Topology;
pub use crate::units::UnitConversion;
