//! Prelude module for common re-exports.
//!
//! ```rust
//! use servo_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::hal::config::{FleetConfig, HomingPolicy, JointDescriptor, JointSpec, parse_joint_specs};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, ENABLE_TIMEOUT_MS, HOMING_TIMEOUT_MS, MAX_JOINTS};

// ─── SDK boundary ───────────────────────────────────────────────────
pub use crate::hal::driver::{HalError, MotorSdk, SdkError, SdkFactory};

// ─── Data model ─────────────────────────────────────────────────────
pub use crate::hal::types::{
    CommandBuffer, ControlMode, InterfaceDescriptor, InterfaceKind, JointState, LifecycleState,
    NodeAddress,
};
