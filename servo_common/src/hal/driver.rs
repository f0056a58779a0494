//! Motor SDK boundary and error types.
//!
//! This module defines:
//! - `MotorSdk` trait - the narrow synchronous capability set the core uses
//! - `SdkError` - failure signalled by the SDK (node address, code, message)
//! - `HalError` enum - error taxonomy of the fleet core
//! - `SdkFactory` type alias - factory function type for SDK backends

use crate::hal::types::{AccUnit, LifecycleState, NodeAddress, NodeInfo, PortInfo, TrqUnit, VelUnit};
use thiserror::Error;

/// Failure reported by the motor control SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SDK error at {addr}: code=0x{code:08x}: {message}")]
pub struct SdkError {
    /// Node (or port, node 0) the failure refers to
    pub addr: NodeAddress,
    /// Vendor error code
    pub code: u32,
    /// Human-readable message
    pub message: String,
}

impl SdkError {
    /// Create a new SDK error.
    pub fn new(addr: NodeAddress, code: u32, message: impl Into<String>) -> Self {
        Self {
            addr,
            code,
            message: message.into(),
        }
    }
}

/// Error types for fleet operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// A required joint parameter is missing
    #[error("Missing parameters in configuration for joint '{joint}'")]
    MissingParameters {
        /// Offending joint
        joint: String,
    },

    /// Homing policy outside 0..=2
    #[error("Homing parameter for joint '{joint}' must be 0, 1 or 2 (got '{value}')")]
    InvalidHoming {
        /// Offending joint
        joint: String,
        /// Raw parameter value
        value: String,
    },

    /// Parameter present but not parseable
    #[error("Invalid value '{value}' for parameter '{key}' of joint '{joint}'")]
    InvalidParameter {
        /// Offending joint
        joint: String,
        /// Parameter key
        key: &'static str,
        /// Raw parameter value
        value: String,
    },

    /// Other configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Lifecycle transition not allowed from the current state
    #[error("Invalid lifecycle transition '{transition}' from state {from}")]
    InvalidTransition {
        /// State the request was made in
        from: LifecycleState,
        /// Requested transition
        transition: &'static str,
    },

    /// Rejected command interface combination
    #[error("Command mode switch rejected: {0}")]
    Negotiation(String),

    /// Node did not report ready within the enable timeout
    #[error("Timed out waiting for node at {addr} to enable")]
    EnableTimeout {
        /// Node address
        addr: NodeAddress,
    },

    /// Node did not finish homing within the homing timeout
    #[error("Node at {addr} did not complete homing")]
    HomingTimeout {
        /// Node address
        addr: NodeAddress,
    },

    /// Timeout expired while the node reported bus power loss
    #[error("Bus power low at {addr}")]
    BusPowerLoss {
        /// Node address
        addr: NodeAddress,
    },

    /// Read/write requested outside the Active state
    #[error("I/O cycle requires Active state (current: {0})")]
    NotActive(LifecycleState),

    /// Failure signalled by the SDK
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// SDK backend not found in the registry
    #[error("SDK backend not found: {0}")]
    DriverNotFound(String),
}

impl HalError {
    /// True for errors detected while validating static configuration
    /// or requesting an invalid lifecycle transition.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameters { .. }
                | Self::InvalidHoming { .. }
                | Self::InvalidParameter { .. }
                | Self::ConfigError(_)
                | Self::InvalidTransition { .. }
        )
    }

    /// True for the power-fault signal (timeout with bus power loss).
    pub fn is_power_fault(&self) -> bool {
        matches!(self, Self::BusPowerLoss { .. })
    }

    /// True for generic enable/homing timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::EnableTimeout { .. } | Self::HomingTimeout { .. })
    }
}

/// Factory function type for creating SDK backend instances.
pub type SdkFactory = fn() -> Box<dyn MotorSdk>;

/// Capability set consumed from the motor control SDK.
///
/// Every call is synchronous. Port-level calls use node index 0 in the
/// address of any `SdkError` they return.
///
/// # Timing Contracts
///
/// | Group | Used during | RT Constraint |
/// |-------|-------------|---------------|
/// | transport, enable, homing, parameters, units, limits | Activate / Deactivate / Cleanup | None |
/// | measurement, motion | Read / Write | **HARD** (must not block) |
pub trait MotorSdk: Send {
    /// Returns the backend's identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    // ─── Transport ──────────────────────────────────────────────────

    /// Register the transport path of port `port` before opening.
    fn set_port_path(&mut self, port: usize, path: &str) -> Result<(), SdkError>;

    /// Open the first `count` registered ports.
    fn open_ports(&mut self, count: usize) -> Result<(), SdkError>;

    /// Close every open port.
    fn close_ports(&mut self) -> Result<(), SdkError>;

    /// Operational state of an opened port.
    fn port_info(&self, port: usize) -> Result<PortInfo, SdkError>;

    /// Monotonic SDK clock in milliseconds.
    fn timestamp_ms(&self) -> f64;

    // ─── Per node ───────────────────────────────────────────────────

    /// Identity data of a node.
    fn node_info(&self, addr: NodeAddress) -> Result<NodeInfo, SdkError>;

    /// Clear latched alerts / faults.
    fn clear_alerts(&mut self, addr: NodeAddress) -> Result<(), SdkError>;

    /// Clear an outstanding node-stop condition.
    fn clear_node_stop(&mut self, addr: NodeAddress) -> Result<(), SdkError>;

    /// Assert or de-assert the enable request.
    fn set_enable_request(&mut self, addr: NodeAddress, enable: bool) -> Result<(), SdkError>;

    /// Current enable request.
    fn enable_request(&self, addr: NodeAddress) -> Result<bool, SdkError>;

    /// True when the node is enabled and ready for motion.
    fn is_ready(&mut self, addr: NodeAddress) -> Result<bool, SdkError>;

    /// Bus-power-loss indicator.
    fn bus_power_lost(&mut self, addr: NodeAddress) -> Result<bool, SdkError>;

    // ─── Homing ─────────────────────────────────────────────────────

    /// True when a homing procedure is set up on the node.
    fn homing_configured(&mut self, addr: NodeAddress) -> Result<bool, SdkError>;

    /// True when the node has been homed since power-up.
    fn was_homed(&mut self, addr: NodeAddress) -> Result<bool, SdkError>;

    /// Start the node's homing procedure.
    fn initiate_homing(&mut self, addr: NodeAddress) -> Result<(), SdkError>;

    // ─── Parameters ─────────────────────────────────────────────────

    /// Read a numbered node parameter.
    fn parameter(&mut self, addr: NodeAddress, number: u16) -> Result<f64, SdkError>;

    /// Write a numbered node parameter.
    fn set_parameter(&mut self, addr: NodeAddress, number: u16, value: f64) -> Result<(), SdkError>;

    /// Encoder counts per motor revolution.
    fn positioning_resolution(&mut self, addr: NodeAddress) -> Result<u32, SdkError>;

    // ─── Units and limits ───────────────────────────────────────────

    /// Set the working acceleration unit.
    fn set_acc_unit(&mut self, addr: NodeAddress, unit: AccUnit) -> Result<(), SdkError>;

    /// Set the working velocity unit.
    fn set_vel_unit(&mut self, addr: NodeAddress, unit: VelUnit) -> Result<(), SdkError>;

    /// Set the working torque unit.
    fn set_trq_unit(&mut self, addr: NodeAddress, unit: TrqUnit) -> Result<(), SdkError>;

    /// Set the velocity limit in the working velocity unit.
    fn set_vel_limit(&mut self, addr: NodeAddress, limit: f64) -> Result<(), SdkError>;

    /// Set the acceleration limit in the working acceleration unit.
    fn set_acc_limit(&mut self, addr: NodeAddress, limit: f64) -> Result<(), SdkError>;

    // ─── Motion ─────────────────────────────────────────────────────

    /// Start an absolute position move to `counts`.
    fn move_position_absolute(&mut self, addr: NodeAddress, counts: f64) -> Result<(), SdkError>;

    /// Start a velocity move at `counts_per_sec`.
    fn move_velocity(&mut self, addr: NodeAddress, counts_per_sec: f64) -> Result<(), SdkError>;

    // ─── Measurement ────────────────────────────────────────────────

    /// Refresh and read the measured position [counts].
    fn refresh_position(&mut self, addr: NodeAddress) -> Result<f64, SdkError>;

    /// Refresh and read the measured velocity [counts/s].
    fn refresh_velocity(&mut self, addr: NodeAddress) -> Result<f64, SdkError>;

    /// Refresh and read the measured torque [% of max].
    fn refresh_torque(&mut self, addr: NodeAddress) -> Result<f64, SdkError>;
}
