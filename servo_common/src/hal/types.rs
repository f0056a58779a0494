//! Fleet data model types.
//!
//! This module defines the data exchanged between the lifecycle, the
//! mode negotiator and the real-time I/O cycle:
//! - `NodeAddress` - (port index, node index) of one actuator
//! - `ControlMode` / `LifecycleState` - state machine values
//! - `CommandBuffer` / `JointState` - per-joint command and measurement slots
//! - `PortInfo` / `NodeInfo` - identity data reported by the SDK
//! - `InterfaceKind` / `InterfaceDescriptor` - exported interface names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical address of one node on the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeAddress {
    /// Zero-based port index (first-seen order of port identifiers)
    pub port: usize,
    /// Node index within the port chain
    pub node: usize,
}

impl NodeAddress {
    /// Create an address from its two indices.
    pub const fn new(port: usize, node: usize) -> Self {
        Self { port, node }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port {} node {}", self.port, self.node)
    }
}

/// Command mode of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ControlMode {
    /// Nothing is commanding the joint; writes are skipped.
    #[default]
    Undefined = 0,
    /// Absolute position moves.
    Position = 1,
    /// Velocity moves.
    Velocity = 2,
}

impl ControlMode {
    /// Parse the `initial_mode` joint parameter.
    pub fn from_param(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "undefined" | "none" => Some(Self::Undefined),
            "position" => Some(Self::Position),
            "velocity" => Some(Self::Velocity),
            _ => None,
        }
    }
}

/// Global lifecycle state of the joint set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// No configuration loaded.
    #[default]
    Unconfigured,
    /// Configured, nodes not enabled.
    Inactive,
    /// Nodes enabled; the I/O cycle may tick.
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "Unconfigured",
            Self::Inactive => "Inactive",
            Self::Active => "Active",
        };
        f.write_str(name)
    }
}

/// Per-joint command slots in user units. NaN means "unset"; any
/// non-finite value is never dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandBuffer {
    /// Position command (user units)
    pub position: f64,
    /// Velocity command (user units / s)
    pub velocity: f64,
}

impl CommandBuffer {
    /// Both slots unset.
    pub const UNSET: Self = Self {
        position: f64::NAN,
        velocity: f64::NAN,
    };

    /// Reset both slots to unset.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::UNSET;
    }

    /// Position command, if set to a finite value.
    #[inline]
    pub fn position_command(&self) -> Option<f64> {
        self.position.is_finite().then_some(self.position)
    }

    /// Velocity command, if set to a finite value.
    #[inline]
    pub fn velocity_command(&self) -> Option<f64> {
        self.velocity.is_finite().then_some(self.velocity)
    }

    /// True when neither slot holds a usable value.
    #[inline]
    pub fn is_unset(&self) -> bool {
        !self.position.is_finite() && !self.velocity.is_finite()
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Per-joint measured state in user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointState {
    /// Measured position (NaN until the first read)
    pub position: f64,
    /// Measured velocity (NaN until the first read)
    pub velocity: f64,
    /// Measured effort; `None` when the joint has no peak torque rating
    /// or has not been read yet.
    pub effort: Option<f64>,
}

impl Default for JointState {
    fn default() -> Self {
        Self {
            position: f64::NAN,
            velocity: f64::NAN,
            effort: None,
        }
    }
}

/// Operational state of a transport port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortState {
    /// State cannot be determined
    #[default]
    Unknown,
    /// Port is closed
    Closed,
    /// Port is opening / enumerating nodes
    Opening,
    /// Port is open and nodes are online
    Online,
    /// Port is open but lost its nodes
    Offline,
}

/// Port status reported after opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortInfo {
    /// Network number assigned by the SDK
    pub net_number: usize,
    /// Operational state
    pub open_state: PortState,
    /// Number of nodes found on the port
    pub node_count: usize,
}

/// Node identity, logged when the node is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfo {
    /// Hardware family
    pub node_type: String,
    /// User-assigned identifier
    pub user_id: String,
    /// Firmware version string
    pub firmware_version: String,
    /// Serial number
    pub serial_number: u32,
    /// Model string
    pub model: String,
}

/// Acceleration unit of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccUnit {
    /// Revolutions / minute / second
    #[default]
    RpmPerSec,
    /// Counts / second²
    CountsPerSec2,
}

/// Velocity unit of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VelUnit {
    /// Revolutions / minute
    #[default]
    Rpm,
    /// Counts / second
    CountsPerSec,
}

/// Torque unit of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrqUnit {
    /// Percentage of drive maximum
    #[default]
    PctMax,
    /// Drive delivery amps
    Amps,
}

/// Kind of an exported state or command interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// Position (user units)
    Position,
    /// Velocity (user units / s)
    Velocity,
    /// Effort (torque or force)
    Effort,
}

impl InterfaceKind {
    /// Interface name as used in `"<joint>/<interface>"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Effort => "effort",
        }
    }

    /// Parse an interface name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "position" => Some(Self::Position),
            "velocity" => Some(Self::Velocity),
            "effort" => Some(Self::Effort),
            _ => None,
        }
    }
}

/// One exported interface of one joint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    /// Joint name
    pub joint: String,
    /// Interface kind
    pub kind: InterfaceKind,
}

impl InterfaceDescriptor {
    /// Full interface name, e.g. `joint1/position`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.joint, self.kind.as_str())
    }
}
