//! The servo system: one owner for the SDK handle and all per-joint state.
//!
//! `ServoSystem` holds the joint registry, topology, unit conversions,
//! control modes, command buffers and measured states. Its operations are
//! split by concern:
//!
//! - [`crate::lifecycle`] - configure / activate / deactivate / cleanup
//! - [`crate::mode`] - control-mode negotiation (prepare / commit)
//! - [`crate::cycle`] - the real-time read / write cycle
//!
//! All of them take `&mut self`, so the control framework's thread is the
//! only one touching hardware and joint state.

use crate::mode::PreparedSwitch;
use crate::topology::Topology;
use crate::units::UnitConversion;
use servo_common::consts::DEFAULT_POLL_INTERVAL;
use servo_common::hal::config::JointSpec;
use servo_common::hal::driver::MotorSdk;
use servo_common::hal::types::{
    CommandBuffer, ControlMode, InterfaceDescriptor, InterfaceKind, JointState, LifecycleState,
};
use std::time::Duration;
use tracing::{error, info};

/// Fleet of servo joints driven through one SDK handle.
///
/// `S` defaults to a boxed trait object; tests instantiate it with a concrete
/// mock to inspect the recorded SDK traffic through [`ServoSystem::sdk`].
pub struct ServoSystem<S: ?Sized + MotorSdk = dyn MotorSdk> {
    pub(crate) sdk: Box<S>,
    pub(crate) state: LifecycleState,
    pub(crate) specs: Vec<JointSpec>,
    pub(crate) topology: Topology,
    /// Filled by a successful activation, empty otherwise
    pub(crate) conversions: Vec<UnitConversion>,
    pub(crate) modes: Vec<ControlMode>,
    pub(crate) commands: Vec<CommandBuffer>,
    pub(crate) states: Vec<JointState>,
    pub(crate) prepared: Option<PreparedSwitch>,
    pub(crate) ports_open: bool,
    pub(crate) poll_interval: Duration,
}

impl<S: ?Sized + MotorSdk> ServoSystem<S> {
    /// Create an unconfigured system around an SDK handle.
    pub fn new(sdk: Box<S>) -> Self {
        Self {
            sdk,
            state: LifecycleState::Unconfigured,
            specs: Vec::new(),
            topology: Topology::default(),
            conversions: Vec::new(),
            modes: Vec::new(),
            commands: Vec::new(),
            states: Vec::new(),
            prepared: None,
            ports_open: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sleep between polls while waiting for enable or homing.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The SDK handle.
    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    /// The SDK handle, mutably.
    pub fn sdk_mut(&mut self) -> &mut S {
        &mut self.sdk
    }

    /// True while SDK ports are open.
    pub fn ports_open(&self) -> bool {
        self.ports_open
    }

    /// Number of configured joints.
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.specs.len()
    }

    /// Validated joint specs in logical order.
    pub fn joint_specs(&self) -> &[JointSpec] {
        &self.specs
    }

    /// Resolved port topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Logical index of a joint by name.
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    /// Unit conversion of a joint; `None` until activation succeeded.
    pub fn conversion(&self, joint: usize) -> Option<&UnitConversion> {
        self.conversions.get(joint)
    }

    /// Committed control mode of a joint.
    pub fn control_mode(&self, joint: usize) -> Option<ControlMode> {
        self.modes.get(joint).copied()
    }

    /// Command slots of a joint.
    pub fn command(&self, joint: usize) -> Option<&CommandBuffer> {
        self.commands.get(joint)
    }

    /// Command slots of a joint, for the controller writing setpoints.
    pub fn command_mut(&mut self, joint: usize) -> Option<&mut CommandBuffer> {
        self.commands.get_mut(joint)
    }

    /// Write a position setpoint [user units]. Returns false for an unknown joint.
    pub fn set_position_command(&mut self, joint: usize, position: f64) -> bool {
        self.command_mut(joint)
            .map(|cmd| cmd.position = position)
            .is_some()
    }

    /// Write a velocity setpoint [user units/s]. Returns false for an unknown joint.
    pub fn set_velocity_command(&mut self, joint: usize, velocity: f64) -> bool {
        self.command_mut(joint)
            .map(|cmd| cmd.velocity = velocity)
            .is_some()
    }

    /// Last measured state of a joint.
    pub fn joint_state(&self, joint: usize) -> Option<&JointState> {
        self.states.get(joint)
    }

    /// Exported state interfaces: position and velocity for every joint,
    /// effort for joints with a peak torque rating.
    pub fn state_interfaces(&self) -> Vec<InterfaceDescriptor> {
        let mut interfaces = Vec::with_capacity(self.specs.len() * 3);
        for spec in &self.specs {
            interfaces.push(descriptor(spec, InterfaceKind::Position));
            interfaces.push(descriptor(spec, InterfaceKind::Velocity));
            if spec.peak_torque.is_some() {
                interfaces.push(descriptor(spec, InterfaceKind::Effort));
            }
        }
        interfaces
    }

    /// Exported command interfaces: position and velocity for every joint.
    pub fn command_interfaces(&self) -> Vec<InterfaceDescriptor> {
        self.specs
            .iter()
            .flat_map(|spec| {
                [
                    descriptor(spec, InterfaceKind::Position),
                    descriptor(spec, InterfaceKind::Velocity),
                ]
            })
            .collect()
    }

    /// Drive the system back to Unconfigured, logging failures.
    ///
    /// Deactivates when Active or Inactive, then cleans up. A failed
    /// activation leaves nodes enabled in Inactive, so both states disable.
    /// Called on drop.
    pub fn shutdown(&mut self) {
        if self.state != LifecycleState::Unconfigured {
            if let Err(e) = self.deactivate() {
                error!("Deactivate during shutdown failed: {}", e);
            }
        }
        if self.state == LifecycleState::Inactive {
            if let Err(e) = self.cleanup() {
                error!("Cleanup during shutdown failed: {}", e);
            }
        }
        if self.state == LifecycleState::Unconfigured && !self.ports_open {
            info!("Servo system shut down");
        }
    }
}

impl<S: ?Sized + MotorSdk> Drop for ServoSystem<S> {
    fn drop(&mut self) {
        if self.state != LifecycleState::Unconfigured || self.ports_open {
            self.shutdown();
        }
    }
}

fn descriptor(spec: &JointSpec, kind: InterfaceKind) -> InterfaceDescriptor {
    InterfaceDescriptor {
        joint: spec.name.clone(),
        kind,
    }
}
