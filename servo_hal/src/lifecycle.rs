//! Lifecycle transitions of the servo system.
//!
//! ```text
//!                configure             activate
//!  Unconfigured ──────────► Inactive ──────────► Active
//!       ▲                    │   ▲                 │
//!       └────── cleanup ─────┘   └─── deactivate ──┘
//! ```
//!
//! Configure validates the joint registry and resolves the port topology.
//! Activate opens the ports, enables and optionally homes every node, pushes
//! units and limits and fixes the unit conversions. Deactivate disables all
//! nodes but keeps the ports open. Cleanup closes the ports and drops the
//! registry.

use crate::system::ServoSystem;
use crate::topology::Topology;
use crate::units::UnitConversion;
use servo_common::consts::{ENABLE_TIMEOUT_MS, HOMING_TIMEOUT_MS, PARAM_INTERRUPTING_MOVES};
use servo_common::hal::config::{HomingPolicy, JointDescriptor, JointSpec, parse_joint_specs};
use servo_common::hal::driver::{HalError, MotorSdk, SdkError};
use servo_common::hal::types::{
    AccUnit, CommandBuffer, JointState, LifecycleState, NodeAddress, TrqUnit, VelUnit,
};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle transition requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Unconfigured → Inactive
    Configure,
    /// Inactive → Active
    Activate,
    /// Active → Inactive (also accepted in Inactive)
    Deactivate,
    /// Inactive → Unconfigured
    Cleanup,
}

impl Transition {
    /// Transition name used in errors and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Cleanup => "cleanup",
        }
    }

    /// Target state when requested from `from`, `None` if not permitted.
    pub const fn target(&self, from: LifecycleState) -> Option<LifecycleState> {
        use LifecycleState::*;
        match (from, self) {
            (Unconfigured, Self::Configure) => Some(Inactive),
            (Inactive, Self::Activate) => Some(Active),
            (Active | Inactive, Self::Deactivate) => Some(Inactive),
            (Inactive, Self::Cleanup) => Some(Unconfigured),
            _ => None,
        }
    }
}

impl<S: ?Sized + MotorSdk> ServoSystem<S> {
    fn check_transition(&self, transition: Transition) -> Result<LifecycleState, HalError> {
        transition.target(self.state).ok_or_else(|| {
            warn!("Rejected {} in state {}", transition.name(), self.state);
            HalError::InvalidTransition {
                from: self.state,
                transition: transition.name(),
            }
        })
    }

    /// Validate the joint descriptors and resolve the topology.
    ///
    /// On failure nothing is stored and the system stays Unconfigured.
    pub fn configure(&mut self, descriptors: &[JointDescriptor]) -> Result<(), HalError> {
        let next = self.check_transition(Transition::Configure)?;

        let specs = parse_joint_specs(descriptors).inspect_err(|e| error!("Configure failed: {}", e))?;
        let topology = Topology::resolve(&specs);

        for (spec, addr) in specs.iter().zip(topology.addresses()) {
            debug!(
                "Joint {} '{}': port '{}' → {}, homing {:?}{}",
                spec.index,
                spec.name,
                spec.port,
                addr,
                spec.homing,
                if spec.read_only { ", read-only" } else { "" }
            );
        }
        info!(
            "Configured {} joint(s) on {} port(s)",
            specs.len(),
            topology.port_count()
        );

        let n = specs.len();
        self.modes = specs.iter().map(|spec| spec.initial_mode).collect();
        self.commands = vec![CommandBuffer::UNSET; n];
        self.states = vec![JointState::default(); n];
        self.conversions.clear();
        self.prepared = None;
        self.specs = specs;
        self.topology = topology;
        self.state = next;
        Ok(())
    }

    /// Open the ports and bring every node to a ready, configured state.
    ///
    /// On failure the system stays Inactive without conversions. Ports that
    /// were opened stay open until cleanup.
    pub fn activate(&mut self) -> Result<(), HalError> {
        let next = self.check_transition(Transition::Activate)?;

        match self.activate_nodes() {
            Ok(conversions) => {
                self.conversions = conversions;
                self.states.fill(JointState::default());
                self.state = next;
                info!("Activated {} joint(s)", self.specs.len());
                Ok(())
            }
            Err(e) => {
                self.conversions.clear();
                error!("Activate failed: {}", e);
                Err(e)
            }
        }
    }

    /// Disable every node. Ports stay open.
    ///
    /// Every node is asked to disable even when an earlier one fails; the
    /// system ends Inactive and the first failure is returned.
    pub fn deactivate(&mut self) -> Result<(), HalError> {
        let next = self.check_transition(Transition::Deactivate)?;

        let mut first_error = None;
        if self.ports_open {
            for &addr in self.topology.addresses() {
                if let Err(e) = self.sdk.set_enable_request(addr, false) {
                    error!("Failed to disable node at {}: {}", addr, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        self.state = next;
        info!("Deactivated {} joint(s)", self.specs.len());

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Close the ports and drop the registry.
    ///
    /// When closing fails the system stays Inactive so cleanup can be retried.
    pub fn cleanup(&mut self) -> Result<(), HalError> {
        let next = self.check_transition(Transition::Cleanup)?;

        if self.ports_open {
            self.sdk
                .close_ports()
                .inspect_err(|e| error!("Failed to close ports: {}", e))?;
            self.ports_open = false;
            info!("Closed {} port(s)", self.topology.port_count());
        }

        self.specs.clear();
        self.topology = Topology::default();
        self.conversions.clear();
        self.modes.clear();
        self.commands.clear();
        self.states.clear();
        self.prepared = None;
        self.state = next;
        info!("Cleaned up");
        Ok(())
    }

    fn activate_nodes(&mut self) -> Result<Vec<UnitConversion>, HalError> {
        self.open_ports()?;

        let Self {
            sdk,
            specs,
            topology,
            poll_interval,
            ..
        } = self;
        specs
            .iter()
            .zip(topology.addresses())
            .map(|(spec, &addr)| activate_joint(&mut **sdk, spec, addr, *poll_interval))
            .collect()
    }

    fn open_ports(&mut self) -> Result<(), HalError> {
        let count = self.topology.port_count();
        if !self.ports_open {
            for (idx, path) in self.topology.ports().iter().enumerate() {
                self.sdk.set_port_path(idx, path)?;
            }
            if let Err(e) = self.sdk.open_ports(count) {
                if let Err(close) = self.sdk.close_ports() {
                    warn!("Closing ports after failed open: {}", close);
                }
                return Err(e.into());
            }
            self.ports_open = true;
            info!("Opened {} port(s)", count);
        }

        for (idx, path) in self.topology.ports().iter().enumerate() {
            let port = self.sdk.port_info(idx)?;
            info!(
                "Port {} '{}': net {}, state {:?}, {} node(s)",
                idx, path, port.net_number, port.open_state, port.node_count
            );
        }
        Ok(())
    }
}

/// Enable, home and configure one node; returns its unit conversion.
fn activate_joint<S: ?Sized + MotorSdk>(
    sdk: &mut S,
    spec: &JointSpec,
    addr: NodeAddress,
    poll: Duration,
) -> Result<UnitConversion, HalError> {
    let node = sdk.node_info(addr)?;
    info!(
        "Joint '{}' at {}: {} model {} serial {} fw {} id '{}'",
        spec.name,
        addr,
        node.node_type,
        node.model,
        node.serial_number,
        node.firmware_version,
        node.user_id
    );

    sdk.clear_alerts(addr)?;
    sdk.clear_node_stop(addr)?;
    sdk.set_enable_request(addr, true)?;
    if !wait_until(sdk, ENABLE_TIMEOUT_MS, poll, |sdk| sdk.is_ready(addr))? {
        return Err(timeout_fault(sdk, addr, HalError::EnableTimeout { addr }));
    }
    debug!("Node at {} ready", addr);

    home_joint(sdk, spec, addr, poll)?;

    sdk.set_parameter(addr, PARAM_INTERRUPTING_MOVES, 1.0)?;

    let resolution = sdk.positioning_resolution(addr)?;
    if resolution == 0 {
        return Err(HalError::ConfigError(format!(
            "node at {addr} reports zero positioning resolution"
        )));
    }
    let conversion = UnitConversion::new(spec, resolution);

    sdk.set_acc_unit(addr, AccUnit::CountsPerSec2)?;
    sdk.set_vel_unit(addr, VelUnit::CountsPerSec)?;
    sdk.set_trq_unit(addr, TrqUnit::PctMax)?;

    let vel_limit = conversion.to_counts(spec.vel_limit);
    let acc_limit = conversion.to_counts(spec.acc_limit);
    sdk.set_vel_limit(addr, vel_limit)?;
    sdk.set_acc_limit(addr, acc_limit)?;
    info!(
        "Joint '{}': {} counts/rev, {:.4} counts/unit, vel limit {:.1} counts/s, acc limit {:.1} counts/s²",
        spec.name,
        resolution,
        conversion.counts_per_unit(),
        vel_limit,
        acc_limit
    );

    if spec.read_only {
        info!("Joint '{}' is read-only, disabling node", spec.name);
        sdk.set_enable_request(addr, false)?;
    }

    Ok(conversion)
}

fn home_joint<S: ?Sized + MotorSdk>(
    sdk: &mut S,
    spec: &JointSpec,
    addr: NodeAddress,
    poll: Duration,
) -> Result<(), HalError> {
    if spec.homing == HomingPolicy::Skip {
        return Ok(());
    }
    if !sdk.homing_configured(addr)? {
        warn!(
            "Joint '{}' at {} has no homing set up, skipping homing",
            spec.name, addr
        );
        return Ok(());
    }
    if spec.homing == HomingPolicy::HomeIfNotHomed && sdk.was_homed(addr)? {
        let counts = sdk.refresh_position(addr)?;
        info!(
            "Joint '{}' already homed, position {:.0} counts",
            spec.name, counts
        );
        return Ok(());
    }

    info!("Homing joint '{}' at {}", spec.name, addr);
    sdk.initiate_homing(addr)?;
    if !wait_until(sdk, HOMING_TIMEOUT_MS, poll, |sdk| sdk.was_homed(addr))? {
        return Err(timeout_fault(sdk, addr, HalError::HomingTimeout { addr }));
    }
    info!("Joint '{}' homed", spec.name);
    Ok(())
}

/// Poll `done` until it holds or `timeout_ms` of SDK time has elapsed.
///
/// Returns `Ok(false)` on expiry.
fn wait_until<S, F>(sdk: &mut S, timeout_ms: f64, poll: Duration, mut done: F) -> Result<bool, SdkError>
where
    S: ?Sized + MotorSdk,
    F: FnMut(&mut S) -> Result<bool, SdkError>,
{
    let deadline = sdk.timestamp_ms() + timeout_ms;
    loop {
        if done(sdk)? {
            return Ok(true);
        }
        if sdk.timestamp_ms() > deadline {
            return Ok(false);
        }
        if !poll.is_zero() {
            thread::sleep(poll);
        }
    }
}

/// A wait expired: report bus power loss if the node says so, `timeout` otherwise.
fn timeout_fault<S: ?Sized + MotorSdk>(sdk: &mut S, addr: NodeAddress, timeout: HalError) -> HalError {
    match sdk.bus_power_lost(addr) {
        Ok(true) => HalError::BusPowerLoss { addr },
        Ok(false) => timeout,
        Err(e) => e.into(),
    }
}
