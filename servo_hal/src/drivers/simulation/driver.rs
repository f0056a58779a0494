//! Simulation SDK implementation.
//!
//! The `SimulatedSdk` implements the `MotorSdk` trait with software-emulated
//! ports and nodes so the fleet core can run without physical hardware.
//! Node models advance on the wall clock every time they are touched.

use super::node::{DEFAULT_RESOLUTION, NodeFlags, SimNode};
use servo_common::hal::driver::{MotorSdk, SdkError};
use servo_common::hal::types::{AccUnit, NodeAddress, NodeInfo, PortInfo, PortState, TrqUnit, VelUnit};
use std::time::Instant;
use tracing::{debug, info};

/// Nodes enumerated on each simulated port.
pub const DEFAULT_NODES_PER_PORT: usize = 16;

/// Port index outside the opened set.
pub const ERR_NO_PORT: u32 = 0x8000_0101;
/// Node index outside the port's node list.
pub const ERR_NO_NODE: u32 = 0x8000_0102;
/// Ports used before `open_ports`.
pub const ERR_PORTS_CLOSED: u32 = 0x8000_0103;
/// Motion or homing requested while the node is not ready.
pub const ERR_NOT_READY: u32 = 0x8000_0201;

/// Simulation backend implementing the MotorSdk trait.
pub struct SimulatedSdk {
    /// Port paths set before opening
    paths: Vec<String>,
    /// Simulated nodes per opened port
    ports: Vec<Vec<SimNode>>,
    /// Nodes created on each port at open
    nodes_per_port: usize,
    /// Encoder resolution of created nodes
    resolution: u32,
    /// Clock origin
    start_time: Instant,
}

impl SimulatedSdk {
    /// Create a simulation backend with default node count and resolution.
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            ports: Vec::new(),
            nodes_per_port: DEFAULT_NODES_PER_PORT,
            resolution: DEFAULT_RESOLUTION,
            start_time: Instant::now(),
        }
    }

    /// Number of nodes enumerated per port.
    pub fn with_nodes_per_port(mut self, nodes: usize) -> Self {
        self.nodes_per_port = nodes;
        self
    }

    /// Encoder resolution of every node [counts/rev].
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    /// True while ports are open.
    pub fn is_open(&self) -> bool {
        !self.ports.is_empty()
    }

    /// Path configured for a port.
    pub fn port_path(&self, port: usize) -> Option<&str> {
        self.paths.get(port).map(String::as_str)
    }

    /// Inspect a simulated node.
    pub fn node(&self, addr: NodeAddress) -> Option<&SimNode> {
        self.ports.get(addr.port)?.get(addr.node)
    }

    /// Raise or clear a bus power loss on a node.
    pub fn inject_bus_power_loss(&mut self, addr: NodeAddress, lost: bool) -> Result<(), SdkError> {
        info!("Simulated bus power {} at {}", if lost { "lost" } else { "restored" }, addr);
        self.node_mut(addr)?.set_flags(NodeFlags::BUS_POWER_LOSS, lost);
        Ok(())
    }

    /// Mark a node as having no homing set up.
    pub fn set_homing_configured(&mut self, addr: NodeAddress, configured: bool) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_flags(NodeFlags::HOMING_CONFIGURED, configured);
        Ok(())
    }

    fn now_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }

    fn node_mut(&mut self, addr: NodeAddress) -> Result<&mut SimNode, SdkError> {
        if self.ports.is_empty() {
            return Err(SdkError::new(addr, ERR_PORTS_CLOSED, "ports are not open"));
        }
        self.ports
            .get_mut(addr.port)
            .ok_or_else(|| SdkError::new(addr, ERR_NO_PORT, "no such port"))?
            .get_mut(addr.node)
            .ok_or_else(|| SdkError::new(addr, ERR_NO_NODE, "no such node"))
    }

    fn node_ref(&self, addr: NodeAddress) -> Result<&SimNode, SdkError> {
        if self.ports.is_empty() {
            return Err(SdkError::new(addr, ERR_PORTS_CLOSED, "ports are not open"));
        }
        self.ports
            .get(addr.port)
            .ok_or_else(|| SdkError::new(addr, ERR_NO_PORT, "no such port"))?
            .get(addr.node)
            .ok_or_else(|| SdkError::new(addr, ERR_NO_NODE, "no such node"))
    }

    /// Node advanced to the current time.
    fn node_now(&mut self, addr: NodeAddress) -> Result<&mut SimNode, SdkError> {
        let now = self.now_ms();
        let node = self.node_mut(addr)?;
        node.advance(now);
        Ok(node)
    }

    /// Node advanced to now that must be ready for motion.
    fn ready_node(&mut self, addr: NodeAddress) -> Result<&mut SimNode, SdkError> {
        let node = self.node_now(addr)?;
        if !node.flags().contains(NodeFlags::READY) {
            return Err(SdkError::new(addr, ERR_NOT_READY, "node is not ready"));
        }
        Ok(node)
    }
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorSdk for SimulatedSdk {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn set_port_path(&mut self, port: usize, path: &str) -> Result<(), SdkError> {
        if self.paths.len() <= port {
            self.paths.resize(port + 1, String::new());
        }
        self.paths[port] = path.to_string();
        debug!("Simulated port {} -> {}", port, path);
        Ok(())
    }

    fn open_ports(&mut self, count: usize) -> Result<(), SdkError> {
        if count > self.paths.len() {
            return Err(SdkError::new(
                NodeAddress::new(self.paths.len(), 0),
                ERR_NO_PORT,
                "port path not set",
            ));
        }
        let now = self.now_ms();
        self.ports = (0..count)
            .map(|port| {
                (0..self.nodes_per_port)
                    .map(|node| {
                        let serial = 100_000 + (port * 1_000 + node) as u32;
                        SimNode::new(serial, self.resolution, now)
                    })
                    .collect()
            })
            .collect();
        info!("Opened {} simulated port(s), {} node(s) each", count, self.nodes_per_port);
        Ok(())
    }

    fn close_ports(&mut self) -> Result<(), SdkError> {
        info!("Closing {} simulated port(s)", self.ports.len());
        self.ports.clear();
        Ok(())
    }

    fn port_info(&self, port: usize) -> Result<PortInfo, SdkError> {
        let addr = NodeAddress::new(port, 0);
        if self.ports.is_empty() {
            return Err(SdkError::new(addr, ERR_PORTS_CLOSED, "ports are not open"));
        }
        let nodes = self
            .ports
            .get(port)
            .ok_or_else(|| SdkError::new(addr, ERR_NO_PORT, "no such port"))?;
        Ok(PortInfo {
            net_number: port,
            open_state: PortState::Online,
            node_count: nodes.len(),
        })
    }

    fn timestamp_ms(&self) -> f64 {
        self.now_ms()
    }

    fn node_info(&self, addr: NodeAddress) -> Result<NodeInfo, SdkError> {
        Ok(self.node_ref(addr)?.info().clone())
    }

    fn clear_alerts(&mut self, addr: NodeAddress) -> Result<(), SdkError> {
        self.node_mut(addr)?.clear_alerts();
        Ok(())
    }

    fn clear_node_stop(&mut self, addr: NodeAddress) -> Result<(), SdkError> {
        self.node_mut(addr)?.clear_node_stop();
        Ok(())
    }

    fn set_enable_request(&mut self, addr: NodeAddress, enable: bool) -> Result<(), SdkError> {
        let now = self.now_ms();
        self.node_mut(addr)?.set_enable_request(enable, now);
        Ok(())
    }

    fn enable_request(&self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.node_ref(addr)?.flags().contains(NodeFlags::ENABLE_REQUESTED))
    }

    fn is_ready(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.node_now(addr)?.flags().contains(NodeFlags::READY))
    }

    fn bus_power_lost(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.node_now(addr)?.flags().contains(NodeFlags::BUS_POWER_LOSS))
    }

    fn homing_configured(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.node_mut(addr)?.flags().contains(NodeFlags::HOMING_CONFIGURED))
    }

    fn was_homed(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.node_now(addr)?.flags().contains(NodeFlags::HOMED))
    }

    fn initiate_homing(&mut self, addr: NodeAddress) -> Result<(), SdkError> {
        let now = self.now_ms();
        self.ready_node(addr)?.initiate_homing(now);
        Ok(())
    }

    fn parameter(&mut self, addr: NodeAddress, number: u16) -> Result<f64, SdkError> {
        Ok(self.node_mut(addr)?.parameter(number))
    }

    fn set_parameter(&mut self, addr: NodeAddress, number: u16, value: f64) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_parameter(number, value);
        Ok(())
    }

    fn positioning_resolution(&mut self, addr: NodeAddress) -> Result<u32, SdkError> {
        Ok(self.node_mut(addr)?.resolution())
    }

    fn set_acc_unit(&mut self, addr: NodeAddress, unit: AccUnit) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_acc_unit(unit);
        Ok(())
    }

    fn set_vel_unit(&mut self, addr: NodeAddress, unit: VelUnit) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_vel_unit(unit);
        Ok(())
    }

    fn set_trq_unit(&mut self, addr: NodeAddress, unit: TrqUnit) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_trq_unit(unit);
        Ok(())
    }

    fn set_vel_limit(&mut self, addr: NodeAddress, limit: f64) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_vel_limit(limit);
        Ok(())
    }

    fn set_acc_limit(&mut self, addr: NodeAddress, limit: f64) -> Result<(), SdkError> {
        self.node_mut(addr)?.set_acc_limit(limit);
        Ok(())
    }

    fn move_position_absolute(&mut self, addr: NodeAddress, counts: f64) -> Result<(), SdkError> {
        self.ready_node(addr)?.move_position(counts);
        Ok(())
    }

    fn move_velocity(&mut self, addr: NodeAddress, counts_per_sec: f64) -> Result<(), SdkError> {
        self.ready_node(addr)?.move_velocity(counts_per_sec);
        Ok(())
    }

    fn refresh_position(&mut self, addr: NodeAddress) -> Result<f64, SdkError> {
        Ok(self.node_now(addr)?.position())
    }

    fn refresh_velocity(&mut self, addr: NodeAddress) -> Result<f64, SdkError> {
        Ok(self.node_now(addr)?.velocity())
    }

    fn refresh_torque(&mut self, addr: NodeAddress) -> Result<f64, SdkError> {
        Ok(self.node_now(addr)?.torque_pct())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::node::ENABLE_DELAY_MS;
    use std::thread;
    use std::time::Duration;

    fn opened(ports: usize) -> SimulatedSdk {
        let mut sdk = SimulatedSdk::new().with_nodes_per_port(2);
        for port in 0..ports {
            sdk.set_port_path(port, &format!("/dev/sim{port}")).unwrap();
        }
        sdk.open_ports(ports).unwrap();
        sdk
    }

    #[test]
    fn calls_before_open_fail() {
        let mut sdk = SimulatedSdk::new();
        let err = sdk.clear_alerts(NodeAddress::new(0, 0)).unwrap_err();
        assert_eq!(err.code, ERR_PORTS_CLOSED);
        assert!(sdk.port_info(0).is_err());
    }

    #[test]
    fn open_requires_paths() {
        let mut sdk = SimulatedSdk::new();
        sdk.set_port_path(0, "/dev/sim0").unwrap();
        assert!(sdk.open_ports(2).is_err());
        assert!(sdk.open_ports(1).is_ok());
        assert_eq!(sdk.port_path(0), Some("/dev/sim0"));
    }

    #[test]
    fn port_info_reports_node_count() {
        let sdk = opened(2);
        let info = sdk.port_info(1).unwrap();
        assert_eq!(info.net_number, 1);
        assert_eq!(info.node_count, 2);
        assert_eq!(info.open_state, PortState::Online);
        assert_eq!(sdk.port_info(2).unwrap_err().code, ERR_NO_PORT);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let mut sdk = opened(1);
        let err = sdk.is_ready(NodeAddress::new(0, 5)).unwrap_err();
        assert_eq!(err.code, ERR_NO_NODE);
    }

    #[test]
    fn enable_then_ready() {
        let mut sdk = opened(1);
        let addr = NodeAddress::new(0, 1);
        sdk.set_enable_request(addr, true).unwrap();
        assert!(sdk.enable_request(addr).unwrap());
        thread::sleep(Duration::from_secs_f64(2.0 * ENABLE_DELAY_MS / 1000.0));
        assert!(sdk.is_ready(addr).unwrap());
    }

    #[test]
    fn motion_requires_ready_node() {
        let mut sdk = opened(1);
        let addr = NodeAddress::new(0, 0);
        let err = sdk.move_velocity(addr, 100.0).unwrap_err();
        assert_eq!(err.code, ERR_NOT_READY);
    }

    #[test]
    fn injected_power_loss_is_visible() {
        let mut sdk = opened(1);
        let addr = NodeAddress::new(0, 0);
        sdk.inject_bus_power_loss(addr, true).unwrap();
        assert!(sdk.bus_power_lost(addr).unwrap());
        sdk.inject_bus_power_loss(addr, false).unwrap();
        assert!(!sdk.bus_power_lost(addr).unwrap());
    }

    #[test]
    fn close_drops_nodes() {
        let mut sdk = opened(1);
        assert!(sdk.is_open());
        sdk.close_ports().unwrap();
        assert!(!sdk.is_open());
        assert!(sdk.node(NodeAddress::new(0, 0)).is_none());
    }
}
