//! Scripted in-memory `MotorSdk` shared by the integration tests.
//!
//! Records every mutating call into a shared log (still readable after the
//! system owning the mock is dropped), advances its millisecond clock by a
//! fixed step per reading, and exposes per-node fault switches.

#![allow(dead_code)]

use servo_common::hal::config::JointDescriptor;
use servo_common::hal::driver::{MotorSdk, SdkError};
use servo_common::hal::types::{AccUnit, NodeAddress, NodeInfo, PortInfo, PortState, TrqUnit, VelUnit};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Error code returned for node calls while ports are closed.
pub const ERR_CLOSED: u32 = 0x0000_0001;
/// Error code returned by injected failures.
pub const ERR_INJECTED: u32 = 0x0000_00ff;

/// Mutating SDK call, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetPortPath(usize, String),
    OpenPorts(usize),
    ClosePorts,
    ClearAlerts(NodeAddress),
    ClearNodeStop(NodeAddress),
    Enable(NodeAddress, bool),
    InitiateHoming(NodeAddress),
    SetParameter(NodeAddress, u16, f64),
    AccUnit(NodeAddress, AccUnit),
    VelUnit(NodeAddress, VelUnit),
    TrqUnit(NodeAddress, TrqUnit),
    VelLimit(NodeAddress, f64),
    AccLimit(NodeAddress, f64),
    MovePosition(NodeAddress, f64),
    MoveVelocity(NodeAddress, f64),
}

impl Call {
    pub fn is_move(&self) -> bool {
        matches!(self, Call::MovePosition(..) | Call::MoveVelocity(..))
    }
}

/// Shared call log.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|&c| pred(c)).count()
    }

    pub fn moves(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_move).collect()
    }

    /// Calls addressed to one node, in order.
    pub fn for_node(&self, addr: NodeAddress) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::ClearAlerts(a)
                | Call::ClearNodeStop(a)
                | Call::Enable(a, _)
                | Call::InitiateHoming(a)
                | Call::SetParameter(a, ..)
                | Call::AccUnit(a, _)
                | Call::VelUnit(a, _)
                | Call::TrqUnit(a, _)
                | Call::VelLimit(a, _)
                | Call::AccLimit(a, _)
                | Call::MovePosition(a, _)
                | Call::MoveVelocity(a, _) => *a == addr,
                _ => false,
            })
            .collect()
    }
}

/// Scripted node behavior and readings.
#[derive(Debug, Clone)]
pub struct MockNode {
    /// Enable request makes the node ready
    pub becomes_ready: bool,
    pub bus_power_lost: bool,
    pub homing_configured: bool,
    pub homed: bool,
    /// Initiating homing completes it
    pub homing_completes: bool,
    /// Initiating homing drops bus power
    pub loses_power_on_homing: bool,
    pub resolution: u32,
    pub enabled: bool,
    pub position_counts: f64,
    pub velocity_counts: f64,
    pub torque_pct: f64,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            becomes_ready: true,
            bus_power_lost: false,
            homing_configured: true,
            homed: false,
            homing_completes: true,
            loses_power_on_homing: false,
            resolution: 6400,
            enabled: false,
            position_counts: 0.0,
            velocity_counts: 0.0,
            torque_pct: 0.0,
        }
    }
}

/// In-memory SDK.
pub struct MockSdk {
    log: CallLog,
    clock: Cell<f64>,
    clock_step_ms: f64,
    template: MockNode,
    nodes: HashMap<NodeAddress, MockNode>,
    ports_open: bool,
    pub fail_open: bool,
    pub fail_moves: bool,
    pub fail_refresh: bool,
}

impl MockSdk {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            clock: Cell::new(0.0),
            clock_step_ms: 10.0,
            template: MockNode::default(),
            nodes: HashMap::new(),
            ports_open: false,
            fail_open: false,
            fail_moves: false,
            fail_refresh: false,
        }
    }

    /// Handle on the call log.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Record into an existing log, for mocks built by an SDK factory.
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Behavior of every node not configured explicitly.
    pub fn with_template(mut self, template: MockNode) -> Self {
        self.template = template;
        self
    }

    /// Script one node.
    pub fn with_node(mut self, addr: NodeAddress, node: MockNode) -> Self {
        self.nodes.insert(addr, node);
        self
    }

    /// Script or inspect one node after construction.
    pub fn node_mut(&mut self, addr: NodeAddress) -> &mut MockNode {
        let template = &self.template;
        self.nodes.entry(addr).or_insert_with(|| template.clone())
    }

    pub fn node(&self, addr: NodeAddress) -> MockNode {
        self.nodes.get(&addr).cloned().unwrap_or_else(|| self.template.clone())
    }

    pub fn is_open(&self) -> bool {
        self.ports_open
    }

    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    fn check_open(&self, addr: NodeAddress) -> Result<(), SdkError> {
        if self.ports_open {
            Ok(())
        } else {
            Err(SdkError::new(addr, ERR_CLOSED, "ports closed"))
        }
    }

    fn open_node(&mut self, addr: NodeAddress) -> Result<&mut MockNode, SdkError> {
        self.check_open(addr)?;
        Ok(self.node_mut(addr))
    }
}

impl MotorSdk for MockSdk {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn set_port_path(&mut self, port: usize, path: &str) -> Result<(), SdkError> {
        self.log.push(Call::SetPortPath(port, path.to_string()));
        Ok(())
    }

    fn open_ports(&mut self, count: usize) -> Result<(), SdkError> {
        self.log.push(Call::OpenPorts(count));
        if self.fail_open {
            return Err(SdkError::new(NodeAddress::new(0, 0), ERR_INJECTED, "open failed"));
        }
        self.ports_open = true;
        Ok(())
    }

    fn close_ports(&mut self) -> Result<(), SdkError> {
        self.log.push(Call::ClosePorts);
        self.ports_open = false;
        Ok(())
    }

    fn port_info(&self, port: usize) -> Result<PortInfo, SdkError> {
        self.check_open(NodeAddress::new(port, 0))?;
        Ok(PortInfo {
            net_number: port,
            open_state: PortState::Online,
            node_count: 4,
        })
    }

    fn timestamp_ms(&self) -> f64 {
        let now = self.clock.get();
        self.clock.set(now + self.clock_step_ms);
        now
    }

    fn node_info(&self, addr: NodeAddress) -> Result<NodeInfo, SdkError> {
        self.check_open(addr)?;
        Ok(NodeInfo {
            node_type: "MOCK".to_string(),
            user_id: format!("{}", addr),
            firmware_version: "1.0".to_string(),
            serial_number: (addr.port * 100 + addr.node) as u32,
            model: "M-1".to_string(),
        })
    }

    fn clear_alerts(&mut self, addr: NodeAddress) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::ClearAlerts(addr));
        Ok(())
    }

    fn clear_node_stop(&mut self, addr: NodeAddress) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::ClearNodeStop(addr));
        Ok(())
    }

    fn set_enable_request(&mut self, addr: NodeAddress, enable: bool) -> Result<(), SdkError> {
        self.open_node(addr)?.enabled = enable;
        self.log.push(Call::Enable(addr, enable));
        Ok(())
    }

    fn enable_request(&self, addr: NodeAddress) -> Result<bool, SdkError> {
        self.check_open(addr)?;
        Ok(self.node(addr).enabled)
    }

    fn is_ready(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        let node = self.open_node(addr)?;
        Ok(node.enabled && node.becomes_ready && !node.bus_power_lost)
    }

    fn bus_power_lost(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.open_node(addr)?.bus_power_lost)
    }

    fn homing_configured(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.open_node(addr)?.homing_configured)
    }

    fn was_homed(&mut self, addr: NodeAddress) -> Result<bool, SdkError> {
        Ok(self.open_node(addr)?.homed)
    }

    fn initiate_homing(&mut self, addr: NodeAddress) -> Result<(), SdkError> {
        let node = self.open_node(addr)?;
        if node.loses_power_on_homing {
            node.bus_power_lost = true;
            node.homed = false;
        } else {
            node.homed = node.homing_completes;
        }
        self.log.push(Call::InitiateHoming(addr));
        Ok(())
    }

    fn parameter(&mut self, addr: NodeAddress, _number: u16) -> Result<f64, SdkError> {
        self.open_node(addr)?;
        Ok(0.0)
    }

    fn set_parameter(&mut self, addr: NodeAddress, number: u16, value: f64) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::SetParameter(addr, number, value));
        Ok(())
    }

    fn positioning_resolution(&mut self, addr: NodeAddress) -> Result<u32, SdkError> {
        Ok(self.open_node(addr)?.resolution)
    }

    fn set_acc_unit(&mut self, addr: NodeAddress, unit: AccUnit) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::AccUnit(addr, unit));
        Ok(())
    }

    fn set_vel_unit(&mut self, addr: NodeAddress, unit: VelUnit) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::VelUnit(addr, unit));
        Ok(())
    }

    fn set_trq_unit(&mut self, addr: NodeAddress, unit: TrqUnit) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::TrqUnit(addr, unit));
        Ok(())
    }

    fn set_vel_limit(&mut self, addr: NodeAddress, limit: f64) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::VelLimit(addr, limit));
        Ok(())
    }

    fn set_acc_limit(&mut self, addr: NodeAddress, limit: f64) -> Result<(), SdkError> {
        self.open_node(addr)?;
        self.log.push(Call::AccLimit(addr, limit));
        Ok(())
    }

    fn move_position_absolute(&mut self, addr: NodeAddress, counts: f64) -> Result<(), SdkError> {
        self.open_node(addr)?;
        if self.fail_moves {
            return Err(SdkError::new(addr, ERR_INJECTED, "move rejected"));
        }
        self.log.push(Call::MovePosition(addr, counts));
        Ok(())
    }

    fn move_velocity(&mut self, addr: NodeAddress, counts_per_sec: f64) -> Result<(), SdkError> {
        self.open_node(addr)?;
        if self.fail_moves {
            return Err(SdkError::new(addr, ERR_INJECTED, "move rejected"));
        }
        self.log.push(Call::MoveVelocity(addr, counts_per_sec));
        Ok(())
    }

    fn refresh_position(&mut self, addr: NodeAddress) -> Result<f64, SdkError> {
        if self.fail_refresh {
            return Err(SdkError::new(addr, ERR_INJECTED, "refresh failed"));
        }
        Ok(self.open_node(addr)?.position_counts)
    }

    fn refresh_velocity(&mut self, addr: NodeAddress) -> Result<f64, SdkError> {
        Ok(self.open_node(addr)?.velocity_counts)
    }

    fn refresh_torque(&mut self, addr: NodeAddress) -> Result<f64, SdkError> {
        Ok(self.open_node(addr)?.torque_pct)
    }
}

/// Joint descriptor with the required keys plus `extra`.
pub fn joint(name: &str, port: &str, node: usize, homing: u8, extra: &[(&str, &str)]) -> JointDescriptor {
    let mut desc = JointDescriptor::new(
        name,
        [
            ("port", port.to_string()),
            ("node", node.to_string()),
            ("vel_limit", "10.0".to_string()),
            ("acc_limit", "100.0".to_string()),
            ("homing", homing.to_string()),
        ],
    );
    for (key, value) in extra {
        desc.parameters.insert(key.to_string(), value.to_string());
    }
    desc
}
