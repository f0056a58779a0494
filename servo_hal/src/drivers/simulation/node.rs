//! Simulated motor-controller node.
//!
//! The `SimNode` models one node in native units (counts, counts/s):
//! enable delay, homing duration, trapezoidal position moves and velocity
//! moves under the node's velocity/acceleration limits, and a torque reading
//! proportional to acceleration.

use bitflags::bitflags;
use servo_common::hal::types::{AccUnit, NodeInfo, TrqUnit, VelUnit};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Time from enable request to ready [ms].
pub const ENABLE_DELAY_MS: f64 = 20.0;

/// Duration of a simulated homing procedure [ms].
pub const HOMING_DURATION_MS: f64 = 100.0;

/// Default encoder resolution [counts/rev].
pub const DEFAULT_RESOLUTION: u32 = 6400;

/// Velocity limit before the host pushes one [counts/s].
const DEFAULT_VEL_LIMIT: f64 = 64_000.0;

/// Acceleration limit before the host pushes one [counts/s²].
const DEFAULT_ACC_LIMIT: f64 = 640_000.0;

/// Torque share needed to reach the acceleration limit [% of max].
const ACCEL_TORQUE_PCT: f64 = 60.0;

/// Constant friction torque while moving [% of max].
const FRICTION_TORQUE_PCT: f64 = 4.0;

bitflags! {
    /// Status bits of a simulated node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u16 {
        /// Host requested enable
        const ENABLE_REQUESTED = 1 << 0;
        /// Enabled and ready for motion
        const READY = 1 << 1;
        /// Homed since power-up
        const HOMED = 1 << 2;
        /// Homing procedure running
        const HOMING = 1 << 3;
        /// Homing set up on the node
        const HOMING_CONFIGURED = 1 << 4;
        /// Bus power lost
        const BUS_POWER_LOSS = 1 << 5;
        /// Latched alert
        const ALERT = 1 << 6;
        /// Node-stop condition active
        const NODE_STOP = 1 << 7;
    }
}

/// Active motion request.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Idle,
    Position(f64),
    Velocity(f64),
}

/// One simulated node.
#[derive(Debug, Clone)]
pub struct SimNode {
    info: NodeInfo,
    flags: NodeFlags,
    resolution: u32,
    position: f64,
    velocity: f64,
    acceleration: f64,
    vel_limit: f64,
    acc_limit: f64,
    motion: Motion,
    parameters: HashMap<u16, f64>,
    acc_unit: AccUnit,
    vel_unit: VelUnit,
    trq_unit: TrqUnit,
    enable_at_ms: f64,
    homing_done_at_ms: f64,
    last_update_ms: f64,
}

impl SimNode {
    /// Create a powered, disabled, un-homed node.
    pub fn new(serial_number: u32, resolution: u32, now_ms: f64) -> Self {
        Self {
            info: NodeInfo {
                node_type: "CLEARPATH_SC_SIM".to_string(),
                user_id: format!("sim-{serial_number}"),
                firmware_version: env!("CARGO_PKG_VERSION").to_string(),
                serial_number,
                model: "SIM-2310".to_string(),
            },
            flags: NodeFlags::HOMING_CONFIGURED,
            resolution,
            position: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            vel_limit: DEFAULT_VEL_LIMIT,
            acc_limit: DEFAULT_ACC_LIMIT,
            motion: Motion::Idle,
            parameters: HashMap::new(),
            acc_unit: AccUnit::default(),
            vel_unit: VelUnit::default(),
            trq_unit: TrqUnit::default(),
            enable_at_ms: 0.0,
            homing_done_at_ms: 0.0,
            last_update_ms: now_ms,
        }
    }

    /// Identity data.
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Current status bits.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Set or clear status bits directly (fault injection).
    pub fn set_flags(&mut self, flags: NodeFlags, value: bool) {
        self.flags.set(flags, value);
        if value && flags.intersects(NodeFlags::BUS_POWER_LOSS | NodeFlags::ALERT) {
            self.flags.remove(NodeFlags::READY);
            self.motion = Motion::Idle;
        }
    }

    /// Encoder resolution [counts/rev].
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Velocity limit [counts/s].
    pub fn vel_limit(&self) -> f64 {
        self.vel_limit
    }

    /// Acceleration limit [counts/s²].
    pub fn acc_limit(&self) -> f64 {
        self.acc_limit
    }

    /// Working units (acceleration, velocity, torque).
    pub fn units(&self) -> (AccUnit, VelUnit, TrqUnit) {
        (self.acc_unit, self.vel_unit, self.trq_unit)
    }

    /// Numbered parameter, 0 when never written.
    pub fn parameter(&self, number: u16) -> f64 {
        self.parameters.get(&number).copied().unwrap_or(0.0)
    }

    /// Write a numbered parameter.
    pub fn set_parameter(&mut self, number: u16, value: f64) {
        self.parameters.insert(number, value);
    }

    /// Set working units.
    pub fn set_acc_unit(&mut self, unit: AccUnit) {
        self.acc_unit = unit;
    }

    /// Set working units.
    pub fn set_vel_unit(&mut self, unit: VelUnit) {
        self.vel_unit = unit;
    }

    /// Set working units.
    pub fn set_trq_unit(&mut self, unit: TrqUnit) {
        self.trq_unit = unit;
    }

    /// Set the velocity limit.
    pub fn set_vel_limit(&mut self, limit: f64) {
        self.vel_limit = limit.abs();
    }

    /// Set the acceleration limit.
    pub fn set_acc_limit(&mut self, limit: f64) {
        self.acc_limit = limit.abs();
    }

    /// Clear latched alerts.
    pub fn clear_alerts(&mut self) {
        self.flags.remove(NodeFlags::ALERT);
    }

    /// Clear the node-stop condition.
    pub fn clear_node_stop(&mut self) {
        self.flags.remove(NodeFlags::NODE_STOP);
    }

    /// Assert or de-assert the enable request.
    pub fn set_enable_request(&mut self, enable: bool, now_ms: f64) {
        self.advance(now_ms);
        if enable {
            if !self.flags.contains(NodeFlags::ENABLE_REQUESTED) {
                self.enable_at_ms = now_ms + ENABLE_DELAY_MS;
            }
            self.flags.insert(NodeFlags::ENABLE_REQUESTED);
        } else {
            self.flags
                .remove(NodeFlags::ENABLE_REQUESTED | NodeFlags::READY | NodeFlags::HOMING);
            self.motion = Motion::Idle;
        }
    }

    /// Start homing. Clears the homed bit until the procedure finishes.
    pub fn initiate_homing(&mut self, now_ms: f64) {
        self.advance(now_ms);
        self.flags.remove(NodeFlags::HOMED);
        self.flags.insert(NodeFlags::HOMING);
        self.motion = Motion::Idle;
        self.homing_done_at_ms = now_ms + HOMING_DURATION_MS;
    }

    /// Start an absolute position move.
    pub fn move_position(&mut self, target: f64) {
        self.motion = Motion::Position(target);
    }

    /// Start a velocity move.
    pub fn move_velocity(&mut self, velocity: f64) {
        self.motion = Motion::Velocity(velocity);
    }

    /// Measured position [counts].
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Measured velocity [counts/s].
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Measured torque [% of max].
    pub fn torque_pct(&self) -> f64 {
        if self.acc_limit <= 0.0 {
            return 0.0;
        }
        let accel = self.acceleration / self.acc_limit * ACCEL_TORQUE_PCT;
        let friction = if self.velocity.abs() > f64::EPSILON {
            self.velocity.signum() * FRICTION_TORQUE_PCT
        } else {
            0.0
        };
        (accel + friction).clamp(-100.0, 100.0)
    }

    /// Advance the node model to `now_ms`.
    pub fn advance(&mut self, now_ms: f64) {
        let dt = ((now_ms - self.last_update_ms) / 1000.0).max(0.0);
        self.last_update_ms = now_ms;

        let requested = self.flags.contains(NodeFlags::ENABLE_REQUESTED);
        let blocked = self
            .flags
            .intersects(NodeFlags::BUS_POWER_LOSS | NodeFlags::ALERT | NodeFlags::NODE_STOP);
        if requested && !blocked && now_ms >= self.enable_at_ms && !self.flags.contains(NodeFlags::READY) {
            debug!("Simulated node {} ready", self.info.serial_number);
            self.flags.insert(NodeFlags::READY);
        }

        if self.flags.contains(NodeFlags::HOMING) && now_ms >= self.homing_done_at_ms {
            self.flags.remove(NodeFlags::HOMING);
            self.flags.insert(NodeFlags::HOMED);
            self.position = 0.0;
            self.velocity = 0.0;
        }

        if dt > 0.0 {
            self.integrate(dt);
        }
    }

    fn integrate(&mut self, dt: f64) {
        let ready = self.flags.contains(NodeFlags::READY) && !self.flags.contains(NodeFlags::HOMING);
        let desired = match (ready, self.motion) {
            (false, _) | (true, Motion::Idle) => 0.0,
            (true, Motion::Velocity(v)) => v.clamp(-self.vel_limit, self.vel_limit),
            (true, Motion::Position(target)) => {
                let error = target - self.position;
                let braking = (2.0 * self.acc_limit * error.abs()).sqrt();
                error.signum() * braking.min(self.vel_limit)
            }
        };

        let max_change = self.acc_limit * dt;
        let change = (desired - self.velocity).clamp(-max_change, max_change);
        self.acceleration = change / dt;
        self.velocity += change;
        self.position += self.velocity * dt;

        if let Motion::Position(target) = self.motion {
            if (target - self.position).abs() < 0.5 && self.velocity.abs() <= max_change {
                self.position = target;
                self.velocity = 0.0;
                self.acceleration = 0.0;
                self.motion = Motion::Idle;
            }
        }
        trace!(
            "Simulated node {}: pos={:.1} vel={:.1}",
            self.info.serial_number, self.position, self.velocity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_node() -> SimNode {
        let mut node = SimNode::new(1, DEFAULT_RESOLUTION, 0.0);
        node.set_enable_request(true, 0.0);
        node.advance(ENABLE_DELAY_MS);
        assert!(node.flags().contains(NodeFlags::READY));
        node
    }

    #[test]
    fn node_becomes_ready_after_enable_delay() {
        let mut node = SimNode::new(1, DEFAULT_RESOLUTION, 0.0);
        node.set_enable_request(true, 0.0);
        node.advance(ENABLE_DELAY_MS / 2.0);
        assert!(!node.flags().contains(NodeFlags::READY));
        node.advance(ENABLE_DELAY_MS);
        assert!(node.flags().contains(NodeFlags::READY));
    }

    #[test]
    fn bus_power_loss_blocks_ready() {
        let mut node = SimNode::new(1, DEFAULT_RESOLUTION, 0.0);
        node.set_flags(NodeFlags::BUS_POWER_LOSS, true);
        node.set_enable_request(true, 0.0);
        node.advance(10.0 * ENABLE_DELAY_MS);
        assert!(!node.flags().contains(NodeFlags::READY));
    }

    #[test]
    fn homing_completes_and_zeroes_position() {
        let mut node = enabled_node();
        node.move_velocity(1000.0);
        node.advance(ENABLE_DELAY_MS + 50.0);
        assert!(node.position() != 0.0);

        let start = ENABLE_DELAY_MS + 50.0;
        node.initiate_homing(start);
        assert!(!node.flags().contains(NodeFlags::HOMED));
        node.advance(start + HOMING_DURATION_MS);
        assert!(node.flags().contains(NodeFlags::HOMED));
        assert_eq!(node.position(), 0.0);
    }

    #[test]
    fn position_move_reaches_target() {
        let mut node = enabled_node();
        node.set_vel_limit(10_000.0);
        node.set_acc_limit(100_000.0);
        node.move_position(2_000.0);

        let mut now = ENABLE_DELAY_MS;
        for _ in 0..2000 {
            now += 1.0;
            node.advance(now);
        }
        assert!((node.position() - 2_000.0).abs() < 1.0);
        assert!(node.velocity().abs() < 1.0);
    }

    #[test]
    fn velocity_move_respects_limit() {
        let mut node = enabled_node();
        node.set_vel_limit(5_000.0);
        node.move_velocity(50_000.0);
        let mut now = ENABLE_DELAY_MS;
        for _ in 0..500 {
            now += 1.0;
            node.advance(now);
        }
        assert!((node.velocity() - 5_000.0).abs() < 1e-6);
        assert!(node.torque_pct() > 0.0);
    }

    #[test]
    fn disable_stops_motion_request() {
        let mut node = enabled_node();
        node.move_velocity(1_000.0);
        node.set_enable_request(false, ENABLE_DELAY_MS);
        assert!(!node.flags().contains(NodeFlags::READY));
        node.advance(ENABLE_DELAY_MS + 1000.0);
        assert_eq!(node.velocity(), 0.0);
    }
}
