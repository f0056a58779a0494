//! End-to-end tests against the simulation backend.

use servo_common::hal::config::JointDescriptor;
use servo_common::hal::driver::HalError;
use servo_common::hal::types::{LifecycleState, NodeAddress};
use servo_hal::ServoSystem;
use servo_hal::drivers::simulation::{NodeFlags, SimulatedSdk};
use std::thread;
use std::time::{Duration, Instant};

fn descriptor(name: &str, node: usize, homing: u8) -> JointDescriptor {
    JointDescriptor::new(
        name,
        [
            ("port", "/dev/sim0".to_string()),
            ("node", node.to_string()),
            ("vel_limit", "6.0".to_string()),
            ("acc_limit", "60.0".to_string()),
            ("homing", homing.to_string()),
        ],
    )
}

/// Run read → write ticks for `duration` at 1 ms.
fn run_for(sys: &mut ServoSystem<SimulatedSdk>, duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        let now = start.elapsed();
        sys.read(now, Duration::from_millis(1)).unwrap();
        sys.write(now, Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    sys.read(start.elapsed(), Duration::from_millis(1)).unwrap();
}

#[test]
fn simulated_fleet_homes_and_follows_velocity() {
    let mut sys = ServoSystem::new(Box::new(SimulatedSdk::new().with_nodes_per_port(2)));
    sys.configure(&[descriptor("j1", 0, 1), descriptor("j2", 1, 0)])
        .unwrap();
    sys.activate().unwrap();
    assert_eq!(sys.state(), LifecycleState::Active);

    let homed = sys.sdk().node(NodeAddress::new(0, 0)).unwrap().flags();
    assert!(homed.contains(NodeFlags::HOMED | NodeFlags::READY));

    sys.prepare_command_mode_switch(&["j1/velocity"], &["j2/position"])
        .unwrap();
    sys.perform_command_mode_switch();
    sys.set_velocity_command(0, 1.0);

    run_for(&mut sys, Duration::from_millis(200));

    let state = sys.joint_state(0).unwrap();
    assert!((state.velocity - 1.0).abs() < 1e-6, "velocity {}", state.velocity);
    assert!(state.position > 0.0);
    assert_eq!(sys.joint_state(1).unwrap().velocity, 0.0);
}

#[test]
fn simulated_position_move_converges() {
    let mut sys = ServoSystem::new(Box::new(SimulatedSdk::new().with_nodes_per_port(1)));
    sys.configure(&[descriptor("j1", 0, 0)]).unwrap();
    sys.activate().unwrap();

    sys.prepare_command_mode_switch(&["j1/position"], &[] as &[&str])
        .unwrap();
    sys.perform_command_mode_switch();
    sys.set_position_command(0, 0.5);

    run_for(&mut sys, Duration::from_millis(800));

    let state = sys.joint_state(0).unwrap();
    assert!((state.position - 0.5).abs() < 5e-3, "position {}", state.position);
}

#[test]
fn simulated_power_loss_fails_reactivation() {
    let mut sys = ServoSystem::new(Box::new(SimulatedSdk::new().with_nodes_per_port(1)))
        .with_poll_interval(Duration::from_millis(5));
    sys.configure(&[descriptor("j1", 0, 0)]).unwrap();
    sys.activate().unwrap();
    sys.deactivate().unwrap();

    let addr = NodeAddress::new(0, 0);
    sys.sdk_mut().inject_bus_power_loss(addr, true).unwrap();
    assert_eq!(sys.activate(), Err(HalError::BusPowerLoss { addr }));
    assert_eq!(sys.state(), LifecycleState::Inactive);

    sys.sdk_mut().inject_bus_power_loss(addr, false).unwrap();
    sys.activate().unwrap();
    assert_eq!(sys.state(), LifecycleState::Active);
}

#[test]
fn missing_node_fails_activation_with_sdk_error() {
    let mut sys = ServoSystem::new(Box::new(SimulatedSdk::new().with_nodes_per_port(1)));
    sys.configure(&[descriptor("j1", 0, 0), descriptor("j2", 3, 0)])
        .unwrap();
    assert!(matches!(sys.activate(), Err(HalError::Sdk(_))));
    assert_eq!(sys.state(), LifecycleState::Inactive);
    sys.cleanup().unwrap();
    assert!(!sys.sdk().is_open());
}
