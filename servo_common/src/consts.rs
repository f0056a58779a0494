//! Fleet-wide constants for the servo workspace.
//!
//! Single source of truth for timeouts, limits and node parameter numbers.

use std::time::Duration;

/// Canonical service name (used for logging).
pub const HAL_SERVICE_NAME: &str = "servo_hal";

/// Maximum number of joints in one fleet.
pub const MAX_JOINTS: usize = 64;

/// Default control cycle time in microseconds (1 kHz = 1000 µs).
pub const DEFAULT_CYCLE_TIME_US: u32 = 1000;

/// Default fleet configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/servo/fleet.toml";

/// Time a node is given to report ready after the enable request [ms].
pub const ENABLE_TIMEOUT_MS: f64 = 3000.0;

/// Time a node is given to finish homing [ms].
pub const HOMING_TIMEOUT_MS: f64 = 50000.0;

/// Default sleep between readiness / homing polls during activation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Node parameter number of the "interrupting moves" option.
pub const PARAM_INTERRUPTING_MOVES: u16 = 98;

/// Full scale of the torque reading in percent-of-max units.
pub const TORQUE_FULL_SCALE_PCT: f64 = 100.0;
