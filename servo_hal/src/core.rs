//! Fleet runner and control loop.
//!
//! `FleetCore` plays the part of the control framework: it builds the
//! `ServoSystem` from the fleet file, drives it through the lifecycle and
//! runs the periodic read → write cycle at the configured rate.

use servo_common::config::ConfigLoader;
use servo_common::hal::config::FleetConfig;
use servo_common::hal::driver::HalError;
use servo_common::hal::types::LifecycleState;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::driver_registry::SdkRegistry;
use crate::system::ServoSystem;

/// Fleet runner owning the servo system and the loop timing.
pub struct FleetCore {
    /// Fleet configuration
    config: FleetConfig,
    /// Servo system, present after `init`
    system: Option<ServoSystem>,
    /// Running flag for loop control
    running: Arc<AtomicBool>,
    /// Cycle time from config
    cycle_time: Duration,
    /// Timing statistics
    stats: TimingStats,
}

/// Timing statistics for loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Number of cycles executed
    pub cycle_count: u64,
    /// Number of timing violations (cycle exceeded target)
    pub timing_violations: u64,
    /// Number of cycles whose read or write failed
    pub tick_errors: u64,
    /// Maximum observed cycle time
    pub max_cycle_time_us: u64,
    /// Sum of cycle times for average calculation
    pub total_cycle_time_us: u64,
}

impl TimingStats {
    /// Average cycle time, 0 before the first cycle.
    pub fn avg_cycle_time_us(&self) -> u64 {
        self.total_cycle_time_us.checked_div(self.cycle_count).unwrap_or(0)
    }

    fn record(&mut self, cycle_time_us: u64) {
        self.cycle_count += 1;
        self.total_cycle_time_us += cycle_time_us;
        self.max_cycle_time_us = self.max_cycle_time_us.max(cycle_time_us);
    }
}

impl FleetCore {
    /// Create a new runner with the given configuration.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn new(config: FleetConfig) -> Result<Self, HalError> {
        config.validate()?;

        let cycle_time = Duration::from_micros(u64::from(config.cycle_time_us));
        info!(
            "FleetCore created with {} joint(s), cycle_time={}us",
            config.joints.len(),
            config.cycle_time_us
        );

        Ok(Self {
            config,
            system: None,
            running: Arc::new(AtomicBool::new(false)),
            cycle_time,
            stats: TimingStats::default(),
        })
    }

    /// Load the fleet configuration from a TOML file.
    pub fn load_config(config_path: &Path) -> Result<FleetConfig, HalError> {
        info!("Loading configuration from {:?}", config_path);

        let config = FleetConfig::load(config_path).map_err(|e| {
            HalError::ConfigError(format!("Failed to load config file {:?}: {}", config_path, e))
        })?;

        info!(
            "Loaded config: sdk={}, {} joint(s)",
            config.sdk,
            config.joints.len()
        );
        Ok(config)
    }

    /// Create the SDK backend, then configure and activate the fleet.
    ///
    /// `sdk_name` overrides the backend named in the configuration.
    pub fn init(&mut self, registry: &SdkRegistry, sdk_name: Option<&str>) -> Result<(), HalError> {
        let name = sdk_name.unwrap_or(&self.config.sdk);
        info!("Initializing FleetCore with SDK '{}'...", name);

        let sdk = registry.create(name)?;
        info!("Created SDK backend: {}", sdk.name());

        let mut system = ServoSystem::new(sdk);
        system.configure(&self.config.joints)?;
        // Store before activating so a failed activation is still torn down.
        let system = self.system.insert(system);
        system.activate()?;

        info!("FleetCore initialized successfully");
        Ok(())
    }

    /// Run the control loop.
    ///
    /// Blocks until the running flag is cleared or `max_cycles` cycles have
    /// run. A failed read or write is counted and logged; the loop goes on
    /// with the next cycle.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<(), HalError> {
        let system = self
            .system
            .as_mut()
            .ok_or_else(|| HalError::ConfigError("Servo system not initialized".to_string()))?;

        info!(
            "Starting control loop (cycle_time={}us)...",
            self.cycle_time.as_micros()
        );
        self.running.store(true, Ordering::SeqCst);

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let start = Instant::now();
        let mut last_cycle = start;

        while self.running.load(Ordering::SeqCst) {
            if max_cycles.is_some_and(|max| self.stats.cycle_count >= max) {
                break;
            }
            let cycle_start = Instant::now();
            let period = cycle_start.duration_since(last_cycle);
            last_cycle = cycle_start;
            let time = cycle_start.duration_since(start);

            if let Err(e) = system.read(time, period).and_then(|()| system.write(time, period)) {
                self.stats.tick_errors += 1;
                if self.stats.tick_errors <= 10 || self.stats.tick_errors % 1000 == 0 {
                    error!("Cycle error #{}: {}", self.stats.tick_errors, e);
                }
            }

            let cycle_time_us = cycle_start.elapsed().as_micros() as u64;
            self.stats.record(cycle_time_us);

            if cycle_time_us > u64::from(self.config.cycle_time_us) {
                self.stats.timing_violations += 1;
                if self.stats.timing_violations <= 10 || self.stats.timing_violations % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: cycle took {}us (target {}us)",
                        self.stats.timing_violations, cycle_time_us, self.config.cycle_time_us
                    );
                }
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.cycle_time {
                std::thread::sleep(self.cycle_time - elapsed);
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Control loop: {} cycles, avg={}us, max={}us, violations={}, errors={}",
                    self.stats.cycle_count,
                    self.stats.avg_cycle_time_us(),
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations,
                    self.stats.tick_errors
                );
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            "Control loop stopped after {} cycles (violations: {}, errors: {})",
            self.stats.cycle_count, self.stats.timing_violations, self.stats.tick_errors
        );
        Ok(())
    }

    /// Stop the loop, deactivate and clean up the fleet.
    pub fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        let Some(system) = self.system.as_mut() else {
            return Ok(());
        };
        if system.state() == LifecycleState::Unconfigured {
            return Ok(());
        }

        // Inactive after a failed activation may still have nodes enabled.
        let deactivated = system.deactivate();
        let cleaned = system.cleanup();
        deactivated.and(cleaned)
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The servo system, present after `init`.
    pub fn system(&self) -> Option<&ServoSystem> {
        self.system.as_ref()
    }

    /// The servo system, mutably.
    pub fn system_mut(&mut self) -> Option<&mut ServoSystem> {
        self.system.as_mut()
    }

    /// Fleet configuration.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Get timing statistics.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling thread's policy.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servo_common::hal::config::JointDescriptor;

    fn config(joints: usize) -> FleetConfig {
        FleetConfig {
            cycle_time_us: 500,
            joints: (0..joints)
                .map(|i| {
                    JointDescriptor::new(
                        format!("j{i}"),
                        [
                            ("port", "/dev/sim0".to_string()),
                            ("node", i.to_string()),
                            ("vel_limit", "2.0".to_string()),
                            ("acc_limit", "20.0".to_string()),
                            ("homing", "0".to_string()),
                        ],
                    )
                })
                .collect(),
            ..FleetConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = config(1);
        cfg.cycle_time_us = 0;
        assert!(FleetCore::new(cfg).is_err());
    }

    #[test]
    fn run_requires_init() {
        let mut core = FleetCore::new(config(1)).unwrap();
        assert!(core.run(Some(1)).is_err());
    }

    #[test]
    fn unknown_sdk_is_reported() {
        let mut core = FleetCore::new(config(1)).unwrap();
        let registry = SdkRegistry::with_builtin();
        let err = core.init(&registry, Some("vendor")).unwrap_err();
        assert_eq!(err, HalError::DriverNotFound("vendor".to_string()));
        assert!(core.system().is_none());
    }

    #[test]
    fn simulated_fleet_runs_bounded_cycles() {
        let mut core = FleetCore::new(config(2)).unwrap();
        let registry = SdkRegistry::with_builtin();
        core.init(&registry, None).unwrap();
        assert_eq!(core.system().unwrap().state(), LifecycleState::Active);

        core.run(Some(5)).unwrap();
        let stats = core.stats();
        assert_eq!(stats.cycle_count, 5);
        assert_eq!(stats.tick_errors, 0);
        assert!(!core.running_flag().load(Ordering::SeqCst));

        let system = core.system().unwrap();
        assert!(system.joint_state(0).unwrap().position.is_finite());

        core.shutdown().unwrap();
        assert_eq!(core.system().unwrap().state(), LifecycleState::Unconfigured);
        assert!(core.shutdown().is_ok());
    }

    #[test]
    fn timing_stats_average() {
        let mut stats = TimingStats::default();
        assert_eq!(stats.avg_cycle_time_us(), 0);
        stats.record(10);
        stats.record(30);
        assert_eq!(stats.avg_cycle_time_us(), 20);
        assert_eq!(stats.max_cycle_time_us, 30);
    }
}
