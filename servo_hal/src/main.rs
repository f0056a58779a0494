//! # Servo Fleet Binary
//!
//! Loads a fleet file, brings the servo fleet up through the lifecycle and
//! runs the read → write control loop until Ctrl+C or a cycle limit.
//!
//! # Usage
//!
//! ```bash
//! # Run the simulated fleet from the default config path
//! servo_hal --sdk simulation
//!
//! # Custom fleet file, verbose logging, stop after 10000 cycles
//! servo_hal --config config/fleet.toml -v --cycles 10000
//!
//! # JSON logs
//! servo_hal --config config/fleet.toml --json
//! ```

use clap::Parser;
use servo_common::config::LogLevel;
use servo_common::consts::DEFAULT_CONFIG_PATH;
use servo_common::hal::config::FleetConfig;
use servo_common::hal::driver::HalError;
use servo_hal::core::FleetCore;
use servo_hal::driver_registry::SdkRegistry;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Servo fleet adapter - lifecycle, control-mode negotiation and real-time I/O
#[derive(Parser, Debug)]
#[command(name = "servo_hal")]
#[command(version)]
#[command(about = "Servo fleet adapter with lifecycle control and a real-time I/O loop")]
#[command(long_about = None)]
struct Args {
    /// Path to the fleet configuration file (fleet.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// SDK backend to use; overrides `sdk` from the fleet file
    #[arg(long)]
    sdk: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Stop after this many cycles (0 = run until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    cycles: u64,
}

fn main() {
    let args = Args::parse();

    // Tracing needs the configured level, so the file is read first.
    let config = FleetCore::load_config(&args.config);
    let level = match &config {
        Ok(cfg) => cfg.shared.log_level,
        Err(_) => LogLevel::default(),
    };
    setup_tracing(&args, level);

    if let Err(e) = config.and_then(|config| run(&args, config)) {
        error!("Servo fleet failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: FleetConfig) -> Result<(), HalError> {
    info!(
        "Servo fleet v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let registry = SdkRegistry::with_builtin();
    info!("Available SDK backends: {:?}", registry.list());

    let mut core = FleetCore::new(config)?;

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|e| HalError::ConfigError(format!("signal handler: {e}")))?;

    if let Err(e) = core.init(&registry, args.sdk.as_deref()) {
        error!("Fleet initialization failed: {}", e);
        core.shutdown()?;
        return Err(e);
    }

    let max_cycles = (args.cycles > 0).then_some(args.cycles);
    if let Err(e) = core.run(max_cycles) {
        error!("Control loop error: {}", e);
    }

    core.shutdown()?;

    let stats = core.stats();
    info!(
        "Servo fleet shutdown complete: {} cycles, avg {}us, max {}us, {} violation(s), {} cycle error(s)",
        stats.cycle_count,
        stats.avg_cycle_time_us(),
        stats.max_cycle_time_us,
        stats.timing_violations,
        stats.tick_errors
    );
    Ok(())
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        level
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
