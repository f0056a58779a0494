//! Servo Fleet Common Library
//!
//! Shared types, constants and configuration loading for the servo fleet
//! adapter workspace.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration loading traits and shared config types
//! - [`consts`] - Fleet-wide constants (timeouts, limits, parameter numbers)
//! - [`hal`] - Joint configuration registry, data model and motor SDK boundary
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use servo_common::prelude::*;
//!
//! let mode = ControlMode::default();
//! assert_eq!(mode, ControlMode::Undefined);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
