//! Control-mode negotiation.
//!
//! The framework announces which command interfaces start and stop being
//! claimed. `prepare_command_mode_switch` validates the request and records
//! the per-joint result without touching live state; a later
//! `perform_command_mode_switch` commits it.
//!
//! Per joint, the started interfaces decide the new mode:
//!
//! | started interfaces     | mode                                   |
//! |------------------------|----------------------------------------|
//! | `velocity` only        | Velocity                               |
//! | `position` only        | Position                               |
//! | none                   | Undefined if stopped, unchanged else   |
//! | anything else          | rejected                               |

use crate::system::ServoSystem;
use servo_common::hal::driver::{HalError, MotorSdk};
use servo_common::hal::types::{ControlMode, InterfaceKind};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Validated but not yet committed mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSwitch {
    /// Joint appears in the stop set
    pub stopped: Vec<bool>,
    /// Mode each joint takes on commit
    pub modes: Vec<ControlMode>,
}

/// Split `"<joint>/<interface>"` at the last separator.
fn split_interface(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('/')
}

fn belongs_to(name: &str, joint: &str) -> bool {
    split_interface(name).is_some_and(|(owner, _)| owner == joint)
}

/// New mode of one joint from the interface names started on it.
fn resolve_mode(
    joint: &str,
    started: &BTreeSet<&str>,
    stopped: bool,
    current: ControlMode,
) -> Result<ControlMode, HalError> {
    let velocity = InterfaceKind::Velocity.as_str();
    let position = InterfaceKind::Position.as_str();

    let mut iter = started.iter();
    match (iter.next(), iter.next()) {
        (None, _) if stopped => Ok(ControlMode::Undefined),
        (None, _) => Ok(current),
        (Some(&only), None) if only == velocity => Ok(ControlMode::Velocity),
        (Some(&only), None) if only == position => Ok(ControlMode::Position),
        _ => Err(HalError::Negotiation(format!(
            "joint '{}': unsupported interface combination {:?}",
            joint, started
        ))),
    }
}

impl<S: ?Sized + MotorSdk> ServoSystem<S> {
    /// Validate a mode switch and record it for commit.
    ///
    /// Interface names that belong to no configured joint are ignored. On
    /// rejection nothing changes, including a previously prepared switch.
    pub fn prepare_command_mode_switch<A, B>(&mut self, start: &[A], stop: &[B]) -> Result<(), HalError>
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut prepared = PreparedSwitch {
            stopped: Vec::with_capacity(self.specs.len()),
            modes: Vec::with_capacity(self.specs.len()),
        };

        for (spec, &current) in self.specs.iter().zip(&self.modes) {
            let stopped = stop.iter().any(|name| belongs_to(name.as_ref(), &spec.name));
            let started: BTreeSet<&str> = start
                .iter()
                .filter_map(|name| split_interface(name.as_ref()))
                .filter(|(owner, _)| *owner == spec.name)
                .map(|(_, iface)| iface)
                .collect();

            let mode = resolve_mode(&spec.name, &started, stopped, current)
                .inspect_err(|e| warn!("Mode switch rejected: {}", e))?;
            if mode != current {
                debug!("Joint '{}': {:?} → {:?} prepared", spec.name, current, mode);
            }
            prepared.stopped.push(stopped);
            prepared.modes.push(mode);
        }

        self.prepared = Some(prepared);
        Ok(())
    }

    /// Commit the prepared switch.
    ///
    /// Command slots of every stopped joint are reset to unset. Without a
    /// prepared switch this does nothing.
    pub fn perform_command_mode_switch(&mut self) {
        // Configure and cleanup drop any prepared switch, so it always
        // matches the configured joints.
        let Some(prepared) = self.prepared.take() else {
            debug!("No prepared mode switch to perform");
            return;
        };

        for (cmd, &stopped) in self.commands.iter_mut().zip(&prepared.stopped) {
            if stopped {
                cmd.reset();
            }
        }
        for ((spec, mode), new) in self.specs.iter().zip(self.modes.iter_mut()).zip(prepared.modes) {
            if *mode != new {
                info!("Joint '{}' control mode {:?} → {:?}", spec.name, mode, new);
                *mode = new;
            }
        }
    }

    /// True while a prepared switch awaits commit.
    pub fn has_prepared_switch(&self) -> bool {
        self.prepared.is_some()
    }
}
