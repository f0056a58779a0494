//! Real-time I/O cycle.
//!
//! `read` refreshes every joint's measurements and converts them to user
//! units; `write` dispatches each joint's command slot selected by its
//! committed control mode. Both run only while Active.

use crate::system::ServoSystem;
use servo_common::hal::driver::{HalError, MotorSdk};
use servo_common::hal::types::{ControlMode, LifecycleState};
use std::time::Duration;
use tracing::trace;

impl<S: ?Sized + MotorSdk> ServoSystem<S> {
    #[inline]
    fn ensure_active(&self) -> Result<(), HalError> {
        match self.state {
            LifecycleState::Active => Ok(()),
            other => Err(HalError::NotActive(other)),
        }
    }

    /// Refresh position, velocity and (where rated) effort of every joint.
    ///
    /// Read-only joints are refreshed too. Any SDK failure aborts the tick.
    pub fn read(&mut self, time: Duration, period: Duration) -> Result<(), HalError> {
        self.ensure_active()?;
        trace!("read at {:?} (period {:?})", time, period);

        let Self {
            sdk,
            specs,
            topology,
            conversions,
            states,
            ..
        } = self;
        for (((spec, &addr), conversion), state) in specs
            .iter()
            .zip(topology.addresses())
            .zip(conversions.iter())
            .zip(states.iter_mut())
        {
            state.position = conversion.from_counts(sdk.refresh_position(addr)?);
            state.velocity = conversion.from_counts(sdk.refresh_velocity(addr)?);
            if conversion.has_effort() {
                state.effort = conversion.effort_from_pct(sdk.refresh_torque(addr)?);
            }
            if spec.read_only {
                trace!("Read-only joint '{}' at {:.6}", spec.name, state.position);
            }
        }
        Ok(())
    }

    /// Send each writable joint's command for its control mode.
    ///
    /// Joints in `Undefined` mode, read-only joints and unset slots send
    /// nothing. Any SDK failure aborts the tick.
    pub fn write(&mut self, time: Duration, period: Duration) -> Result<(), HalError> {
        self.ensure_active()?;
        trace!("write at {:?} (period {:?})", time, period);

        let Self {
            sdk,
            specs,
            topology,
            conversions,
            modes,
            commands,
            ..
        } = self;
        for ((((spec, &addr), conversion), mode), command) in specs
            .iter()
            .zip(topology.addresses())
            .zip(conversions.iter())
            .zip(modes.iter())
            .zip(commands.iter())
        {
            if spec.read_only {
                continue;
            }
            match mode {
                ControlMode::Undefined => {}
                ControlMode::Velocity => {
                    if let Some(velocity) = command.velocity_command() {
                        sdk.move_velocity(addr, conversion.to_counts(velocity))?;
                    }
                }
                ControlMode::Position => {
                    if let Some(position) = command.position_command() {
                        sdk.move_position_absolute(addr, conversion.to_counts(position))?;
                    }
                }
            }
        }
        Ok(())
    }
}
