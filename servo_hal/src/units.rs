//! Unit conversion between user units and native encoder counts.
//!
//! `counts_per_unit = revolutions_per_unit × encoder_counts_per_rev`, where
//! revolutions per user unit is `1 / feed_constant` for linear joints and
//! `1 / 2π` for rotary joints (user unit = radian). The encoder resolution is
//! only known after the node has been opened, so a conversion is created
//! during activation and stays fixed while Active.

use servo_common::consts::TORQUE_FULL_SCALE_PCT;
use servo_common::hal::config::JointSpec;
use std::f64::consts::TAU;

/// Fixed conversion factors of one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConversion {
    counts_per_unit: f64,
    feed_constant: Option<f64>,
    peak_torque: Option<f64>,
}

/// Motor revolutions per user unit.
#[inline]
pub fn revolutions_per_unit(feed_constant: Option<f64>) -> f64 {
    match feed_constant {
        Some(feed) => 1.0 / feed,
        None => 1.0 / TAU,
    }
}

impl UnitConversion {
    /// Complete the conversion for `spec` with the node's encoder resolution.
    pub fn new(spec: &JointSpec, encoder_counts_per_rev: u32) -> Self {
        Self {
            counts_per_unit: revolutions_per_unit(spec.feed_constant) * f64::from(encoder_counts_per_rev),
            feed_constant: spec.feed_constant,
            peak_torque: spec.peak_torque,
        }
    }

    /// Encoder counts per user unit.
    #[inline]
    pub fn counts_per_unit(&self) -> f64 {
        self.counts_per_unit
    }

    /// User units (position, velocity or acceleration) → counts.
    #[inline]
    pub fn to_counts(&self, value: f64) -> f64 {
        value * self.counts_per_unit
    }

    /// Counts → user units.
    #[inline]
    pub fn from_counts(&self, counts: f64) -> f64 {
        counts / self.counts_per_unit
    }

    /// Torque reading in percent of max → effort, if the joint has a
    /// peak torque rating.
    ///
    /// Linear joints report force: `torque × 2π / feed_constant`.
    #[inline]
    pub fn effort_from_pct(&self, pct_of_max: f64) -> Option<f64> {
        let peak = self.peak_torque?;
        let torque = pct_of_max / TORQUE_FULL_SCALE_PCT * peak;
        Some(match self.feed_constant {
            Some(feed) => torque * TAU / feed,
            None => torque,
        })
    }

    /// True when an effort reading is produced.
    #[inline]
    pub fn has_effort(&self) -> bool {
        self.peak_torque.is_some()
    }
}
