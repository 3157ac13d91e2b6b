//! Personalized detection thresholds.
//!
//! A [`ThresholdProfile`] is produced by the calibration engine and read by
//! the gesture detector. It is replaced wholesale, never edited in place, and
//! every profile that leaves this crate has been through [`ThresholdProfile::sanitize`].

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::RangeInclusive;

/// Version of the profile schema and of the calibration math.
///
/// Bumping it invalidates every stored profile; users recalibrate.
pub const PROFILE_VERSION: u32 = 3;

/// Calibrated (or fallback) thresholds for nod/shake detection.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Neutral pitch in radians.
    pub baseline_pitch: f64,
    /// Neutral yaw in radians.
    pub baseline_yaw: f64,
    /// Deviation from baseline treated as noise (radians).
    pub neutral_deadzone: f64,
    pub nod_amplitude_threshold: f64,
    /// rad/s
    pub nod_velocity_threshold: f64,
    pub shake_amplitude_threshold: f64,
    /// rad/s
    pub shake_velocity_threshold: f64,
    /// Largest tolerated yaw/pitch amplitude ratio during a nod.
    pub nod_cross_axis_leakage_max: f64,
    /// Largest tolerated pitch/yaw amplitude ratio during a shake.
    pub shake_cross_axis_leakage_max: f64,
    pub nod_min_crossings: u32,
    pub shake_min_crossings: u32,
    /// Exponential smoothing factor for diagnostic confidences, in [0, 1].
    pub diagnostic_smoothing: f64,
    /// Smoothed confidence needed before a gesture becomes a candidate.
    pub min_confidence: f64,
    pub cooldown_seconds: f64,
    pub version: u32,
}

/// Legal range of every numeric profile field.
pub mod limits {
    use super::*;

    pub const BASELINE_PITCH: RangeInclusive<f64> = -FRAC_PI_2..=FRAC_PI_2;
    pub const BASELINE_YAW: RangeInclusive<f64> = -PI..=PI;
    pub const NEUTRAL_DEADZONE: RangeInclusive<f64> = 0.02..=0.20;
    pub const NOD_AMPLITUDE: RangeInclusive<f64> = 0.05..=0.45;
    pub const NOD_VELOCITY: RangeInclusive<f64> = 0.20..=2.50;
    pub const SHAKE_AMPLITUDE: RangeInclusive<f64> = 0.05..=0.50;
    pub const SHAKE_VELOCITY: RangeInclusive<f64> = 0.20..=2.80;
    pub const CROSS_AXIS_LEAKAGE: RangeInclusive<f64> = 0.80..=1.20;
    pub const NOD_MIN_CROSSINGS: RangeInclusive<u32> = 1..=2;
    pub const SHAKE_MIN_CROSSINGS: RangeInclusive<u32> = 1..=3;
    pub const DIAGNOSTIC_SMOOTHING: RangeInclusive<f64> = 0.05..=0.90;
    pub const MIN_CONFIDENCE: RangeInclusive<f64> = 0.30..=0.95;
    pub const COOLDOWN_SECONDS: RangeInclusive<f64> = 0.20..=3.00;
}

impl ThresholdProfile {
    /// Conservative defaults used until (or instead of) calibration.
    pub const FALLBACK: ThresholdProfile = ThresholdProfile {
        baseline_pitch: 0.0,
        baseline_yaw: 0.0,
        neutral_deadzone: 0.035,
        nod_amplitude_threshold: 0.12,
        nod_velocity_threshold: 0.55,
        shake_amplitude_threshold: 0.14,
        shake_velocity_threshold: 0.60,
        nod_cross_axis_leakage_max: 0.90,
        shake_cross_axis_leakage_max: 0.90,
        nod_min_crossings: 2,
        shake_min_crossings: 2,
        diagnostic_smoothing: 0.35,
        min_confidence: 0.60,
        cooldown_seconds: 0.90,
        version: PROFILE_VERSION,
    };

    pub fn fallback() -> Self {
        Self::FALLBACK
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::FALLBACK
    }

    /// Clamp every field into its legal range and stamp the current version.
    ///
    /// Non-finite values are replaced by the fallback value for that field.
    /// Idempotent: `p.sanitize().sanitize() == p.sanitize()`.
    pub fn sanitize(&self) -> ThresholdProfile {
        let fb = &Self::FALLBACK;
        let sanitized = ThresholdProfile {
            baseline_pitch: clamp_field(self.baseline_pitch, fb.baseline_pitch, limits::BASELINE_PITCH),
            baseline_yaw: clamp_field(self.baseline_yaw, fb.baseline_yaw, limits::BASELINE_YAW),
            neutral_deadzone: clamp_field(
                self.neutral_deadzone,
                fb.neutral_deadzone,
                limits::NEUTRAL_DEADZONE,
            ),
            nod_amplitude_threshold: clamp_field(
                self.nod_amplitude_threshold,
                fb.nod_amplitude_threshold,
                limits::NOD_AMPLITUDE,
            ),
            nod_velocity_threshold: clamp_field(
                self.nod_velocity_threshold,
                fb.nod_velocity_threshold,
                limits::NOD_VELOCITY,
            ),
            shake_amplitude_threshold: clamp_field(
                self.shake_amplitude_threshold,
                fb.shake_amplitude_threshold,
                limits::SHAKE_AMPLITUDE,
            ),
            shake_velocity_threshold: clamp_field(
                self.shake_velocity_threshold,
                fb.shake_velocity_threshold,
                limits::SHAKE_VELOCITY,
            ),
            nod_cross_axis_leakage_max: clamp_field(
                self.nod_cross_axis_leakage_max,
                fb.nod_cross_axis_leakage_max,
                limits::CROSS_AXIS_LEAKAGE,
            ),
            shake_cross_axis_leakage_max: clamp_field(
                self.shake_cross_axis_leakage_max,
                fb.shake_cross_axis_leakage_max,
                limits::CROSS_AXIS_LEAKAGE,
            ),
            nod_min_crossings: clamp_count(self.nod_min_crossings, limits::NOD_MIN_CROSSINGS),
            shake_min_crossings: clamp_count(self.shake_min_crossings, limits::SHAKE_MIN_CROSSINGS),
            diagnostic_smoothing: clamp_field(
                self.diagnostic_smoothing,
                fb.diagnostic_smoothing,
                limits::DIAGNOSTIC_SMOOTHING,
            ),
            min_confidence: clamp_field(self.min_confidence, fb.min_confidence, limits::MIN_CONFIDENCE),
            cooldown_seconds: clamp_field(
                self.cooldown_seconds,
                fb.cooldown_seconds,
                limits::COOLDOWN_SECONDS,
            ),
            version: PROFILE_VERSION,
        };
        debug_assert!(sanitized.is_within_limits());
        sanitized
    }

    /// True when sanitizing would leave the profile unchanged.
    pub fn is_sanitized(&self) -> bool {
        self.sanitize() == *self
    }

    fn is_within_limits(&self) -> bool {
        limits::BASELINE_PITCH.contains(&self.baseline_pitch)
            && limits::BASELINE_YAW.contains(&self.baseline_yaw)
            && limits::NEUTRAL_DEADZONE.contains(&self.neutral_deadzone)
            && limits::NOD_AMPLITUDE.contains(&self.nod_amplitude_threshold)
            && limits::NOD_VELOCITY.contains(&self.nod_velocity_threshold)
            && limits::SHAKE_AMPLITUDE.contains(&self.shake_amplitude_threshold)
            && limits::SHAKE_VELOCITY.contains(&self.shake_velocity_threshold)
            && limits::CROSS_AXIS_LEAKAGE.contains(&self.nod_cross_axis_leakage_max)
            && limits::CROSS_AXIS_LEAKAGE.contains(&self.shake_cross_axis_leakage_max)
            && limits::NOD_MIN_CROSSINGS.contains(&self.nod_min_crossings)
            && limits::SHAKE_MIN_CROSSINGS.contains(&self.shake_min_crossings)
            && limits::DIAGNOSTIC_SMOOTHING.contains(&self.diagnostic_smoothing)
            && limits::MIN_CONFIDENCE.contains(&self.min_confidence)
            && limits::COOLDOWN_SECONDS.contains(&self.cooldown_seconds)
    }
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self::FALLBACK
    }
}

fn clamp_field(value: f64, fallback: f64, range: RangeInclusive<f64>) -> f64 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

fn clamp_count(value: u32, range: RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}
