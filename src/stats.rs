//! Signal statistics shared by the detector and the calibration engine.
//!
//! All functions are pure and allocate at most one sorted copy of their input.

use std::f64::consts::{PI, TAU};

/// Linear-interpolated order statistic.
///
/// `p` is a fraction in [0, 1] (clamped). Returns 0 for an empty slice.
/// `percentile(&[1, 2, 3, 4], 0.5) == 2.5`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Percentile of absolute values.
pub fn abs_percentile<I>(values: I, p: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut magnitudes: Vec<f64> = values.into_iter().map(f64::abs).collect();
    if magnitudes.is_empty() {
        return 0.0;
    }
    magnitudes.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&magnitudes, p)
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 0.5)
}

/// Count sign changes, treating values within ±`deadband` as "no sign".
///
/// Samples inside the dead band neither start nor break a run, so noise
/// hovering around zero is not counted as a crossing.
pub fn count_zero_crossings<I>(values: I, deadband: f64) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let deadband = deadband.abs();
    let mut last_sign = 0i8;
    let mut crossings = 0;
    for value in values {
        let sign = if value > deadband {
            1
        } else if value < -deadband {
            -1
        } else {
            0
        };
        if sign == 0 {
            continue;
        }
        if last_sign != 0 && sign != last_sign {
            crossings += 1;
        }
        last_sign = sign;
    }
    crossings
}

/// Wrap an angle into [-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}

/// Signed shortest rotation from `from` to `to`, in [-π, π].
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    (to - from).sin().atan2((to - from).cos())
}

/// Continue an unwrapped angle series with a new wrapped reading.
///
/// Adds or subtracts 2π until the step from `previous` lies within ±π.
pub fn unwrap_angle(previous: f64, raw: f64) -> f64 {
    if !previous.is_finite() || !raw.is_finite() {
        return raw;
    }
    let mut candidate = raw;
    while candidate - previous > PI {
        candidate -= TAU;
    }
    while candidate - previous < -PI {
        candidate += TAU;
    }
    candidate
}

/// Unwrap a whole series in order.
pub fn unwrap_series(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        let next = match out.last() {
            Some(&previous) => unwrap_angle(previous, value),
            None => value,
        };
        out.push(next);
    }
    out
}

/// Finite-difference velocities between consecutive samples.
///
/// Returns `values.len() - 1` entries. Each Δt is floored at `min_dt`.
pub fn finite_difference(timestamps: &[f64], values: &[f64], min_dt: f64) -> Vec<f64> {
    timestamps
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| {
            let dt = (t[1] - t[0]).max(min_dt);
            (v[1] - v[0]) / dt
        })
        .collect()
}

/// Shrink `value` toward zero by `deadzone`, returning 0 inside the band.
pub fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    let excess = value.abs() - deadzone.max(0.0);
    if excess <= 0.0 {
        0.0
    } else {
        excess.copysign(value)
    }
}
