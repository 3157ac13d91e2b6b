//! Nod/shake detection over a rolling window of head-orientation samples.
//!
//! Per sample the detector:
//! 1. unwraps pitch/yaw and estimates angular velocity (Δt floored at 1e-4 s)
//! 2. appends a baseline-relative sample to a 0.9 s window
//! 3. scores nod on pitch and shake on yaw with the same function, with the
//!    primary/secondary axes swapped
//! 4. smooths both confidences, picks a candidate and requires it to hold
//!    for two consecutive samples
//! 5. fires if the cooldown has elapsed, then clears the window
//!
//! Amplitudes are measured after the profile's neutral dead zone has been
//! removed, so the effective amplitude floor is `threshold + neutral_deadzone`.
//! Calibration measures the demonstrated amplitude on raw captures; the dead
//! zone comes on top of the derived threshold as extra margin for noisy users.
//!
//! Low or missing motion yields zero confidence; nothing here returns an error.

use crate::profile::ThresholdProfile;
use crate::stats::{abs_percentile, apply_deadzone, count_zero_crossings, unwrap_angle, wrap_angle};
use crate::types::{GestureDetectionResult, GestureEvent, GestureKind, MotionSample};
use std::collections::VecDeque;

/// Rolling window horizon in seconds.
pub const WINDOW_SECONDS: f64 = 0.9;
/// Samples required before any confidence is reported.
pub const MIN_WINDOW_SAMPLES: usize = 8;
/// Consecutive samples a candidate must hold before it may fire.
pub const HYSTERESIS_SAMPLES: u32 = 2;

const MIN_DT: f64 = 1e-4;
const AMPLITUDE_PERCENTILE: f64 = 0.90;
const VELOCITY_PERCENTILE: f64 = 0.95;
/// Velocities below this fraction of the velocity threshold have no sign.
const CROSSING_DEADBAND_FRACTION: f64 = 0.30;
/// Sub-scores saturate at this multiple of their threshold.
const SCORE_HEADROOM: f64 = 1.55;
/// Leakage penalty reaches zero at this multiple of the allowed leakage.
const LEAKAGE_CUTOFF_FACTOR: f64 = 1.8;

const WEIGHT_AMPLITUDE: f64 = 0.38;
const WEIGHT_VELOCITY: f64 = 0.34;
const WEIGHT_RHYTHM: f64 = 0.16;
const WEIGHT_DYNAMIC: f64 = 0.12;

/// Host-side detector settings that are not part of the user's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Added on top of `profile.cooldown_seconds`.
    pub extra_cooldown_seconds: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            extra_cooldown_seconds: 0.0,
        }
    }
}

impl From<&crate::config::EngineConfig> for DetectorConfig {
    fn from(config: &crate::config::EngineConfig) -> Self {
        Self {
            extra_cooldown_seconds: config.extra_cooldown_seconds.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Pitch,
    Yaw,
}

impl Axis {
    fn other(self) -> Axis {
        match self {
            Axis::Pitch => Axis::Yaw,
            Axis::Yaw => Axis::Pitch,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowSample {
    timestamp: f64,
    /// Baseline-relative, dead-zoned angles.
    pitch: f64,
    yaw: f64,
    pitch_velocity: f64,
    yaw_velocity: f64,
    /// |rotation rate| reported by the sensor.
    pitch_rate: f64,
    yaw_rate: f64,
}

impl WindowSample {
    fn angle(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pitch => self.pitch,
            Axis::Yaw => self.yaw,
        }
    }

    fn velocity(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pitch => self.pitch_velocity,
            Axis::Yaw => self.yaw_velocity,
        }
    }

    fn rate(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pitch => self.pitch_rate,
            Axis::Yaw => self.yaw_rate,
        }
    }
}

/// The slice of a profile that scores one gesture.
#[derive(Debug, Clone, Copy)]
struct AxisThresholds {
    amplitude: f64,
    velocity: f64,
    leakage_max: f64,
    min_crossings: u32,
}

impl AxisThresholds {
    fn for_gesture(profile: &ThresholdProfile, gesture: GestureKind) -> Self {
        match gesture {
            GestureKind::Nod => Self {
                amplitude: profile.nod_amplitude_threshold,
                velocity: profile.nod_velocity_threshold,
                leakage_max: profile.nod_cross_axis_leakage_max,
                min_crossings: profile.nod_min_crossings,
            },
            GestureKind::Shake => Self {
                amplitude: profile.shake_amplitude_threshold,
                velocity: profile.shake_velocity_threshold,
                leakage_max: profile.shake_cross_axis_leakage_max,
                min_crossings: profile.shake_min_crossings,
            },
        }
    }

    /// One fewer crossing than calibrated, but never zero.
    fn required_crossings(&self) -> usize {
        self.min_crossings.saturating_sub(1).max(1) as usize
    }
}

fn primary_axis(gesture: GestureKind) -> Axis {
    match gesture {
        GestureKind::Nod => Axis::Pitch,
        GestureKind::Shake => Axis::Yaw,
    }
}

fn normalized_score(value: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 0.0;
    }
    (value / (threshold * SCORE_HEADROOM)).min(1.0)
}

/// 1.0 up to `leakage_max`, linear down to 0 at 1.8 × `leakage_max`, 0 beyond.
pub fn cross_axis_penalty(leakage: f64, leakage_max: f64) -> f64 {
    if leakage <= leakage_max {
        return 1.0;
    }
    let cutoff = leakage_max * LEAKAGE_CUTOFF_FACTOR;
    if leakage >= cutoff {
        return 0.0;
    }
    1.0 - (leakage - leakage_max) / (cutoff - leakage_max)
}

/// Raw confidence in [0, 1] that the window holds `gesture`.
fn gesture_confidence(
    window: &VecDeque<WindowSample>,
    gesture: GestureKind,
    thresholds: &AxisThresholds,
) -> f64 {
    if window.len() < MIN_WINDOW_SAMPLES {
        return 0.0;
    }
    let axis = primary_axis(gesture);

    let amplitude = abs_percentile(window.iter().map(|s| s.angle(axis)), AMPLITUDE_PERCENTILE);
    let velocity = abs_percentile(window.iter().map(|s| s.velocity(axis)), VELOCITY_PERCENTILE);
    if amplitude < thresholds.amplitude || velocity < thresholds.velocity {
        return 0.0;
    }

    let deadband = thresholds.velocity * CROSSING_DEADBAND_FRACTION;
    let crossings = count_zero_crossings(window.iter().map(|s| s.velocity(axis)), deadband);
    if crossings < thresholds.required_crossings() {
        return 0.0;
    }

    // Only the other axis's amplitude counts as leakage, not its velocity.
    let other_amplitude =
        abs_percentile(window.iter().map(|s| s.angle(axis.other())), AMPLITUDE_PERCENTILE);
    let leakage = other_amplitude / amplitude.max(f64::EPSILON);
    let penalty = cross_axis_penalty(leakage, thresholds.leakage_max);
    if penalty <= 0.0 {
        return 0.0;
    }

    let rate = abs_percentile(window.iter().map(|s| s.rate(axis)), VELOCITY_PERCENTILE);
    let rhythm = (crossings as f64 / thresholds.min_crossings.max(1) as f64).min(1.0);

    let score = WEIGHT_AMPLITUDE * normalized_score(amplitude, thresholds.amplitude)
        + WEIGHT_VELOCITY * normalized_score(velocity, thresholds.velocity)
        + WEIGHT_RHYTHM * rhythm
        + WEIGHT_DYNAMIC * normalized_score(rate, thresholds.velocity);

    (score * penalty).clamp(0.0, 1.0)
}

/// Streaming nod/shake classifier.
///
/// Not synchronized: feed it from one context, one sample at a time.
pub struct GestureDetector {
    profile: ThresholdProfile,
    config: DetectorConfig,
    window: VecDeque<WindowSample>,

    // Unwrapped angles of the previous sample.
    last_pitch: f64,
    last_yaw: f64,
    last_timestamp: Option<f64>,

    nod_confidence: f64,
    shake_confidence: f64,

    candidate: Option<GestureKind>,
    streak: u32,
    last_fired_at: Option<f64>,
}

impl GestureDetector {
    pub fn new(profile: ThresholdProfile, config: DetectorConfig) -> Self {
        Self {
            profile: profile.sanitize(),
            config,
            window: VecDeque::with_capacity(64),
            last_pitch: 0.0,
            last_yaw: 0.0,
            last_timestamp: None,
            nod_confidence: 0.0,
            shake_confidence: 0.0,
            candidate: None,
            streak: 0,
            last_fired_at: None,
        }
    }

    pub fn with_profile(profile: ThresholdProfile) -> Self {
        Self::new(profile, DetectorConfig::default())
    }

    pub fn profile(&self) -> &ThresholdProfile {
        &self.profile
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Swap in a new profile and discard everything built under the old one.
    pub fn set_profile(&mut self, profile: ThresholdProfile) {
        self.profile = profile.sanitize();
        self.reset();
        log::debug!(
            "Detector profile replaced (fallback={})",
            self.profile.is_fallback()
        );
    }

    /// Forget window, smoothing, hysteresis and cooldown state.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_pitch = 0.0;
        self.last_yaw = 0.0;
        self.last_timestamp = None;
        self.nod_confidence = 0.0;
        self.shake_confidence = 0.0;
        self.candidate = None;
        self.streak = 0;
        self.last_fired_at = None;
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn nod_confidence(&self) -> f64 {
        self.nod_confidence
    }

    pub fn shake_confidence(&self) -> f64 {
        self.shake_confidence
    }

    pub fn last_fired_at(&self) -> Option<f64> {
        self.last_fired_at
    }

    /// Process one sample.
    pub fn ingest(&mut self, sample: &MotionSample) -> GestureDetectionResult {
        let timestamp = sample.timestamp;
        if let Some(last) = self.last_timestamp {
            if timestamp < last - WINDOW_SECONDS {
                log::debug!("Timestamp jumped back {:.3}s, resetting detector", last - timestamp);
                self.reset();
            }
        }

        self.push_sample(sample);
        self.trim_window(timestamp);

        let raw_nod = gesture_confidence(
            &self.window,
            GestureKind::Nod,
            &AxisThresholds::for_gesture(&self.profile, GestureKind::Nod),
        );
        let raw_shake = gesture_confidence(
            &self.window,
            GestureKind::Shake,
            &AxisThresholds::for_gesture(&self.profile, GestureKind::Shake),
        );

        let alpha = self.profile.diagnostic_smoothing.clamp(0.0, 1.0);
        self.nod_confidence = self.nod_confidence * alpha + raw_nod * (1.0 - alpha);
        self.shake_confidence = self.shake_confidence * alpha + raw_shake * (1.0 - alpha);

        let candidate = self.select_candidate();
        self.update_streak(candidate);

        let event = match candidate {
            Some(gesture) if self.streak >= HYSTERESIS_SAMPLES => self.try_fire(gesture, timestamp),
            _ => None,
        };

        GestureDetectionResult {
            raw_nod_confidence: raw_nod,
            raw_shake_confidence: raw_shake,
            nod_confidence: self.nod_confidence,
            shake_confidence: self.shake_confidence,
            candidate,
            event,
        }
    }

    /// Process samples in order, returning only fired events.
    pub fn ingest_all<'a, I>(&mut self, samples: I) -> Vec<GestureEvent>
    where
        I: IntoIterator<Item = &'a MotionSample>,
    {
        samples
            .into_iter()
            .filter_map(|sample| self.ingest(sample).event)
            .collect()
    }

    fn push_sample(&mut self, sample: &MotionSample) {
        let (pitch, yaw, pitch_velocity, yaw_velocity) = match self.last_timestamp {
            Some(last) => {
                let pitch = unwrap_angle(self.last_pitch, sample.pitch);
                let yaw = unwrap_angle(self.last_yaw, sample.yaw);
                let dt = (sample.timestamp - last).max(MIN_DT);
                (
                    pitch,
                    yaw,
                    (pitch - self.last_pitch) / dt,
                    (yaw - self.last_yaw) / dt,
                )
            }
            None => (sample.pitch, sample.yaw, 0.0, 0.0),
        };
        self.last_pitch = pitch;
        self.last_yaw = yaw;
        self.last_timestamp = Some(sample.timestamp);

        let deadzone = self.profile.neutral_deadzone;
        self.window.push_back(WindowSample {
            timestamp: sample.timestamp,
            pitch: apply_deadzone(wrap_angle(pitch - self.profile.baseline_pitch), deadzone),
            yaw: apply_deadzone(wrap_angle(yaw - self.profile.baseline_yaw), deadzone),
            pitch_velocity,
            yaw_velocity,
            pitch_rate: sample.rotation_rate[0].abs(),
            yaw_rate: sample.rotation_rate[2].abs(),
        });
    }

    fn trim_window(&mut self, now: f64) {
        let cutoff = now - WINDOW_SECONDS;
        while self.window.front().is_some_and(|s| s.timestamp < cutoff) {
            self.window.pop_front();
        }
    }

    fn select_candidate(&self) -> Option<GestureKind> {
        let best = self.nod_confidence.max(self.shake_confidence);
        if best < self.profile.min_confidence {
            return None;
        }
        if self.nod_confidence >= self.shake_confidence {
            Some(GestureKind::Nod)
        } else {
            Some(GestureKind::Shake)
        }
    }

    fn update_streak(&mut self, candidate: Option<GestureKind>) {
        self.streak = match candidate {
            None => 0,
            Some(gesture) if self.candidate == Some(gesture) => self.streak.saturating_add(1),
            Some(_) => 1,
        };
        self.candidate = candidate;
    }

    fn try_fire(&mut self, gesture: GestureKind, timestamp: f64) -> Option<GestureEvent> {
        let cooldown = self.profile.cooldown_seconds + self.config.extra_cooldown_seconds;
        let cooling = self
            .last_fired_at
            .is_some_and(|last| timestamp - last < cooldown);

        // Either way the window's energy is spent: a gesture made during the
        // cooldown must not fire late once the cooldown expires.
        self.window.clear();
        self.streak = 0;

        if cooling {
            log::trace!("{} suppressed by cooldown at t={:.3}", gesture.as_str(), timestamp);
            return None;
        }

        let confidence = match gesture {
            GestureKind::Nod => self.nod_confidence,
            GestureKind::Shake => self.shake_confidence,
        }
        .min(1.0);

        self.last_fired_at = Some(timestamp);
        log::debug!(
            "Gesture {} fired at t={:.3} (confidence {:.2})",
            gesture.as_str(),
            timestamp,
            confidence
        );
        Some(GestureEvent {
            gesture,
            timestamp,
            confidence,
        })
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::with_profile(ThresholdProfile::FALLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const RATE_HZ: f64 = 60.0;

    /// Profile used by the reference nod scenario.
    fn sensitive_profile() -> ThresholdProfile {
        ThresholdProfile {
            nod_amplitude_threshold: 0.1,
            nod_velocity_threshold: 0.45,
            min_confidence: 0.45,
            cooldown_seconds: 0.2,
            ..ThresholdProfile::FALLBACK
        }
    }

    /// pitch = a_p·sin(w_p·t), yaw = a_y·sin(w_y·t), with matching rotation rates.
    fn oscillation(t: f64, a_p: f64, w_p: f64, a_y: f64, w_y: f64) -> MotionSample {
        MotionSample::from_angles(t, a_p * (w_p * t).sin(), 0.0, a_y * (w_y * t).sin())
            .with_rotation_rate([a_p * w_p * (w_p * t).cos(), 0.0, a_y * w_y * (w_y * t).cos()])
    }

    fn at(i: usize) -> f64 {
        i as f64 / RATE_HZ
    }

    #[test]
    fn test_penalty_shape() {
        assert_eq!(cross_axis_penalty(0.5, 0.9), 1.0);
        assert_eq!(cross_axis_penalty(0.9, 0.9), 1.0);
        assert!((cross_axis_penalty(1.26, 0.9) - 0.5).abs() < 1e-9);
        assert_eq!(cross_axis_penalty(0.9 * 1.8, 0.9), 0.0);
        assert_eq!(cross_axis_penalty(5.0, 0.9), 0.0);
    }

    #[test]
    fn test_required_crossings_is_one_less_but_at_least_one() {
        let mut t = AxisThresholds::for_gesture(&ThresholdProfile::FALLBACK, GestureKind::Shake);
        t.min_crossings = 3;
        assert_eq!(t.required_crossings(), 2);
        t.min_crossings = 2;
        assert_eq!(t.required_crossings(), 1);
        t.min_crossings = 1;
        assert_eq!(t.required_crossings(), 1);
    }

    #[test]
    fn test_no_confidence_until_window_fills() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        for i in 0..7 {
            let result = detector.ingest(&oscillation(at(i), 0.3, 12.0, 0.0, 0.0));
            assert_eq!(result.raw_nod_confidence, 0.0);
            assert_eq!(result.raw_shake_confidence, 0.0);
            assert!(result.event.is_none());
        }
    }

    #[test]
    fn test_nod_scenario_fires_nod() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        let mut first = None;
        for i in 0..90 {
            let result = detector.ingest(&oscillation(at(i), 0.22, 12.0, 0.04, 5.0));
            if let Some(event) = result.event {
                first = Some((i, event));
                break;
            }
        }
        let (index, event) = first.expect("nod should fire within 90 samples");
        assert!(index < 90);
        assert_eq!(event.gesture, GestureKind::Nod);
        assert!(event.confidence >= 0.45 && event.confidence <= 1.0);
    }

    #[test]
    fn test_continuous_nodding_only_ever_fires_nod() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        let samples: Vec<_> = (0..90).map(|i| oscillation(at(i), 0.22, 12.0, 0.04, 5.0)).collect();
        let events = detector.ingest_all(&samples);
        // One event per nod cycle once the 0.2 s cooldown allows it.
        assert_eq!(events.len(), 6);
        assert_eq!(events.iter().filter(|e| e.timestamp < 0.3).count(), 1);
        assert!(events.iter().all(|e| e.gesture == GestureKind::Nod));
        for pair in events.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= 0.2);
        }
    }

    #[test]
    fn test_candidate_must_hold_two_samples() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        let results: Vec<_> = (0..30)
            .map(|i| detector.ingest(&oscillation(at(i), 0.22, 12.0, 0.04, 5.0)))
            .collect();

        let first = results
            .iter()
            .position(|r| r.candidate.is_some())
            .expect("nod should become a candidate");
        assert!(results[first].event.is_none());
        assert_eq!(results[first + 1].candidate, Some(GestureKind::Nod));
        assert!(results[first + 1].event.is_some());
    }

    #[test]
    fn test_single_sample_candidate_never_fires() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        let mut last = GestureDetectionResult::default();
        for i in 0..10 {
            last = detector.ingest(&oscillation(at(i), 0.22, 12.0, 0.04, 5.0));
        }
        assert_eq!(last.candidate, Some(GestureKind::Nod));
        assert!(last.event.is_none());

        // Sensor drops out for a second, then reports a still head.
        for k in 0..60 {
            let result = detector.ingest(&MotionSample::from_angles(1.2 + at(k), 0.0, 0.0, 0.0));
            assert!(result.event.is_none(), "fired {} samples after dropout", k);
        }
    }

    #[test]
    fn test_confidence_smoothing_follows_profile() {
        let profile = ThresholdProfile {
            diagnostic_smoothing: 0.5,
            cooldown_seconds: 3.0,
            ..sensitive_profile()
        };
        let mut detector = GestureDetector::with_profile(profile);
        let mut expected = 0.0;
        let mut lagged = false;
        for i in 0..90 {
            let result = detector.ingest(&oscillation(at(i), 0.22, 12.0, 0.04, 5.0));
            expected = expected * 0.5 + result.raw_nod_confidence * 0.5;
            assert!(
                (result.nod_confidence - expected).abs() < 1e-12,
                "sample {}: {} != {}",
                i,
                result.nod_confidence,
                expected
            );
            lagged |= result.raw_nod_confidence > 0.0 && result.nod_confidence < result.raw_nod_confidence;
        }
        assert!(lagged);
    }

    /// Window with pitch alternating ±`amplitude`, no yaw and constant rate.
    fn pitch_window(amplitude: f64, velocities: &[f64], rate: f64) -> VecDeque<WindowSample> {
        velocities
            .iter()
            .enumerate()
            .map(|(i, &velocity)| WindowSample {
                timestamp: at(i),
                pitch: if i % 2 == 0 { amplitude } else { -amplitude },
                yaw: 0.0,
                pitch_velocity: velocity,
                yaw_velocity: 0.0,
                pitch_rate: rate,
                yaw_rate: 0.0,
            })
            .collect()
    }

    fn nod_thresholds(min_crossings: u32) -> AxisThresholds {
        AxisThresholds {
            amplitude: 0.1,
            velocity: 1.0,
            leakage_max: 0.9,
            min_crossings,
        }
    }

    #[test]
    fn test_confidence_needs_eight_samples() {
        let alternating = |n: usize| -> Vec<f64> {
            (0..n).map(|i| if i % 2 == 0 { 1.24 } else { -1.24 }).collect()
        };
        let short = pitch_window(0.124, &alternating(7), 0.62);
        assert_eq!(gesture_confidence(&short, GestureKind::Nod, &nod_thresholds(2)), 0.0);

        let full = pitch_window(0.124, &alternating(8), 0.62);
        assert!(gesture_confidence(&full, GestureKind::Nod, &nod_thresholds(2)) > 0.0);
    }

    #[test]
    fn test_weighted_score() {
        // Amplitude and velocity at 0.8 of saturation, rhythm full, rate at 0.4.
        let velocities: Vec<f64> = (0..8).map(|i| if i % 2 == 0 { 1.24 } else { -1.24 }).collect();
        let window = pitch_window(0.124, &velocities, 0.62);
        let score = gesture_confidence(&window, GestureKind::Nod, &nod_thresholds(2));
        let expected = 0.38 * 0.8 + 0.34 * 0.8 + 0.16 * 1.0 + 0.12 * 0.4;
        assert!((score - expected).abs() < 1e-9, "score {}", score);
        // The same window scores nothing as a shake.
        assert_eq!(gesture_confidence(&window, GestureKind::Shake, &nod_thresholds(2)), 0.0);
    }

    #[test]
    fn test_crossings_ignore_velocity_inside_deadband() {
        // ±0.2 wobble sits inside the 0.3 dead band: only two real reversals.
        let wobble = [1.24, 0.2, -0.2, 0.2, -1.24, -0.2, 0.2, 1.24];
        let window = pitch_window(0.124, &wobble, 0.62);
        assert_eq!(count_zero_crossings(wobble.iter().copied(), 0.3), 2);

        // Three calibrated crossings require two; rhythm scores 2 of 3.
        let score = gesture_confidence(&window, GestureKind::Nod, &nod_thresholds(3));
        let expected = 0.38 * 0.8 + 0.34 * 0.8 + 0.16 * (2.0 / 3.0) + 0.12 * 0.4;
        assert!((score - expected).abs() < 1e-9, "score {}", score);

        // Four calibrated crossings require three, which the wobble cannot supply.
        assert_eq!(gesture_confidence(&window, GestureKind::Nod, &nod_thresholds(4)), 0.0);
    }

    #[test]
    fn test_deadzone_raises_effective_amplitude_floor() {
        // Peak 0.15 clears the 0.1 threshold raw, but not once 0.1 of dead zone is removed.
        let stream: Vec<_> = (0..120).map(|i| oscillation(at(i), 0.15, 12.0, 0.0, 5.0)).collect();

        let wide = ThresholdProfile {
            neutral_deadzone: 0.1,
            ..sensitive_profile()
        };
        let mut detector = GestureDetector::with_profile(wide);
        for sample in &stream {
            assert_eq!(detector.ingest(sample).raw_nod_confidence, 0.0);
        }

        let narrow = ThresholdProfile {
            neutral_deadzone: 0.02,
            ..sensitive_profile()
        };
        let mut detector = GestureDetector::with_profile(narrow);
        assert!(!detector.ingest_all(&stream).is_empty());
    }

    #[test]
    fn test_shake_scenario_fires_shake() {
        let mut detector = GestureDetector::default();
        let samples: Vec<_> = (0..90).map(|i| oscillation(at(i), 0.03, 5.0, 0.3, 11.0)).collect();
        let events = detector.ingest_all(&samples);
        assert!(!events.is_empty());
        assert_eq!(events[0].gesture, GestureKind::Shake);
    }

    #[test]
    fn test_below_amplitude_floor_never_fires() {
        let profile = sensitive_profile();
        let mut detector = GestureDetector::with_profile(profile);
        // Peak 0.08 < nod_amplitude_threshold (0.1), for 2.5 s.
        for i in 0..150 {
            let result = detector.ingest(&oscillation(at(i), 0.08, 12.0, 0.005, 5.0));
            assert!(result.event.is_none(), "fired at sample {}", i);
            assert_eq!(result.raw_nod_confidence, 0.0);
        }
    }

    #[test]
    fn test_still_head_has_zero_confidence() {
        let mut detector = GestureDetector::default();
        for i in 0..120 {
            let result = detector.ingest(&MotionSample::from_angles(at(i), 0.01, 0.0, -0.01));
            assert_eq!(result.nod_confidence, 0.0);
            assert_eq!(result.shake_confidence, 0.0);
            assert!(result.candidate.is_none());
        }
    }

    /// Nod bursts of 0.3 s starting at each time in `starts`; still otherwise.
    fn burst_stream(starts: &[f64], seconds: f64) -> Vec<MotionSample> {
        let duration = 0.3;
        (0..(seconds * RATE_HZ) as usize)
            .map(|i| {
                let t = at(i);
                match starts.iter().find(|&&s| t >= s && t < s + duration) {
                    Some(&start) => {
                        let phase = t - start;
                        MotionSample::from_angles(t, 0.22 * (14.0 * phase).sin(), 0.0, 0.0)
                            .with_rotation_rate([0.22 * 14.0 * (14.0 * phase).cos(), 0.0, 0.0])
                    }
                    None => MotionSample::from_angles(t, 0.0, 0.0, 0.0),
                }
            })
            .collect()
    }

    #[test]
    fn test_cooldown_gates_close_bursts() {
        let profile = ThresholdProfile {
            cooldown_seconds: 0.8,
            ..sensitive_profile()
        };

        // Two bursts 0.4 s apart: one event for the pair.
        let mut detector = GestureDetector::with_profile(profile);
        let pair = detector.ingest_all(&burst_stream(&[0.0, 0.4], 1.4));
        assert_eq!(pair.len(), 1);

        // A third burst 1.0 s after the second adds exactly one more.
        let mut detector = GestureDetector::with_profile(profile);
        let all = detector.ingest_all(&burst_stream(&[0.0, 0.4, 1.4], 2.4));
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.gesture == GestureKind::Nod));
        assert!(all[1].timestamp >= 1.4);
    }

    #[test]
    fn test_extra_cooldown_extends_gap() {
        let mut detector = GestureDetector::new(
            sensitive_profile(),
            DetectorConfig {
                extra_cooldown_seconds: 2.0,
            },
        );
        let samples: Vec<_> = (0..120).map(|i| oscillation(at(i), 0.22, 12.0, 0.0, 0.0)).collect();
        assert_eq!(detector.ingest_all(&samples).len(), 1);
    }

    #[test]
    fn test_dominant_other_axis_rejects_nod() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        // Yaw amplitude ~1.9x pitch amplitude: nod leakage beyond 1.8 x 0.9.
        for i in 0..120 {
            let result = detector.ingest(&oscillation(at(i), 0.22, 12.0, 0.42, 12.0));
            assert_eq!(result.raw_nod_confidence, 0.0);
            if let Some(event) = result.event {
                assert_eq!(event.gesture, GestureKind::Shake);
            }
        }
    }

    #[test]
    fn test_window_stays_bounded() {
        let mut detector = GestureDetector::default();
        for i in 0..600 {
            detector.ingest(&oscillation(at(i), 0.02, 3.0, 0.02, 2.0));
            let len = detector.window_len();
            assert!(len <= (0.9 * RATE_HZ) as usize + 1, "window of {} samples", len);
            if i >= 100 {
                assert!(len >= (0.9 * RATE_HZ) as usize, "window of {} samples", len);
            }
        }
    }

    #[test]
    fn test_shake_across_yaw_wrap() {
        // Looking backwards: yaw oscillates across ±π.
        let profile = ThresholdProfile {
            baseline_yaw: PI,
            ..ThresholdProfile::FALLBACK
        };
        let mut detector = GestureDetector::with_profile(profile);
        let samples: Vec<_> = (0..90)
            .map(|i| {
                let t = at(i);
                let yaw = wrap_angle(PI + 0.3 * (11.0 * t).sin());
                MotionSample::from_angles(t, 0.0, 0.0, yaw)
                    .with_rotation_rate([0.0, 0.0, 3.3 * (11.0 * t).cos()])
            })
            .collect();
        let events = detector.ingest_all(&samples);
        assert!(!events.is_empty());
        assert_eq!(events[0].gesture, GestureKind::Shake);
    }

    #[test]
    fn test_set_profile_discards_state() {
        let mut detector = GestureDetector::with_profile(sensitive_profile());
        for i in 0..20 {
            detector.ingest(&oscillation(at(i), 0.22, 12.0, 0.0, 0.0));
        }
        assert!(detector.window_len() > 0 || detector.last_fired_at().is_some());

        let mut replacement = ThresholdProfile::FALLBACK;
        replacement.nod_amplitude_threshold = 99.0;
        detector.set_profile(replacement);

        assert_eq!(detector.window_len(), 0);
        assert_eq!(detector.nod_confidence(), 0.0);
        assert!(detector.last_fired_at().is_none());
        // Stored sanitized.
        assert_eq!(detector.profile().nod_amplitude_threshold, 0.45);
    }

    #[test]
    fn test_large_backwards_jump_resets() {
        let mut detector = GestureDetector::default();
        for i in 0..30 {
            detector.ingest(&MotionSample::from_angles(10.0 + at(i), 0.0, 0.0, 0.0));
        }
        assert!(detector.window_len() > 1);
        detector.ingest(&MotionSample::from_angles(1.0, 0.0, 0.0, 0.0));
        assert_eq!(detector.window_len(), 1);
    }

    #[test]
    fn test_irregular_dt_is_tolerated() {
        let mut detector = GestureDetector::default();
        // Duplicate timestamps and gaps must not produce NaN.
        let times = [0.0, 0.0, 0.01, 0.2, 0.2, 0.21, 0.5, 0.9, 0.9];
        for (i, &t) in times.iter().enumerate() {
            let result = detector.ingest(&MotionSample::from_angles(t, 0.01 * i as f64, 0.0, 0.0));
            assert!(result.nod_confidence.is_finite());
            assert!(result.shake_confidence.is_finite());
        }
    }
}
