//! Guided three-stage calibration: neutral → nod → shake → completed.
//!
//! Each stage captures `capture_duration_seconds` of raw pitch/yaw. When the
//! shake stage completes, the three buffers are reduced to a
//! [`ThresholdProfile`] via percentile statistics and zero-crossing counts,
//! sanitized, and persisted. Too little data in any stage yields exactly
//! [`ThresholdProfile::FALLBACK`].
//!
//! The engine has no timers: progress advances only with sample timestamps,
//! and a host abandons a capture simply by not feeding it (or by calling
//! [`CalibrationEngine::cancel_capture`]).

use crate::config::EngineConfig;
use crate::profile::{ThresholdProfile, PROFILE_VERSION};
use crate::stats::{
    abs_percentile, count_zero_crossings, finite_difference, median, unwrap_series, wrap_angle,
};
use crate::store::{self, MemoryProfileStore, ProfileStore};
use crate::types::{CalibrationStage, GestureCalibrationState, GestureKind, MotionSample};
use crate::{NodshakeError, Result};

/// Samples every stage buffer needs before a profile is computed.
pub const MIN_STAGE_SAMPLES: usize = 8;
/// Hard cap on a single stage buffer.
pub const MAX_STAGE_SAMPLES: usize = 4096;

const MIN_DT: f64 = 1.0 / 120.0;
const NOISE_PERCENTILE: f64 = 0.95;
const AMPLITUDE_PERCENTILE: f64 = 0.90;
const MIN_DEADZONE: f64 = 0.02;
const DEADZONE_NOISE_FACTOR: f64 = 2.2;
const NOD_CROSSING_FLOOR: f64 = 0.18;
const SHAKE_CROSSING_FLOOR: f64 = 0.20;
/// Fraction of the demonstrated crossing rate the detector must see.
const CROSSING_RATE_FRACTION: f64 = 0.7;
const LEAKAGE_MARGIN: f64 = 1.5;
const LEAKAGE_BOUNDS: (f64, f64) = (0.80, 1.20);

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    pub capture_duration_seconds: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            capture_duration_seconds: 2.2,
        }
    }
}

impl From<&EngineConfig> for CalibrationConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            capture_duration_seconds: config.capture_duration_seconds,
        }
    }
}

/// Raw reading retained during a capture stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSample {
    pub timestamp: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl From<&MotionSample> for CaptureSample {
    fn from(sample: &MotionSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            pitch: sample.pitch,
            yaw: sample.yaw,
        }
    }
}

/// Per-axis series of a buffer, unwrapped and relative to the baseline.
struct RelativeSeries {
    timestamps: Vec<f64>,
    pitch: Vec<f64>,
    yaw: Vec<f64>,
}

impl RelativeSeries {
    fn new(buffer: &[CaptureSample], baseline_pitch: f64, baseline_yaw: f64) -> Self {
        let timestamps = buffer.iter().map(|s| s.timestamp).collect();
        let pitch = unwrap_series(&buffer.iter().map(|s| s.pitch).collect::<Vec<_>>())
            .into_iter()
            .map(|p| wrap_angle(p - baseline_pitch))
            .collect();
        let yaw = unwrap_series(&buffer.iter().map(|s| s.yaw).collect::<Vec<_>>())
            .into_iter()
            .map(|y| wrap_angle(y - baseline_yaw))
            .collect();
        Self {
            timestamps,
            pitch,
            yaw,
        }
    }

    fn span(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => (last - first).max(MIN_DT),
            _ => MIN_DT,
        }
    }
}

/// What a demonstrated gesture looked like on its primary axis.
#[derive(Debug, Clone, Copy)]
struct GestureStats {
    amplitude: f64,
    velocity: f64,
    leakage: f64,
    crossings: usize,
    span: f64,
}

impl GestureStats {
    fn measure(series: &RelativeSeries, gesture: GestureKind) -> Self {
        let (primary, other, floor) = match gesture {
            GestureKind::Nod => (&series.pitch, &series.yaw, NOD_CROSSING_FLOOR),
            GestureKind::Shake => (&series.yaw, &series.pitch, SHAKE_CROSSING_FLOOR),
        };
        let velocities = finite_difference(&series.timestamps, primary, MIN_DT);

        let amplitude = abs_percentile(primary.iter().copied(), AMPLITUDE_PERCENTILE);
        let velocity = abs_percentile(velocities.iter().copied(), AMPLITUDE_PERCENTILE);
        let other_amplitude = abs_percentile(other.iter().copied(), AMPLITUDE_PERCENTILE);
        let deadband = floor.max(velocity * 0.3);

        Self {
            amplitude,
            velocity,
            leakage: other_amplitude / amplitude.max(f64::EPSILON),
            crossings: count_zero_crossings(velocities.iter().copied(), deadband),
            span: series.span(),
        }
    }

    /// Crossings the detector should expect inside one detection window.
    fn min_crossings(&self, max: u32) -> u32 {
        let per_window = self.crossings as f64 * crate::detector::WINDOW_SECONDS / self.span;
        let expected = (per_window * CROSSING_RATE_FRACTION).round();
        (expected.max(1.0) as u32).min(max)
    }

    fn leakage_max(&self) -> f64 {
        (self.leakage * LEAKAGE_MARGIN).clamp(LEAKAGE_BOUNDS.0, LEAKAGE_BOUNDS.1)
    }
}

/// Threshold sitting between the noise floor and the demonstrated gesture.
fn derive_threshold(noise_term: f64, demonstrated: f64, floor: f64, ceiling: f64) -> f64 {
    noise_term.max(demonstrated).clamp(floor, ceiling)
}

/// Reduce the three stage buffers to a profile (unsanitized).
///
/// Any buffer shorter than [`MIN_STAGE_SAMPLES`] yields the fallback profile.
pub fn compute_profile(
    neutral: &[CaptureSample],
    nod: &[CaptureSample],
    shake: &[CaptureSample],
) -> ThresholdProfile {
    if neutral.len() < MIN_STAGE_SAMPLES
        || nod.len() < MIN_STAGE_SAMPLES
        || shake.len() < MIN_STAGE_SAMPLES
    {
        return ThresholdProfile::FALLBACK;
    }

    let neutral_pitch = unwrap_series(&neutral.iter().map(|s| s.pitch).collect::<Vec<_>>());
    let neutral_yaw = unwrap_series(&neutral.iter().map(|s| s.yaw).collect::<Vec<_>>());
    let baseline_pitch = median(&neutral_pitch);
    let baseline_yaw = median(&neutral_yaw);

    let pitch_noise =
        abs_percentile(neutral_pitch.iter().map(|p| p - baseline_pitch), NOISE_PERCENTILE);
    let yaw_noise = abs_percentile(neutral_yaw.iter().map(|y| y - baseline_yaw), NOISE_PERCENTILE);
    let deadzone = MIN_DEADZONE.max(DEADZONE_NOISE_FACTOR * pitch_noise.max(yaw_noise));

    let nod_stats = GestureStats::measure(
        &RelativeSeries::new(nod, baseline_pitch, baseline_yaw),
        GestureKind::Nod,
    );
    let shake_stats = GestureStats::measure(
        &RelativeSeries::new(shake, baseline_pitch, baseline_yaw),
        GestureKind::Shake,
    );
    log::debug!("Nod capture stats: {:?}", nod_stats);
    log::debug!("Shake capture stats: {:?}", shake_stats);

    ThresholdProfile {
        baseline_pitch: wrap_angle(baseline_pitch),
        baseline_yaw: wrap_angle(baseline_yaw),
        neutral_deadzone: deadzone,
        nod_amplitude_threshold: derive_threshold(
            deadzone * 1.6,
            nod_stats.amplitude * 0.42,
            0.06,
            0.35,
        ),
        nod_velocity_threshold: derive_threshold(
            deadzone * 6.0,
            nod_stats.velocity * 0.42,
            0.30,
            2.2,
        ),
        shake_amplitude_threshold: derive_threshold(
            deadzone * 1.8,
            shake_stats.amplitude * 0.44,
            0.07,
            0.40,
        ),
        shake_velocity_threshold: derive_threshold(
            deadzone * 6.0,
            shake_stats.velocity * 0.44,
            0.35,
            2.5,
        ),
        nod_cross_axis_leakage_max: nod_stats.leakage_max(),
        shake_cross_axis_leakage_max: shake_stats.leakage_max(),
        nod_min_crossings: nod_stats.min_crossings(2),
        shake_min_crossings: shake_stats.min_crossings(3),
        diagnostic_smoothing: ThresholdProfile::FALLBACK.diagnostic_smoothing,
        min_confidence: ThresholdProfile::FALLBACK.min_confidence,
        cooldown_seconds: ThresholdProfile::FALLBACK.cooldown_seconds,
        version: PROFILE_VERSION,
    }
}

/// Drives the capture state machine and owns the active profile.
pub struct CalibrationEngine {
    config: CalibrationConfig,
    state: GestureCalibrationState,
    neutral: Vec<CaptureSample>,
    nod: Vec<CaptureSample>,
    shake: Vec<CaptureSample>,
    capture_started_at: Option<f64>,
    profile: ThresholdProfile,
    store: Box<dyn ProfileStore + Send>,
}

impl CalibrationEngine {
    /// Create an engine, loading any stored profile.
    pub fn new(store: Box<dyn ProfileStore + Send>, config: CalibrationConfig) -> Self {
        let mut engine = Self {
            config,
            state: GestureCalibrationState::default(),
            neutral: Vec::new(),
            nod: Vec::new(),
            shake: Vec::new(),
            capture_started_at: None,
            profile: ThresholdProfile::FALLBACK,
            store,
        };
        engine.reload_profile();
        engine
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryProfileStore::new()), CalibrationConfig::default())
    }

    pub fn state(&self) -> &GestureCalibrationState {
        &self.state
    }

    /// The active profile; the fallback until a calibration completes.
    pub fn profile(&self) -> ThresholdProfile {
        self.profile
    }

    pub fn has_profile(&self) -> bool {
        self.state.has_profile
    }

    /// Re-read the store, falling back when nothing usable is there.
    pub fn reload_profile(&mut self) {
        match store::load_profile(self.store.as_mut()) {
            Some(profile) => {
                log::info!("Loaded stored gesture profile (v{})", profile.version);
                self.profile = profile;
                self.state = GestureCalibrationState {
                    stage: CalibrationStage::Completed,
                    message: CalibrationStage::Completed.prompt().to_string(),
                    has_profile: true,
                    ..GestureCalibrationState::default()
                };
            }
            None => {
                self.profile = ThresholdProfile::FALLBACK;
                self.state = GestureCalibrationState::default();
            }
        }
    }

    /// Reset every buffer and enter the neutral stage.
    pub fn start_calibration(&mut self) {
        self.clear_buffers();
        self.enter_stage(CalibrationStage::Neutral);
        log::info!("Calibration started");
    }

    /// Begin capturing for the current stage, discarding that stage's buffer.
    pub fn begin_capture_for_current_stage(&mut self) -> Result<()> {
        let stage = self.state.stage;
        if !stage.is_capture_stage() {
            return Err(NodshakeError::CaptureNotAllowed(stage));
        }
        if let Some(buffer) = self.buffer_mut(stage) {
            buffer.clear();
        }
        self.capture_started_at = None;
        self.state.is_capturing = true;
        self.state.progress = 0.0;
        self.state.message = stage.prompt().to_string();
        log::debug!("Capture started for {:?}", stage);
        Ok(())
    }

    /// Abandon an in-flight capture, staying in the same stage.
    pub fn cancel_capture(&mut self) {
        if !self.state.is_capturing {
            return;
        }
        let stage = self.state.stage;
        if let Some(buffer) = self.buffer_mut(stage) {
            buffer.clear();
        }
        self.capture_started_at = None;
        self.state.is_capturing = false;
        self.state.progress = 0.0;
        log::debug!("Capture cancelled for {:?}", stage);
    }

    /// Feed one raw sample. No-op unless a capture is running.
    ///
    /// Returns the newly entered stage when this sample finished a capture.
    pub fn ingest(&mut self, sample: &MotionSample) -> Option<CalibrationStage> {
        if !self.state.is_capturing {
            return None;
        }
        let stage = self.state.stage;
        let started = *self.capture_started_at.get_or_insert(sample.timestamp);

        if let Some(buffer) = self.buffer_mut(stage) {
            if buffer.len() < MAX_STAGE_SAMPLES {
                buffer.push(CaptureSample::from(sample));
            }
        }

        let duration = self.config.capture_duration_seconds.max(f64::EPSILON);
        let elapsed = (sample.timestamp - started).max(0.0);
        self.state.progress = (elapsed / duration).min(1.0);

        if self.state.progress >= 1.0 {
            Some(self.finish_stage(stage))
        } else {
            None
        }
    }

    /// Skip the capture and use the fallback profile as the calibrated one.
    pub fn skip_calibration_and_use_fallback(&mut self) {
        self.clear_buffers();
        self.profile = ThresholdProfile::FALLBACK;
        if let Err(e) = store::save_profile(self.store.as_mut(), &self.profile) {
            log::warn!("Failed to persist fallback profile: {}", e);
        }
        self.enter_stage(CalibrationStage::Completed);
        self.state.has_profile = true;
        self.state.message = "Using default gesture thresholds.".to_string();
        log::info!("Calibration skipped, using fallback profile");
    }

    /// Delete the stored profile and return to the initial, profile-less state.
    ///
    /// In-memory state is reset even if the store fails.
    pub fn clear_calibration_profile(&mut self) -> Result<()> {
        self.clear_buffers();
        self.profile = ThresholdProfile::FALLBACK;
        self.state = GestureCalibrationState::default();
        log::info!("Calibration profile cleared");
        store::clear_profile(self.store.as_mut())
    }

    fn finish_stage(&mut self, stage: CalibrationStage) -> CalibrationStage {
        self.state.is_capturing = false;
        self.capture_started_at = None;
        let next = stage.next();
        log::info!("Calibration stage {:?} captured, entering {:?}", stage, next);

        if next == CalibrationStage::Completed {
            self.complete();
        } else {
            self.enter_stage(next);
        }
        next
    }

    fn complete(&mut self) {
        let computed = compute_profile(&self.neutral, &self.nod, &self.shake);
        let sanitized = computed.sanitize();
        if sanitized != computed {
            log::warn!("Computed profile was out of range and has been sanitized");
        }

        self.profile = match store::save_profile(self.store.as_mut(), &sanitized) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Failed to persist gesture profile: {}", e);
                sanitized
            }
        };
        self.clear_buffers();

        self.enter_stage(CalibrationStage::Completed);
        self.state.has_profile = true;
        if self.profile.is_fallback() {
            self.state.message =
                "Not enough motion was captured; using default gesture thresholds.".to_string();
            log::warn!("Calibration fell back to default thresholds");
        } else {
            log::info!(
                "Calibration complete: nod amp {:.3} vel {:.3}, shake amp {:.3} vel {:.3}",
                self.profile.nod_amplitude_threshold,
                self.profile.nod_velocity_threshold,
                self.profile.shake_amplitude_threshold,
                self.profile.shake_velocity_threshold
            );
        }
    }

    fn enter_stage(&mut self, stage: CalibrationStage) {
        self.state.stage = stage;
        self.state.is_capturing = false;
        self.state.progress = if stage == CalibrationStage::Completed { 1.0 } else { 0.0 };
        self.state.message = stage.prompt().to_string();
        self.capture_started_at = None;
    }

    fn buffer_mut(&mut self, stage: CalibrationStage) -> Option<&mut Vec<CaptureSample>> {
        match stage {
            CalibrationStage::Neutral => Some(&mut self.neutral),
            CalibrationStage::Nod => Some(&mut self.nod),
            CalibrationStage::Shake => Some(&mut self.shake),
            CalibrationStage::NotStarted | CalibrationStage::Completed => None,
        }
    }

    fn clear_buffers(&mut self) {
        self.neutral.clear();
        self.nod.clear();
        self.shake.clear();
        self.capture_started_at = None;
    }
}
