//! C FFI layer for nodshake.
//!
//! Provides an opaque handle-based API for C/C++/Swift hosts.
//! The generated C header is written to `include/nodshake.h` by cbindgen.
//!
//! Handles are not thread-safe: call each one from a single thread.

use crate::detector::GestureDetector;
use crate::error::LastError;
use crate::filter::{PoseFilter, SmoothingConfig};
use crate::profile::ThresholdProfile;
use crate::types::{GestureDetectionResult, GestureKind, MotionPose, MotionSample};
use crate::NodshakeError;
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

pub const NS_GESTURE_NONE: c_int = -1;
pub const NS_GESTURE_NOD: c_int = 0;
pub const NS_GESTURE_SHAKE: c_int = 1;

/// Opaque detector handle for C consumers.
pub struct NsDetector(GestureDetector);

/// Opaque pose filter handle for C consumers.
pub struct NsPoseFilter(PoseFilter);

/// Motion sample in C-compatible layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NsMotionSample {
    /// Monotonic timestamp in seconds.
    pub timestamp: f64,
    /// Angles in radians, wrapped to ±π.
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    /// Angular rate [pitch, roll, yaw] in rad/s.
    pub rotation_rate: [f64; 3],
}

impl From<&NsMotionSample> for MotionSample {
    fn from(s: &NsMotionSample) -> Self {
        MotionSample::from_angles(s.timestamp, s.pitch, s.roll, s.yaw).with_rotation_rate(s.rotation_rate)
    }
}

/// Per-sample detector output in C-compatible layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NsDetectionResult {
    pub raw_nod_confidence: f64,
    pub raw_shake_confidence: f64,
    pub nod_confidence: f64,
    pub shake_confidence: f64,
    /// One of the `NS_GESTURE_*` constants.
    pub candidate: c_int,
    /// Whether an event fired on this sample.
    pub fired: bool,
    /// Fired gesture (`NS_GESTURE_*`), `NS_GESTURE_NONE` if nothing fired.
    pub event_gesture: c_int,
    pub event_timestamp: f64,
    pub event_confidence: f64,
}

fn gesture_code(gesture: Option<GestureKind>) -> c_int {
    match gesture {
        Some(GestureKind::Nod) => NS_GESTURE_NOD,
        Some(GestureKind::Shake) => NS_GESTURE_SHAKE,
        None => NS_GESTURE_NONE,
    }
}

impl From<&GestureDetectionResult> for NsDetectionResult {
    fn from(r: &GestureDetectionResult) -> Self {
        Self {
            raw_nod_confidence: r.raw_nod_confidence,
            raw_shake_confidence: r.raw_shake_confidence,
            nod_confidence: r.nod_confidence,
            shake_confidence: r.shake_confidence,
            candidate: gesture_code(r.candidate),
            fired: r.event.is_some(),
            event_gesture: gesture_code(r.event.map(|e| e.gesture)),
            event_timestamp: r.event.map_or(0.0, |e| e.timestamp),
            event_confidence: r.event.map_or(0.0, |e| e.confidence),
        }
    }
}

/// Head orientation in radians.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NsPose {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl From<NsPose> for MotionPose {
    fn from(p: NsPose) -> Self {
        MotionPose::new(p.pitch, p.roll, p.yaw)
    }
}

impl From<MotionPose> for NsPose {
    fn from(p: MotionPose) -> Self {
        Self {
            pitch: p.pitch,
            roll: p.roll,
            yaw: p.yaw,
        }
    }
}

fn invalid(what: &str) -> c_int {
    LAST_ERROR.set(&NodshakeError::InvalidArgument(format!("{} is null", what)));
    -1
}

/// The built-in default profile.
#[no_mangle]
pub extern "C" fn ns_profile_fallback() -> ThresholdProfile {
    ThresholdProfile::FALLBACK
}

/// Clamp every field of `profile` into its legal range, writing to `out`.
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `profile` and `out` must be valid pointers, or null. They may alias.
#[no_mangle]
pub unsafe extern "C" fn ns_profile_sanitize(
    profile: *const ThresholdProfile,
    out: *mut ThresholdProfile,
) -> c_int {
    if profile.is_null() {
        return invalid("profile");
    }
    if out.is_null() {
        return invalid("out");
    }
    let sanitized = (*profile).sanitize();
    out.write(sanitized);
    0
}

/// Create a detector. A null `profile` uses the fallback profile.
///
/// # Safety
/// `profile` must be a valid pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ns_detector_new(profile: *const ThresholdProfile) -> *mut NsDetector {
    let profile = if profile.is_null() {
        ThresholdProfile::FALLBACK
    } else {
        *profile
    };
    Box::into_raw(Box::new(NsDetector(GestureDetector::with_profile(profile))))
}

/// Free a detector.
///
/// # Safety
/// `detector` must be a pointer returned by `ns_detector_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn ns_detector_free(detector: *mut NsDetector) {
    if !detector.is_null() {
        drop(Box::from_raw(detector));
    }
}

/// Feed one sample. Returns 1 if a gesture fired, 0 if not, -1 on error.
/// `out` may be null when the caller only needs the return code.
///
/// # Safety
/// `detector` and `sample` must be valid pointers, or null. `out` must be a
/// valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn ns_detector_ingest(
    detector: *mut NsDetector,
    sample: *const NsMotionSample,
    out: *mut NsDetectionResult,
) -> c_int {
    if detector.is_null() {
        return invalid("detector");
    }
    if sample.is_null() {
        return invalid("sample");
    }
    let detector = &mut *detector;
    let result = detector.0.ingest(&MotionSample::from(&*sample));
    if !out.is_null() {
        out.write(NsDetectionResult::from(&result));
    }
    c_int::from(result.event.is_some())
}

/// Replace the detector's profile (sanitized) and reset its state.
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `detector` and `profile` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn ns_detector_set_profile(
    detector: *mut NsDetector,
    profile: *const ThresholdProfile,
) -> c_int {
    if detector.is_null() {
        return invalid("detector");
    }
    if profile.is_null() {
        return invalid("profile");
    }
    (*detector).0.set_profile(*profile);
    0
}

/// Discard the detector's window, smoothing and cooldown state.
///
/// # Safety
/// `detector` must be a valid pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ns_detector_reset(detector: *mut NsDetector) {
    if !detector.is_null() {
        (*detector).0.reset();
    }
}

/// Create a pose filter with time constant `tau` seconds.
#[no_mangle]
pub extern "C" fn ns_pose_filter_new(tau: f64) -> *mut NsPoseFilter {
    let filter = PoseFilter::new(SmoothingConfig { time_constant: tau });
    Box::into_raw(Box::new(NsPoseFilter(filter)))
}

/// Free a pose filter.
///
/// # Safety
/// `filter` must be a pointer returned by `ns_pose_filter_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn ns_pose_filter_free(filter: *mut NsPoseFilter) {
    if !filter.is_null() {
        drop(Box::from_raw(filter));
    }
}

/// Blend `target` into the filter and write the smoothed pose to `out`.
/// `live_graph` selects the faster blend range. Returns 0 on success, -1 on error.
///
/// # Safety
/// `filter` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn ns_pose_filter_update(
    filter: *mut NsPoseFilter,
    target: NsPose,
    timestamp: f64,
    live_graph: bool,
    out: *mut NsPose,
) -> c_int {
    if filter.is_null() {
        return invalid("filter");
    }
    if out.is_null() {
        return invalid("out");
    }
    let filter = &mut (*filter).0;
    filter.set_live_graph(live_graph);
    let pose = filter.update(target.into(), timestamp);
    out.write(pose.into());
    0
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next nodshake API call.
#[no_mangle]
pub extern "C" fn ns_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn nod(i: usize) -> NsMotionSample {
        let t = i as f64 / 60.0;
        NsMotionSample {
            timestamp: t,
            pitch: 0.22 * (12.0 * t).sin(),
            roll: 0.0,
            yaw: 0.04 * (5.0 * t).sin(),
            rotation_rate: [2.64 * (12.0 * t).cos(), 0.0, 0.2 * (5.0 * t).cos()],
        }
    }

    #[test]
    fn test_detector_lifecycle_fires_nod() {
        let profile = ThresholdProfile {
            nod_amplitude_threshold: 0.1,
            nod_velocity_threshold: 0.45,
            min_confidence: 0.45,
            cooldown_seconds: 0.2,
            ..ThresholdProfile::FALLBACK
        };
        unsafe {
            let detector = ns_detector_new(&profile);
            assert!(!detector.is_null());

            let mut out = NsDetectionResult::from(&GestureDetectionResult::default());
            let mut fired = None;
            for i in 0..120 {
                if ns_detector_ingest(detector, &nod(i), &mut out) == 1 {
                    fired = Some(out);
                    break;
                }
            }
            let fired = fired.expect("nod did not fire");
            assert!(fired.fired);
            assert_eq!(fired.event_gesture, NS_GESTURE_NOD);
            assert!(fired.event_confidence >= 0.45);

            ns_detector_reset(detector);
            ns_detector_free(detector);
        }
    }

    #[test]
    fn test_null_pointers_report_errors() {
        unsafe {
            let sample = nod(0);
            assert_eq!(ns_detector_ingest(ptr::null_mut(), &sample, ptr::null_mut()), -1);
            let msg = CStr::from_ptr(ns_last_error()).to_str().unwrap();
            assert!(msg.contains("detector"));

            assert_eq!(ns_profile_sanitize(ptr::null(), ptr::null_mut()), -1);
            assert_eq!(ns_pose_filter_update(ptr::null_mut(), NsPose { pitch: 0.0, roll: 0.0, yaw: 0.0 }, 0.0, false, ptr::null_mut()), -1);

            ns_detector_reset(ptr::null_mut());
            ns_detector_free(ptr::null_mut());
            ns_pose_filter_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_sanitize_in_place() {
        let mut profile = ThresholdProfile {
            nod_amplitude_threshold: 9.0,
            cooldown_seconds: f64::NAN,
            ..ns_profile_fallback()
        };
        let p: *mut ThresholdProfile = &mut profile;
        unsafe {
            assert_eq!(ns_profile_sanitize(p, p), 0);
        }
        assert!(profile.is_sanitized());
        assert_eq!(profile.nod_amplitude_threshold, 0.45);
        assert_eq!(profile.cooldown_seconds, ThresholdProfile::FALLBACK.cooldown_seconds);
    }

    #[test]
    fn test_pose_filter_snaps_then_smooths() {
        unsafe {
            let filter = ns_pose_filter_new(0.12);
            let mut out = NsPose { pitch: 9.0, roll: 9.0, yaw: 9.0 };
            let first = NsPose { pitch: 0.5, roll: 0.0, yaw: 0.0 };
            assert_eq!(ns_pose_filter_update(filter, first, 0.0, false, &mut out), 0);
            assert_eq!(out.pitch, 0.5);

            let zero = NsPose { pitch: 0.0, roll: 0.0, yaw: 0.0 };
            assert_eq!(ns_pose_filter_update(filter, zero, 1.0 / 60.0, false, &mut out), 0);
            assert!(out.pitch > 0.0 && out.pitch < 0.5);
            ns_pose_filter_free(filter);
        }
    }
}
