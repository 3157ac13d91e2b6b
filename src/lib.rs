//! # nodshake - head gesture detection for wearable motion sensors
//!
//! Turns a stream of head-orientation samples (earbuds, headsets) into
//! discrete "nod" / "shake" events. Provides:
//! - A streaming detector with per-user thresholds, hysteresis and cooldown
//! - A guided calibration engine that derives those thresholds
//! - Versioned JSON profile persistence
//! - Pose smoothing and streaming policy helpers for the host UI
//! - Gesture-to-action routing
//! - C FFI for integration with C/C++/Swift
//!
//! ## Quick Start
//! ```no_run
//! use nodshake::{GestureDetector, MotionSample, ThresholdProfile};
//!
//! let mut detector = GestureDetector::with_profile(ThresholdProfile::FALLBACK);
//! for i in 0..120 {
//!     let t = i as f64 / 60.0;
//!     let sample = MotionSample::from_angles(t, 0.2 * (12.0 * t).sin(), 0.0, 0.0);
//!     if let Some(event) = detector.ingest(&sample).event {
//!         println!("{} at {:.2}s", event.gesture.as_str(), event.timestamp);
//!     }
//! }
//! ```

pub mod error;
pub mod types;
pub mod stats;
pub mod profile;
pub mod store;
pub mod config;
pub mod detector;
pub mod calibration;
pub mod filter;
pub mod policy;
pub mod router;
pub mod pipeline;
pub mod ffi;

pub use calibration::{CalibrationConfig, CalibrationEngine};
pub use config::EngineConfig;
pub use detector::{DetectorConfig, GestureDetector};
pub use error::NodshakeError;
pub use filter::{PoseFilter, SmoothingConfig};
pub use pipeline::{GesturePipeline, PipelineConfig, PipelineEvent};
pub use policy::{PanelTab, PolicyInputs, StreamingDecision};
pub use profile::{ThresholdProfile, PROFILE_VERSION};
pub use router::{ActionExecutor, ActionMapping, ActionOutcome, ActionRouter, GestureAction};
pub use store::{FileProfileStore, MemoryProfileStore, ProfileStore};
pub use types::*;

/// Result type alias for nodshake operations.
pub type Result<T> = std::result::Result<T, NodshakeError>;
