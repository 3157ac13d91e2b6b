use crate::types::CalibrationStage;
use std::fmt;

/// Errors surfaced by the gesture engine.
///
/// Missing data and below-threshold motion are never errors; only I/O,
/// decoding, invalid calibration transitions and pipeline shutdown are.
#[derive(Debug, thiserror::Error)]
pub enum NodshakeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot start a capture in calibration stage {0:?}")]
    CaptureNotAllowed(CalibrationStage),

    #[error("Stored profile version {found} does not match expected version {expected}")]
    ProfileVersionMismatch { found: u32, expected: u32 },

    #[error("Gesture pipeline stopped")]
    PipelineStopped,

    #[error("Timeout waiting for pipeline output")]
    Timeout,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &NodshakeError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
