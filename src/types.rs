/// Where on the body the motion sensor sits.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorLocation {
    #[default]
    Unknown = 0,
    Default = 1,
    LeftEar = 2,
    RightEar = 3,
}

impl SensorLocation {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Default,
            2 => Self::LeftEar,
            3 => Self::RightEar,
            _ => Self::Unknown,
        }
    }
}

/// One head-orientation reading from the wearable sensor driver.
///
/// Produced by the host, consumed read-only by every component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Monotonic timestamp in seconds.
    pub timestamp: f64,
    /// Rotation about the lateral axis in radians, wrapped to ±π.
    pub pitch: f64,
    /// Rotation about the longitudinal axis in radians, wrapped to ±π.
    pub roll: f64,
    /// Rotation about the vertical axis in radians, wrapped to ±π.
    pub yaw: f64,
    /// Angular rate [pitch, roll, yaw] in rad/s.
    pub rotation_rate: [f64; 3],
    /// Gravity direction [x, y, z] in g.
    pub gravity: [f64; 3],
    /// Acceleration with gravity removed [x, y, z] in g.
    pub user_acceleration: [f64; 3],
    /// Orientation quaternion [qx, qy, qz, qw].
    pub quaternion: [f64; 4],
    pub location: SensorLocation,
}

impl MotionSample {
    /// Sample carrying only orientation angles; every vector is zero and the
    /// quaternion is identity.
    pub fn from_angles(timestamp: f64, pitch: f64, roll: f64, yaw: f64) -> Self {
        Self {
            timestamp,
            pitch,
            roll,
            yaw,
            rotation_rate: [0.0; 3],
            gravity: [0.0, 0.0, -1.0],
            user_acceleration: [0.0; 3],
            quaternion: [0.0, 0.0, 0.0, 1.0],
            location: SensorLocation::Unknown,
        }
    }

    /// Build a sample from an orientation quaternion [qx, qy, qz, qw],
    /// deriving the Euler angles from it.
    pub fn from_quaternion(timestamp: f64, quaternion: [f64; 4], rotation_rate: [f64; 3]) -> Self {
        let pose = MotionPose::from_quaternion(quaternion);
        Self {
            rotation_rate,
            quaternion,
            ..Self::from_angles(timestamp, pose.pitch, pose.roll, pose.yaw)
        }
    }

    pub fn with_rotation_rate(mut self, rotation_rate: [f64; 3]) -> Self {
        self.rotation_rate = rotation_rate;
        self
    }

    pub fn pose(&self) -> MotionPose {
        MotionPose {
            pitch: self.pitch,
            roll: self.roll,
            yaw: self.yaw,
        }
    }
}

/// Head orientation in radians.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionPose {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl MotionPose {
    pub const ZERO: MotionPose = MotionPose {
        pitch: 0.0,
        roll: 0.0,
        yaw: 0.0,
    };

    pub fn new(pitch: f64, roll: f64, yaw: f64) -> Self {
        Self { pitch, roll, yaw }
    }

    /// Convert a quaternion [qx, qy, qz, qw] to pitch (x), roll (y), yaw (z).
    ///
    ///   pitch = atan2(2(wx + yz), 1 - 2(x² + y²))
    ///   roll  = asin(2(wy - zx))
    ///   yaw   = atan2(2(wz + xy), 1 - 2(y² + z²))
    pub fn from_quaternion(q: [f64; 4]) -> Self {
        let [x, y, z, w] = q;
        let pitch = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let roll = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
        Self { pitch, roll, yaw }
    }

    /// Angles in degrees [pitch, roll, yaw], for display.
    pub fn to_degrees(&self) -> [f64; 3] {
        [
            self.pitch.to_degrees(),
            self.roll.to_degrees(),
            self.yaw.to_degrees(),
        ]
    }
}

/// The two recognized head gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// Up-down oscillation on pitch ("yes").
    Nod,
    /// Left-right oscillation on yaw ("no").
    Shake,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nod => "nod",
            Self::Shake => "shake",
        }
    }
}

/// A discrete, fired gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub gesture: GestureKind,
    /// Timestamp of the sample that fired the event.
    pub timestamp: f64,
    /// Smoothed confidence of the winning axis, in [0, 1].
    pub confidence: f64,
}

/// Per-sample diagnostic output of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureDetectionResult {
    pub raw_nod_confidence: f64,
    pub raw_shake_confidence: f64,
    /// Exponentially smoothed nod confidence.
    pub nod_confidence: f64,
    /// Exponentially smoothed shake confidence.
    pub shake_confidence: f64,
    pub candidate: Option<GestureKind>,
    pub event: Option<GestureEvent>,
}

/// Stages of the guided calibration capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationStage {
    #[default]
    NotStarted,
    Neutral,
    Nod,
    Shake,
    Completed,
}

impl CalibrationStage {
    /// Whether samples can be captured in this stage.
    pub fn is_capture_stage(&self) -> bool {
        matches!(self, Self::Neutral | Self::Nod | Self::Shake)
    }

    /// The stage entered once this one's capture finishes.
    pub fn next(&self) -> CalibrationStage {
        match self {
            Self::NotStarted => Self::Neutral,
            Self::Neutral => Self::Nod,
            Self::Nod => Self::Shake,
            Self::Shake | Self::Completed => Self::Completed,
        }
    }

    /// Instruction shown to the user for this stage.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::NotStarted => "Start calibration to personalize gesture detection.",
            Self::Neutral => "Hold your head still and look straight ahead.",
            Self::Nod => "Nod yes a few times at a natural pace.",
            Self::Shake => "Shake your head no a few times at a natural pace.",
            Self::Completed => "Calibration complete.",
        }
    }
}

/// Calibration progress as seen by the UI. Owned by the calibration engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureCalibrationState {
    pub stage: CalibrationStage,
    pub is_capturing: bool,
    /// Capture progress of the current stage in [0, 1].
    pub progress: f64,
    pub message: String,
    pub has_profile: bool,
}

impl Default for GestureCalibrationState {
    fn default() -> Self {
        Self {
            stage: CalibrationStage::NotStarted,
            is_capturing: false,
            progress: 0.0,
            message: CalibrationStage::NotStarted.prompt().to_string(),
            has_profile: false,
        }
    }
}
