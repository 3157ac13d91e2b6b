//! Exponential pose smoothing for visualization.
//!
//! Pitch is interpolated linearly; roll and yaw take the shortest angular
//! path so a pose crossing ±π does not swing the long way round.

use crate::config::EngineConfig;
use crate::stats::{shortest_angle_delta, wrap_angle};
use crate::types::MotionPose;
use std::ops::RangeInclusive;

/// Blend-factor clamp for normal display.
pub const NORMAL_BLEND_RANGE: RangeInclusive<f64> = 0.08..=0.60;
/// Blend-factor clamp while the live graph is running.
pub const LIVE_GRAPH_BLEND_RANGE: RangeInclusive<f64> = 0.35..=0.90;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingConfig {
    /// Time constant τ in seconds.
    pub time_constant: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            time_constant: 0.12,
        }
    }
}

impl From<&EngineConfig> for SmoothingConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            time_constant: config.smoothing_time_constant,
        }
    }
}

/// `1 - exp(-dt/τ)`, clamped to the range for the current display mode.
pub fn blend_factor(dt: f64, time_constant: f64, live_graph: bool) -> f64 {
    if time_constant <= 0.0 || !time_constant.is_finite() {
        return 1.0;
    }
    let range = if live_graph {
        LIVE_GRAPH_BLEND_RANGE
    } else {
        NORMAL_BLEND_RANGE
    };
    let factor = 1.0 - (-dt.max(0.0) / time_constant).exp();
    factor.clamp(*range.start(), *range.end())
}

/// Move `current` toward `target` by `factor`, clamped to [0, 1].
pub fn blend(current: MotionPose, target: MotionPose, factor: f64) -> MotionPose {
    if factor.is_nan() || factor <= 0.0 {
        return current;
    }
    if factor >= 1.0 {
        return target;
    }
    let angular = |from: f64, to: f64| wrap_angle(from + shortest_angle_delta(from, to) * factor);
    MotionPose {
        pitch: current.pitch + (target.pitch - current.pitch) * factor,
        roll: angular(current.roll, target.roll),
        yaw: angular(current.yaw, target.yaw),
    }
}

/// Stateful smoother fed with timestamped poses.
#[derive(Debug, Clone)]
pub struct PoseFilter {
    config: SmoothingConfig,
    live_graph: bool,
    current: Option<(f64, MotionPose)>,
}

impl PoseFilter {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            live_graph: false,
            current: None,
        }
    }

    pub fn set_live_graph(&mut self, live_graph: bool) {
        self.live_graph = live_graph;
    }

    pub fn live_graph(&self) -> bool {
        self.live_graph
    }

    pub fn pose(&self) -> Option<MotionPose> {
        self.current.map(|(_, pose)| pose)
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Blend in a new target pose. The first call snaps to it.
    ///
    /// A timestamp that does not advance leaves the pose unchanged.
    pub fn update(&mut self, target: MotionPose, timestamp: f64) -> MotionPose {
        let next = match self.current {
            None => target,
            Some((last, pose)) => {
                let dt = timestamp - last;
                if dt <= 0.0 {
                    return pose;
                }
                blend(pose, target, blend_factor(dt, self.config.time_constant, self.live_graph))
            }
        };
        self.current = Some((timestamp, next));
        next
    }
}

impl Default for PoseFilter {
    fn default() -> Self {
        Self::new(SmoothingConfig::default())
    }
}
