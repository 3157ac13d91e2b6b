use std::path::PathBuf;

/// Host-level tunables. Per-user thresholds live in the profile instead.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Length of each calibration capture stage.
    pub capture_duration_seconds: f64,
    /// Pose filter time constant τ.
    pub smoothing_time_constant: f64,
    /// Added on top of `profile.cooldown_seconds` between fired gestures.
    pub extra_cooldown_seconds: f64,
    /// Bounded queue size for the pipeline worker.
    pub pipeline_queue_capacity: usize,
    /// Directory for `FileProfileStore`; `None` keeps profiles in memory.
    pub profile_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capture_duration_seconds: 2.2,
            smoothing_time_constant: 0.12,
            extra_cooldown_seconds: 0.0,
            pipeline_queue_capacity: 256,
            profile_dir: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `NODSHAKE_*` environment variables.
    ///
    /// Unparseable or out-of-range values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            capture_duration_seconds: read_env_f64(
                "NODSHAKE_CAPTURE_SECONDS",
                defaults.capture_duration_seconds,
                |v| v > 0.0,
            ),
            smoothing_time_constant: read_env_f64(
                "NODSHAKE_SMOOTHING_TAU",
                defaults.smoothing_time_constant,
                |v| v > 0.0,
            ),
            extra_cooldown_seconds: read_env_f64(
                "NODSHAKE_EXTRA_COOLDOWN",
                defaults.extra_cooldown_seconds,
                |v| v >= 0.0,
            ),
            pipeline_queue_capacity: read_env_usize(
                "NODSHAKE_QUEUE_CAPACITY",
                defaults.pipeline_queue_capacity,
            ),
            profile_dir: read_env_string("NODSHAKE_PROFILE_DIR").map(PathBuf::from),
        };
        log::debug!("Engine config: {:?}", config);
        config
    }
}

fn read_env_f64(name: &str, default: f64, valid: impl Fn(f64) -> bool) -> f64 {
    parse_f64(std::env::var(name).ok().as_deref(), default, valid)
}

fn parse_f64(raw: Option<&str>, default: f64, valid: impl Fn(f64) -> bool) -> f64 {
    match raw.and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(v) if v.is_finite() && valid(v) => v,
        Some(v) => {
            log::warn!("Ignoring out-of-range config value {}, using {}", v, default);
            default
        }
        None => default,
    }
}

fn read_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
