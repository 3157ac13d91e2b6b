//! Feed a synthetic nod-then-shake stream through the gesture pipeline and
//! route the fired gestures to a printing executor.
//!
//! Usage: cargo run --example synthetic_nod
//! Set RUST_LOG=debug to see detector internals.

use nodshake::router::{ActionKind, ActionRequest};
use nodshake::{
    ActionOutcome, ActionRouter, EngineConfig, GesturePipeline, MotionSample, PipelineConfig,
    PipelineEvent, ThresholdProfile,
};
use std::time::Duration;

const RATE_HZ: f64 = 60.0;

fn sample(i: usize) -> MotionSample {
    let t = i as f64 / RATE_HZ;
    // Two seconds of nodding, one second still, two seconds of shaking.
    let (pitch, yaw, pitch_rate, yaw_rate) = if t < 2.0 {
        (0.22 * (12.0 * t).sin(), 0.0, 2.64 * (12.0 * t).cos(), 0.0)
    } else if t < 3.0 {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        (0.0, 0.25 * (10.0 * t).sin(), 0.0, 2.5 * (10.0 * t).cos())
    };
    MotionSample::from_angles(t, pitch, 0.0, yaw).with_rotation_rate([pitch_rate, 0.0, yaw_rate])
}

fn main() {
    env_logger::init();

    let config = EngineConfig::from_env();
    let pipeline = match GesturePipeline::start(ThresholdProfile::FALLBACK, PipelineConfig::from(&config)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to start pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let mut router = ActionRouter::default();
    router.register(
        ActionKind::Prompt,
        Box::new(|request: &ActionRequest| ActionOutcome::Success(format!("{:?}", request))),
    );

    let total = (5.0 * RATE_HZ) as usize;
    let mut dropped = 0;
    for i in 0..total {
        if !pipeline.push(sample(i)) {
            dropped += 1;
        }
    }
    println!("Pushed {} samples ({} dropped)", total, dropped);

    loop {
        match pipeline.recv_timeout(Duration::from_millis(500)) {
            Ok(PipelineEvent::Gesture(event)) => {
                let outcome = router.route(&event);
                println!(
                    "t={:.2}s  {:<5}  conf={:.2}  -> {}",
                    event.timestamp,
                    event.gesture.as_str(),
                    event.confidence,
                    outcome
                );
            }
            Ok(_) => continue,
            Err(nodshake::NodshakeError::Timeout) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    pipeline.stop();
}
