//! Run the three calibration stages on synthetic motion and print the
//! resulting profile as JSON.
//!
//! Usage: cargo run --example calibrate
//! Set NODSHAKE_PROFILE_DIR to persist the profile to disk.

use nodshake::{
    CalibrationConfig, CalibrationEngine, CalibrationStage, EngineConfig, FileProfileStore,
    MemoryProfileStore, MotionSample, ProfileStore,
};

const RATE_HZ: f64 = 60.0;

fn stage_sample(stage: CalibrationStage, t: f64) -> MotionSample {
    match stage {
        CalibrationStage::Nod => {
            MotionSample::from_angles(t, 0.04 + 0.18 * (10.0 * t).sin(), 0.0, -0.02)
        }
        CalibrationStage::Shake => {
            MotionSample::from_angles(t, 0.04, 0.0, -0.02 + 0.24 * (9.0 * t).sin())
        }
        _ => MotionSample::from_angles(
            t,
            0.04 + 0.003 * (41.0 * t).sin(),
            0.0,
            -0.02 + 0.003 * (29.0 * t).cos(),
        ),
    }
}

fn main() {
    env_logger::init();

    let config = EngineConfig::from_env();
    let store: Box<dyn ProfileStore + Send> = match &config.profile_dir {
        Some(dir) => {
            println!("Profile directory: {}", dir.display());
            Box::new(FileProfileStore::new(dir))
        }
        None => Box::new(MemoryProfileStore::new()),
    };

    let mut engine = CalibrationEngine::new(store, CalibrationConfig::from(&config));
    if engine.has_profile() {
        println!("Existing profile found, recalibrating");
    }
    engine.start_calibration();

    let mut t = 0.0;
    while engine.state().stage.is_capture_stage() {
        let stage = engine.state().stage;
        println!("[{:?}] {}", stage, engine.state().message);
        if let Err(e) = engine.begin_capture_for_current_stage() {
            eprintln!("Failed to begin capture: {}", e);
            std::process::exit(1);
        }
        while engine.state().is_capturing {
            engine.ingest(&stage_sample(stage, t));
            t += 1.0 / RATE_HZ;
        }
        // Pause between stages, as a user would.
        t += 1.0;
    }

    println!("{}", engine.state().message);
    match serde_json::to_string_pretty(&engine.profile()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode profile: {}", e),
    }
}
