use crate::config::EngineConfig;
use crate::detector::{DetectorConfig, GestureDetector};
use crate::filter::{PoseFilter, SmoothingConfig};
use crate::profile::ThresholdProfile;
use crate::types::{GestureDetectionResult, GestureEvent, MotionPose, MotionSample};
use crate::{NodshakeError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the worker rechecks the stop flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub smoothing: SmoothingConfig,
    pub queue_capacity: usize,
    /// Emit a `Diagnostics` event for every analyzed sample.
    pub emit_diagnostics: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for PipelineConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            detector: DetectorConfig::from(config),
            smoothing: SmoothingConfig::from(config),
            queue_capacity: config.pipeline_queue_capacity.max(1),
            emit_diagnostics: false,
        }
    }
}

/// Work items for the pipeline thread, processed strictly in order.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    Sample(MotionSample),
    /// Swap the detector's profile and discard its window.
    ReplaceProfile(ThresholdProfile),
    SetVisuals { publish: bool, live_graph: bool },
    Reset,
}

/// Output of the pipeline thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Gesture(GestureEvent),
    Pose { timestamp: f64, pose: MotionPose },
    Diagnostics(GestureDetectionResult),
}

/// Handle to a running gesture pipeline.
///
/// Samples pushed from any thread are serialized onto one worker that owns
/// the detector and the pose filter, so neither ever sees concurrent calls.
pub struct GesturePipeline {
    commands: Sender<PipelineCommand>,
    events: Receiver<PipelineEvent>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl GesturePipeline {
    /// Spawn the worker thread.
    pub fn start(profile: ThresholdProfile, config: PipelineConfig) -> Result<GesturePipeline> {
        let (command_tx, command_rx) = crossbeam_channel::bounded(config.queue_capacity.max(1));
        let (event_tx, event_rx) = crossbeam_channel::bounded(config.queue_capacity.max(1));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let worker = Worker {
            detector: GestureDetector::new(profile, config.detector.clone()),
            filter: PoseFilter::new(config.smoothing.clone()),
            publish_visuals: false,
            emit_diagnostics: config.emit_diagnostics,
            events: event_tx,
        };

        let thread = std::thread::Builder::new()
            .name("nodshake-pipeline".into())
            .spawn(move || {
                pipeline_loop(worker, command_rx, stop_clone);
            })?;

        Ok(GesturePipeline {
            commands: command_tx,
            events: event_rx,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Queue a sample. Returns `false` if it was dropped.
    ///
    /// Never blocks: when the worker falls behind, samples are dropped and
    /// the detector absorbs the irregular Δt.
    pub fn push(&self, sample: MotionSample) -> bool {
        match self.commands.try_send(PipelineCommand::Sample(sample)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Pipeline queue full, dropping sample");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Replace the active profile. Queued behind any pending samples.
    pub fn replace_profile(&self, profile: ThresholdProfile) -> Result<()> {
        self.send(PipelineCommand::ReplaceProfile(profile))
    }

    pub fn set_visuals(&self, publish: bool, live_graph: bool) -> Result<()> {
        self.send(PipelineCommand::SetVisuals {
            publish,
            live_graph,
        })
    }

    pub fn reset(&self) -> Result<()> {
        self.send(PipelineCommand::Reset)
    }

    /// Receive the next event (blocks until available).
    pub fn recv(&self) -> Result<PipelineEvent> {
        self.events.recv().map_err(|_| NodshakeError::PipelineStopped)
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<PipelineEvent> {
        self.events.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<PipelineEvent> {
        self.events.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => NodshakeError::Timeout,
            RecvTimeoutError::Disconnected => NodshakeError::PipelineStopped,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    // Control commands are never dropped; the worker never blocks on output,
    // so this wait is bounded by the queue draining.
    fn send(&self, command: PipelineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| NodshakeError::PipelineStopped)
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for GesturePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    detector: GestureDetector,
    filter: PoseFilter,
    publish_visuals: bool,
    emit_diagnostics: bool,
    events: Sender<PipelineEvent>,
}

impl Worker {
    /// Returns `false` once the event receiver is gone.
    fn handle(&mut self, command: PipelineCommand) -> bool {
        match command {
            PipelineCommand::Sample(sample) => return self.process(&sample),
            PipelineCommand::ReplaceProfile(profile) => self.detector.set_profile(profile),
            PipelineCommand::SetVisuals {
                publish,
                live_graph,
            } => {
                self.publish_visuals = publish;
                self.filter.set_live_graph(live_graph);
                if !publish {
                    self.filter.reset();
                }
            }
            PipelineCommand::Reset => {
                self.detector.reset();
                self.filter.reset();
            }
        }
        true
    }

    fn process(&mut self, sample: &MotionSample) -> bool {
        let result = self.detector.ingest(sample);

        if let Some(event) = result.event {
            log::info!(
                "Gesture {} at {:.3}s (confidence {:.2})",
                event.gesture.as_str(),
                event.timestamp,
                event.confidence
            );
            if !self.emit(PipelineEvent::Gesture(event)) {
                return false;
            }
        }
        if self.emit_diagnostics && !self.emit(PipelineEvent::Diagnostics(result)) {
            return false;
        }
        if self.publish_visuals {
            let pose = self.filter.update(sample.pose(), sample.timestamp);
            return self.emit(PipelineEvent::Pose {
                timestamp: sample.timestamp,
                pose,
            });
        }
        true
    }

    fn emit(&self, event: PipelineEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Pipeline output full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                log::info!("Pipeline output disconnected, stopping worker");
                false
            }
        }
    }
}

fn pipeline_loop(mut worker: Worker, commands: Receiver<PipelineCommand>, stop_flag: Arc<AtomicBool>) {
    log::info!("Gesture pipeline started");

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("Gesture pipeline stopping (stop flag set)");
            break;
        }

        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(command) => {
                if !worker.handle(command) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
