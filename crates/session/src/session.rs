//! Tracking session management.

use lookpoint_common::clock::TrackingClock;
use lookpoint_common::error::{LookpointError, LookpointResult};
use lookpoint_estimator::{CalibrationEvent, GazeFrame, GazePipeline, PipelineConfig};
use lookpoint_pose_model::CalibrationTransform;
use tokio::sync::mpsc;

use crate::PoseSource;

/// How long a calibration request waits for a valid sample before being
/// started off the wall clock instead.
const CALIBRATION_START_GRACE_S: f64 = 0.5;

/// State of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Samples are flowing through the pipeline.
    Tracking,
    /// The source ended or the session was stopped.
    Stopped,
    /// The source failed permanently.
    Error,
}

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum SessionCommand {
    StartCalibration,
    ResetCalibration,
    /// Install a previously saved calibration transform.
    RestoreCalibration(CalibrationTransform),
    ResetFilters,
    SetHeadReference,
    Stop,
}

/// Everything a session consumer can observe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazeEvent {
    /// A processed gaze frame.
    Frame(GazeFrame),
    /// A calibration UI notification.
    Calibration(CalibrationEvent),
    /// The session changed state.
    StateChanged(SessionState),
}

/// Summary returned when a session finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    /// Frames produced by the pipeline.
    pub frames: u64,
    /// Samples skipped as invalid.
    pub invalid_samples: u64,
    /// Source poll errors (logged and skipped).
    pub source_errors: u64,
    /// Wall-clock session duration.
    pub duration_secs: f64,
    /// The final calibration transform.
    pub transform: CalibrationTransform,
}

/// Consumer-side handle to a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    /// Gaze frames and calibration events, in pipeline order.
    pub events: mpsc::UnboundedReceiver<GazeEvent>,
    task: tokio::task::JoinHandle<LookpointResult<SessionStats>>,
}

impl SessionHandle {
    pub async fn start_calibration(&self) -> LookpointResult<()> {
        self.send(SessionCommand::StartCalibration).await
    }

    pub async fn reset_calibration(&self) -> LookpointResult<()> {
        self.send(SessionCommand::ResetCalibration).await
    }

    pub async fn restore_calibration(&self, transform: CalibrationTransform) -> LookpointResult<()> {
        self.send(SessionCommand::RestoreCalibration(transform)).await
    }

    pub async fn reset_filters(&self) -> LookpointResult<()> {
        self.send(SessionCommand::ResetFilters).await
    }

    pub async fn set_head_reference(&self) -> LookpointResult<()> {
        self.send(SessionCommand::SetHeadReference).await
    }

    pub async fn stop(&self) -> LookpointResult<()> {
        self.send(SessionCommand::Stop).await
    }

    /// Wait for the session task to finish and collect its stats.
    pub async fn join(self) -> LookpointResult<SessionStats> {
        self.task
            .await
            .map_err(|e| LookpointError::tracking(format!("Session task panicked: {e}")))?
    }

    async fn send(&self, command: SessionCommand) -> LookpointResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LookpointError::tracking("Session task has exited"))
    }
}

/// A tracking session: one source, one pipeline, one task.
///
/// The session task is the only code that touches the pipeline, so frame
/// processing, calibration deadlines and command handling are naturally
/// serialized without locks.
pub struct TrackingSession {
    source: Box<dyn PoseSource>,
    pipeline: GazePipeline,
    clock: TrackingClock,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<GazeEvent>,
    state: SessionState,
    stop_requested: bool,
    calibration_requested_at: Option<f64>,
    frames: u64,
    invalid_samples: u64,
    source_errors: u64,
    last_sample_s: f64,
}

impl TrackingSession {
    /// Spawn the session task and return the consumer handle.
    pub fn spawn(source: Box<dyn PoseSource>, config: PipelineConfig) -> SessionHandle {
        Self::spawn_calibrated(source, config, None)
    }

    /// Spawn with a previously saved calibration transform already
    /// installed, so it applies from the very first frame.
    pub fn spawn_calibrated(
        source: Box<dyn PoseSource>,
        config: PipelineConfig,
        transform: Option<CalibrationTransform>,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut pipeline = GazePipeline::new(config);
        if let Some(transform) = transform {
            pipeline.restore_calibration(transform);
        }

        let session = Self {
            source,
            pipeline,
            clock: TrackingClock::start(),
            commands: command_rx,
            events: event_tx,
            state: SessionState::Idle,
            stop_requested: false,
            calibration_requested_at: None,
            frames: 0,
            invalid_samples: 0,
            source_errors: 0,
            last_sample_s: 0.0,
        };

        let task = tokio::spawn(session.run());
        SessionHandle {
            commands: command_tx,
            events: event_rx,
            task,
        }
    }

    async fn run(mut self) -> LookpointResult<SessionStats> {
        if !self.source.is_available() {
            self.set_state(SessionState::Error);
            return Err(LookpointError::tracking(format!(
                "Pose source '{}' is not available",
                self.source.name()
            )));
        }

        tracing::info!(source = %self.source.name(), "Tracking session started");
        self.set_state(SessionState::Tracking);

        loop {
            while let Ok(command) = self.commands.try_recv() {
                self.handle_command(command);
            }
            if self.stop_requested {
                break;
            }

            match self.source.poll() {
                Ok(Some(sample)) => {
                    self.last_sample_s = sample.timestamp_s;
                    if sample.is_valid && self.calibration_requested_at.is_some() {
                        self.begin_calibration(sample.timestamp_s);
                    }
                    let (frame, events) = self.pipeline.process(&sample);
                    self.forward_calibration(events);
                    match frame {
                        Some(frame) => {
                            self.frames += 1;
                            self.emit(GazeEvent::Frame(frame));
                        }
                        None => self.invalid_samples += 1,
                    }
                }
                Ok(None) if self.source.is_finished() => {
                    tracing::info!("Pose source exhausted");
                    break;
                }
                Ok(None) => {
                    // No sample due; keep calibration deadlines moving.
                    let now_s = self.last_sample_s.max(self.clock.elapsed_secs());
                    if let Some(requested_at) = self.calibration_requested_at {
                        if now_s - requested_at >= CALIBRATION_START_GRACE_S {
                            self.begin_calibration(now_s);
                        }
                    }
                    let events = self.pipeline.tick(now_s);
                    self.forward_calibration(events);
                    tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
                }
                Err(e) => {
                    self.source_errors += 1;
                    tracing::warn!(error = %e, "Pose source error");
                }
            }
        }

        self.set_state(SessionState::Stopped);
        let stats = SessionStats {
            frames: self.frames,
            invalid_samples: self.invalid_samples,
            source_errors: self.source_errors,
            duration_secs: self.clock.elapsed_secs(),
            transform: self.pipeline.calibration_transform(),
        };
        tracing::info!(
            frames = stats.frames,
            invalid = stats.invalid_samples,
            "Tracking session stopped"
        );
        Ok(stats)
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::StartCalibration => {
                // Deferred until the next valid sample so the run is
                // anchored to sample time, with a wall-clock fallback.
                let now_s = self.last_sample_s.max(self.clock.elapsed_secs());
                self.calibration_requested_at = Some(now_s);
                tracing::info!("Calibration requested");
            }
            SessionCommand::ResetCalibration => self.pipeline.reset_calibration(),
            SessionCommand::RestoreCalibration(transform) => {
                self.pipeline.restore_calibration(transform)
            }
            SessionCommand::ResetFilters => self.pipeline.reset_filters(),
            SessionCommand::SetHeadReference => self.pipeline.set_head_reference(),
            SessionCommand::Stop => self.stop_requested = true,
        }
    }

    fn begin_calibration(&mut self, now_s: f64) {
        self.calibration_requested_at = None;
        let events = self.pipeline.start_calibration(now_s);
        self.forward_calibration(events);
    }

    fn forward_calibration(&mut self, events: Vec<CalibrationEvent>) {
        for event in events {
            self.emit(GazeEvent::Calibration(event));
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            self.emit(GazeEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: GazeEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ReplaySource, SyntheticSource};
    use glam::{Mat4, Vec3};
    use lookpoint_pose_model::{PoseSample, ScreenGeometry, ScreenPoint};

    fn steady_samples(count: usize) -> Vec<PoseSample> {
        (0..count)
            .map(|i| {
                PoseSample::binocular(i as f64 / 60.0, Vec3::ZERO, Vec3::NEG_Z, Mat4::IDENTITY)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replay_session_produces_frames() {
        let source = ReplaySource::from_samples(steady_samples(30));
        let mut handle = TrackingSession::spawn(Box::new(source), PipelineConfig::default());

        let stats = (&mut handle.task).await.unwrap().unwrap();
        assert_eq!(stats.frames, 30);
        assert_eq!(stats.invalid_samples, 0);
        assert!(stats.transform.is_identity());

        let mut frames = 0;
        let mut saw_tracking = false;
        let mut saw_stopped = false;
        while let Ok(event) = handle.events.try_recv() {
            match event {
                GazeEvent::Frame(frame) => {
                    frames += 1;
                    let center = ScreenGeometry::default().center();
                    assert!(frame.point.distance_to(&center) < 1e-6);
                }
                GazeEvent::StateChanged(SessionState::Tracking) => saw_tracking = true,
                GazeEvent::StateChanged(SessionState::Stopped) => saw_stopped = true,
                _ => {}
            }
        }
        assert_eq!(frames, 30);
        assert!(saw_tracking);
        assert!(saw_stopped);
    }

    #[tokio::test]
    async fn test_invalid_samples_are_counted_not_emitted() {
        let mut samples = steady_samples(10);
        samples[3] = PoseSample::invalid(3.0 / 60.0);
        samples[7] = PoseSample::invalid(7.0 / 60.0);

        let source = ReplaySource::from_samples(samples);
        let mut handle = TrackingSession::spawn(Box::new(source), PipelineConfig::default());
        let stats = (&mut handle.task).await.unwrap().unwrap();
        assert_eq!(stats.frames, 8);
        assert_eq!(stats.invalid_samples, 2);
    }

    #[tokio::test]
    async fn test_calibration_starts_on_next_valid_sample() {
        let source = SyntheticSource::new(
            ScreenGeometry::default(),
            ScreenPoint::new(960.0, 540.0),
            60,
            600,
        );
        let mut handle = TrackingSession::spawn(Box::new(source), PipelineConfig::default());
        handle.start_calibration().await.unwrap();

        let mut saw_show_target = false;
        while let Some(event) = handle.events.recv().await {
            if let GazeEvent::Calibration(CalibrationEvent::ShowTarget { index: 0, .. }) = event {
                saw_show_target = true;
                break;
            }
        }
        assert!(saw_show_target);
        // The source may already be exhausted by now; the task ends either way.
        let _ = handle.stop().await;
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_command_ends_session() {
        // A paced replay far in the future never yields a sample, so only
        // the stop command can end the loop.
        let jsonl = lookpoint_pose_model::serialize_stream(
            &Default::default(),
            &[PoseSample::binocular(
                3600.0,
                Vec3::ZERO,
                Vec3::NEG_Z,
                Mat4::IDENTITY,
            )],
        )
        .unwrap();
        let source = ReplaySource::from_jsonl(&jsonl).unwrap();

        let handle = TrackingSession::spawn(Box::new(source), PipelineConfig::default());
        handle.stop().await.unwrap();
        let stats = handle.join().await.unwrap();
        assert_eq!(stats.frames, 0);
    }

    #[tokio::test]
    async fn test_empty_source_errors() {
        let source = ReplaySource::from_samples(Vec::new());
        let handle = TrackingSession::spawn(Box::new(source), PipelineConfig::default());
        assert!(handle.join().await.is_err());
    }
}
