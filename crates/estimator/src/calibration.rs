//! Calibration state machine.
//!
//! A run walks a fixed sequence of on-screen targets. Each target gets a
//! short warmup (the user's eyes travel to it), then a collection window
//! during which raw gated pipeline points are buffered with a confidence
//! score. When the window closes the buffer is cleaned (settle trim,
//! confidence filter, MAD outlier rejection) and either summarized into a
//! point result or retried. After the last target an affine correction is
//! fitted across all point results.
//!
//! The engine has no clock of its own. Callers pass the current tracking
//! time to [`CalibrationEngine::advance`], which makes deadline handling
//! deterministic under replayed or synthetic timelines.

use std::collections::VecDeque;

use lookpoint_pose_model::{
    CalibrationPointResult, CalibrationSample, CalibrationTransform, ScreenGeometry, ScreenPoint,
};

use crate::config::CalibrationConfig;

/// Base confidence for a sample landing on the visible screen.
const CONFIDENCE_ON_SCREEN: f64 = 0.8;
/// Base confidence for a sample in the overscan margin.
const CONFIDENCE_OFF_SCREEN: f64 = 0.4;
/// Bonus for a sample close to the previous one (steady fixation).
const PROXIMITY_BONUS: f64 = 0.2;
/// Penalty factor for a sample far from the previous one.
const DISTANT_PENALTY: f64 = 0.5;

/// Fraction of each window discarded from the front (eyes still settling).
const SETTLE_TRIM_FRONT: f64 = 0.2;
/// Fraction discarded from the back (anticipating the next target).
const SETTLE_TRIM_BACK: f64 = 0.1;
/// Outliers are samples farther than `MAD_MULTIPLIER * MAD` from the
/// median gaze position.
const MAD_MULTIPLIER: f64 = 3.0;
/// At least this many targets must yield a usable point result for a fit.
const MIN_FIT_POINTS: usize = 3;

/// Where the engine is in a calibration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineState {
    /// No run in progress.
    Idle,
    /// A target is shown; samples are not yet recorded.
    Warmup { index: usize, until_s: f64 },
    /// Samples for the target are being recorded.
    Collecting { index: usize, until_s: f64 },
    /// The last window produced too few usable samples; the same target
    /// will be retried after a short pause.
    RetryDelay { index: usize, resume_s: f64 },
    /// The run finished.
    Done { success: bool },
}

/// UI-facing notifications produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationEvent {
    /// Display the given target. Emitted when a target is first shown and
    /// again when it is retried.
    ShowTarget { index: usize, position: ScreenPoint },
    /// The run finished. Emitted exactly once per run.
    Completed { success: bool, quality: f64 },
}

/// Drives target sequencing, sample collection and transform fitting.
pub struct CalibrationEngine {
    config: CalibrationConfig,
    screen: ScreenGeometry,
    state: EngineState,
    buffer: VecDeque<CalibrationSample>,
    last_point: Option<ScreenPoint>,
    results: Vec<CalibrationPointResult>,
    retries: u32,
    transform: CalibrationTransform,
    calibrated: bool,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig, screen: ScreenGeometry) -> Self {
        Self {
            config,
            screen,
            state: EngineState::Idle,
            buffer: VecDeque::new(),
            last_point: None,
            results: Vec::new(),
            retries: 0,
            transform: CalibrationTransform::IDENTITY,
            calibrated: false,
        }
    }

    /// Begin a calibration run at the first target.
    ///
    /// A previously fitted transform stays in effect until this run
    /// replaces it; an aborted or failed run never degrades an existing
    /// calibration.
    pub fn start(&mut self, now_s: f64) -> Vec<CalibrationEvent> {
        self.buffer.clear();
        self.last_point = None;
        self.results.clear();
        self.retries = 0;

        let Some(target) = self.config.targets.first() else {
            self.state = EngineState::Done { success: false };
            return vec![CalibrationEvent::Completed {
                success: false,
                quality: 0.0,
            }];
        };

        tracing::info!(targets = self.config.targets.len(), "Calibration started");
        self.state = EngineState::Warmup {
            index: 0,
            until_s: now_s + self.config.warmup_secs,
        };
        vec![CalibrationEvent::ShowTarget {
            index: 0,
            position: target.to_pixels(&self.screen),
        }]
    }

    /// Check deadlines against the current tracking time and run any due
    /// state transitions.
    pub fn advance(&mut self, now_s: f64) -> Vec<CalibrationEvent> {
        let mut events = Vec::new();
        match self.state {
            EngineState::Warmup { index, until_s } if now_s >= until_s => {
                self.buffer.clear();
                self.last_point = None;
                self.state = EngineState::Collecting {
                    index,
                    until_s: now_s + self.config.collect_secs,
                };
                tracing::debug!(target = index, "Collecting calibration samples");
            }
            EngineState::Collecting { index, until_s } if now_s >= until_s => {
                self.finish_target(index, now_s, &mut events);
            }
            EngineState::RetryDelay { index, resume_s } if now_s >= resume_s => {
                self.state = EngineState::Warmup {
                    index,
                    until_s: now_s + self.config.warmup_secs,
                };
                if let Some(target) = self.config.targets.get(index) {
                    events.push(CalibrationEvent::ShowTarget {
                        index,
                        position: target.to_pixels(&self.screen),
                    });
                }
            }
            _ => {}
        }
        events
    }

    /// Record a raw gated pipeline point. Ignored outside a collection
    /// window. The buffer keeps the newest [`CalibrationConfig::max_samples`]
    /// samples.
    pub fn ingest(&mut self, point: ScreenPoint, timestamp_s: f64) {
        let EngineState::Collecting { .. } = self.state else {
            return;
        };

        let mut confidence = if self.screen.contains(&point) {
            CONFIDENCE_ON_SCREEN
        } else {
            CONFIDENCE_OFF_SCREEN
        };
        if let Some(previous) = self.last_point {
            if point.distance_to(&previous) < self.config.proximity_px {
                confidence += PROXIMITY_BONUS;
            } else {
                confidence *= DISTANT_PENALTY;
            }
        }
        let confidence = confidence.clamp(0.0, 1.0);
        self.last_point = Some(point);

        if self.buffer.len() >= self.config.max_samples {
            self.buffer.pop_front();
        }
        self.buffer.push_back(CalibrationSample {
            point,
            timestamp_s,
            confidence,
        });
    }

    /// Apply the fitted correction to a raw point. Identity until a run
    /// has succeeded.
    pub fn apply(&self, raw: ScreenPoint) -> ScreenPoint {
        self.transform.apply(raw)
    }

    /// Drop the fitted transform and any run in progress, reverting to the
    /// identity correction.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.buffer.clear();
        self.last_point = None;
        self.results.clear();
        self.retries = 0;
        self.transform = CalibrationTransform::IDENTITY;
        self.calibrated = false;
        tracing::info!("Calibration reset to identity");
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether the engine is currently recording samples.
    pub fn is_collecting(&self) -> bool {
        matches!(self.state, EngineState::Collecting { .. })
    }

    /// Whether a run is in progress (started but not finished).
    pub fn is_active(&self) -> bool {
        !matches!(self.state, EngineState::Idle | EngineState::Done { .. })
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn transform(&self) -> CalibrationTransform {
        self.transform
    }

    /// Point results recorded so far in the current or most recent run.
    pub fn results(&self) -> &[CalibrationPointResult] {
        &self.results
    }

    /// Install an externally stored transform, e.g. loaded from disk.
    pub fn restore_transform(&mut self, transform: CalibrationTransform) {
        self.transform = transform;
        self.calibrated = !transform.is_identity();
    }

    fn finish_target(&mut self, index: usize, now_s: f64, events: &mut Vec<CalibrationEvent>) {
        let samples: Vec<CalibrationSample> = self.buffer.drain(..).collect();
        let cleaned = clean_samples(&samples, self.config.confidence_threshold);

        if cleaned.len() < self.config.min_samples {
            self.retries += 1;
            let exhausted = self
                .config
                .max_retries_per_target
                .is_some_and(|max| self.retries > max);
            if exhausted {
                tracing::warn!(
                    target = index,
                    retries = self.retries,
                    "Retries exhausted, aborting calibration"
                );
                self.finish_run(false, events);
            } else {
                tracing::debug!(
                    target = index,
                    collected = samples.len(),
                    kept = cleaned.len(),
                    "Too few usable samples, retrying target"
                );
                self.state = EngineState::RetryDelay {
                    index,
                    resume_s: now_s + self.config.retry_delay_secs,
                };
            }
            return;
        }

        if let Some(target) = self.config.targets.get(index) {
            let result = summarize_target(
                target.to_pixels(&self.screen),
                &cleaned,
                self.config.max_samples,
                now_s,
            );
            tracing::info!(
                target = index,
                quality = result.quality,
                samples = cleaned.len(),
                "Calibration target captured"
            );
            self.results.push(result);
        }
        self.retries = 0;

        let next = index + 1;
        match self.config.targets.get(next) {
            Some(target) => {
                self.state = EngineState::Warmup {
                    index: next,
                    until_s: now_s + self.config.warmup_secs,
                };
                events.push(CalibrationEvent::ShowTarget {
                    index: next,
                    position: target.to_pixels(&self.screen),
                });
            }
            None => self.finish_run(true, events),
        }
    }

    fn finish_run(&mut self, try_fit: bool, events: &mut Vec<CalibrationEvent>) {
        // Weak targets are excluded up front: only points above the quality
        // threshold feed the fit, and the overall score is their mean.
        let quality_points: Vec<CalibrationPointResult> = self
            .results
            .iter()
            .filter(|r| r.quality >= self.config.point_quality_threshold)
            .copied()
            .collect();
        let quality = mean_quality(&quality_points);
        let mut success = false;

        if try_fit && quality >= self.config.overall_quality_threshold {
            if let Some(transform) =
                fit_transform(&quality_points, self.config.point_quality_threshold)
            {
                self.transform = transform;
                self.calibrated = true;
                success = true;
            }
        }

        tracing::info!(
            success,
            quality,
            points = quality_points.len(),
            "Calibration run finished"
        );
        self.state = EngineState::Done { success };
        events.push(CalibrationEvent::Completed { success, quality });
    }
}

/// Clean one target's raw sample window: drop the settle edges, keep
/// confident samples, then reject spatial outliers by median absolute
/// deviation. The MAD stage falls back to the middle sample rather than
/// emptying the window.
fn clean_samples(samples: &[CalibrationSample], confidence_threshold: f64) -> Vec<CalibrationSample> {
    if samples.is_empty() {
        return Vec::new();
    }

    let n = samples.len();
    let front = (n as f64 * SETTLE_TRIM_FRONT) as usize;
    let back = (n as f64 * SETTLE_TRIM_BACK) as usize;
    let trimmed = &samples[front..n - back];

    let confident: Vec<CalibrationSample> = trimmed
        .iter()
        .filter(|s| s.confidence >= confidence_threshold)
        .copied()
        .collect();
    if confident.is_empty() {
        return Vec::new();
    }

    let center = median_point(&confident);
    let distances: Vec<f64> = confident
        .iter()
        .map(|s| s.point.distance_to(&center))
        .collect();
    // MAD here is the median distance from the median point; samples beyond
    // MAD_MULTIPLIER times that distance are rejected.
    let mad = median(&mut distances.clone());
    let cutoff = MAD_MULTIPLIER * mad;

    let kept: Vec<CalibrationSample> = confident
        .iter()
        .zip(&distances)
        .filter(|(_, d)| **d <= cutoff)
        .map(|(s, _)| *s)
        .collect();
    if kept.is_empty() {
        return vec![confident[confident.len() / 2]];
    }
    kept
}

/// Aggregate a cleaned window into a point result: confidence-weighted
/// gaze center plus a composite quality score combining mean confidence,
/// spatial consistency and sample count.
fn summarize_target(
    target_point: ScreenPoint,
    cleaned: &[CalibrationSample],
    max_samples: usize,
    timestamp_s: f64,
) -> CalibrationPointResult {
    let total_weight: f64 = cleaned.iter().map(|s| s.confidence).sum();
    let measured_point = if total_weight > f64::EPSILON {
        ScreenPoint::new(
            cleaned.iter().map(|s| s.point.x * s.confidence).sum::<f64>() / total_weight,
            cleaned.iter().map(|s| s.point.y * s.confidence).sum::<f64>() / total_weight,
        )
    } else {
        target_point
    };

    let mean_confidence =
        cleaned.iter().map(|s| s.confidence).sum::<f64>() / cleaned.len() as f64;
    let variance = cleaned
        .iter()
        .map(|s| s.point.distance_to(&measured_point).powi(2))
        .sum::<f64>()
        / cleaned.len() as f64;
    let consistency = 1.0 / (1.0 + variance * 0.001);
    let count_score = (cleaned.len() as f64 / max_samples as f64).min(1.0);
    let quality = 0.4 * mean_confidence + 0.4 * consistency + 0.2 * count_score;

    CalibrationPointResult {
        target_point,
        measured_point,
        quality: quality.clamp(0.0, 1.0),
        timestamp_s,
    }
}

/// Fit the per-axis affine correction from the usable point results.
///
/// Scale is the ratio of quality-weighted mean absolute deviations of
/// target vs. measured coordinates around their weighted centers; the
/// offset then aligns the centers. Returns `None` when fewer than
/// [`MIN_FIT_POINTS`] results clear the quality bar.
fn fit_transform(
    results: &[CalibrationPointResult],
    point_quality_threshold: f64,
) -> Option<CalibrationTransform> {
    let usable: Vec<&CalibrationPointResult> = results
        .iter()
        .filter(|r| r.quality >= point_quality_threshold)
        .collect();
    if usable.len() < MIN_FIT_POINTS {
        return None;
    }

    let total_weight: f64 = usable.iter().map(|r| r.quality).sum();
    if total_weight <= f64::EPSILON {
        return None;
    }

    let weighted_mean = |f: &dyn Fn(&CalibrationPointResult) -> f64| -> f64 {
        usable.iter().map(|r| f(r) * r.quality).sum::<f64>() / total_weight
    };

    let target_cx = weighted_mean(&|r| r.target_point.x);
    let target_cy = weighted_mean(&|r| r.target_point.y);
    let measured_cx = weighted_mean(&|r| r.measured_point.x);
    let measured_cy = weighted_mean(&|r| r.measured_point.y);

    let target_dev_x = weighted_mean(&|r| (r.target_point.x - target_cx).abs());
    let target_dev_y = weighted_mean(&|r| (r.target_point.y - target_cy).abs());
    let measured_dev_x = weighted_mean(&|r| (r.measured_point.x - measured_cx).abs());
    let measured_dev_y = weighted_mean(&|r| (r.measured_point.y - measured_cy).abs());

    let scale_x = if measured_dev_x > 1e-6 {
        target_dev_x / measured_dev_x
    } else {
        1.0
    };
    let scale_y = if measured_dev_y > 1e-6 {
        target_dev_y / measured_dev_y
    } else {
        1.0
    };

    Some(CalibrationTransform {
        scale_x,
        scale_y,
        offset_x: target_cx - measured_cx * scale_x,
        offset_y: target_cy - measured_cy * scale_y,
    })
}

fn mean_quality(results: &[CalibrationPointResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.quality).sum::<f64>() / results.len() as f64
}

fn median(values: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    values[values.len() / 2]
}

fn median_point(samples: &[CalibrationSample]) -> ScreenPoint {
    let mut xs: Vec<f64> = samples.iter().map(|s| s.point.x).collect();
    let mut ys: Vec<f64> = samples.iter().map(|s| s.point.y).collect();
    ScreenPoint::new(median(&mut xs), median(&mut ys))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CalibrationEngine {
        CalibrationEngine::new(CalibrationConfig::default(), ScreenGeometry::default())
    }

    /// Drive the engine to a collection window, feed `count` identical
    /// samples at the target position, then close the window.
    fn run_window(
        engine: &mut CalibrationEngine,
        now_s: &mut f64,
        count: usize,
    ) -> Vec<CalibrationEvent> {
        let mut events = engine.advance(*now_s + 0.9); // warmup elapses
        *now_s += 0.9;
        assert!(engine.is_collecting());

        let EngineState::Collecting { index, .. } = engine.state() else {
            panic!("expected collecting state");
        };
        let position = CalibrationConfig::default().targets[index]
            .to_pixels(&ScreenGeometry::default());
        for i in 0..count {
            engine.ingest(position, *now_s + i as f64 * 0.02);
        }

        *now_s += 3.1; // collection window elapses
        events.extend(engine.advance(*now_s));
        events
    }

    #[test]
    fn test_start_shows_first_target() {
        let mut e = engine();
        let events = e.start(0.0);
        assert_eq!(events.len(), 1);
        let CalibrationEvent::ShowTarget { index, position } = events[0] else {
            panic!("expected ShowTarget");
        };
        assert_eq!(index, 0);
        assert_eq!(position, ScreenGeometry::default().center());
        assert!(matches!(e.state(), EngineState::Warmup { index: 0, .. }));
    }

    #[test]
    fn test_ingest_ignored_outside_collection() {
        let mut e = engine();
        e.ingest(ScreenPoint::new(100.0, 100.0), 0.0);
        e.start(0.0);
        e.ingest(ScreenPoint::new(100.0, 100.0), 0.1); // still warming up
        let mut now = 0.0;
        let events = run_window(&mut e, &mut now, 0);
        // Nothing was buffered, so the first target retries.
        assert!(matches!(e.state(), EngineState::RetryDelay { index: 0, .. }));
        assert!(events.is_empty());
    }

    #[test]
    fn test_window_with_enough_samples_advances() {
        let mut e = engine();
        e.start(0.0);
        let mut now = 0.0;
        // 21 samples: the settle trim drops 4 + 2, leaving 15 (the minimum).
        let events = run_window(&mut e, &mut now, 21);
        assert!(matches!(e.state(), EngineState::Warmup { index: 1, .. }));
        assert!(events
            .iter()
            .any(|ev| matches!(ev, CalibrationEvent::ShowTarget { index: 1, .. })));
        assert_eq!(e.results().len(), 1);
    }

    #[test]
    fn test_window_with_too_few_samples_retries() {
        let mut e = engine();
        e.start(0.0);
        let mut now = 0.0;
        // 20 samples trim down to 14, one short of the minimum.
        run_window(&mut e, &mut now, 20);
        assert!(matches!(e.state(), EngineState::RetryDelay { index: 0, .. }));
        assert!(e.results().is_empty());

        // After the delay the same target is shown again.
        now += 0.6;
        let events = e.advance(now);
        assert!(matches!(e.state(), EngineState::Warmup { index: 0, .. }));
        assert!(events
            .iter()
            .any(|ev| matches!(ev, CalibrationEvent::ShowTarget { index: 0, .. })));
    }

    #[test]
    fn test_steady_fixation_quality() {
        let mut e = engine();
        e.start(0.0);
        let mut now = 0.0;
        run_window(&mut e, &mut now, 21);
        // Identical on-screen samples: mean confidence 1.0 (the 0.8
        // first sample falls to the settle trim), zero variance, 15/60
        // count score.
        let quality = e.results()[0].quality;
        assert!((quality - 0.85).abs() < 1e-9, "quality was {quality}");
    }

    #[test]
    fn test_full_run_with_perfect_fixation_fits_identity() {
        let mut e = engine();
        let mut events = e.start(0.0);
        let mut now = 0.0;
        for _ in 0..7 {
            events.extend(run_window(&mut e, &mut now, 40));
        }

        let completed: Vec<&CalibrationEvent> = events
            .iter()
            .filter(|ev| matches!(ev, CalibrationEvent::Completed { .. }))
            .collect();
        assert_eq!(completed.len(), 1);
        let CalibrationEvent::Completed { success, quality } = completed[0] else {
            unreachable!();
        };
        assert!(success);
        assert!(*quality > 0.4);

        // Measured points equal target points, so the fit is the identity.
        assert!(e.is_calibrated());
        let t = e.transform();
        assert!((t.scale_x - 1.0).abs() < 1e-6);
        assert!((t.scale_y - 1.0).abs() < 1e-6);
        assert!(t.offset_x.abs() < 1e-3);
        assert!(t.offset_y.abs() < 1e-3);
        assert!(matches!(e.state(), EngineState::Done { success: true }));

        // The run is over: further advancing produces nothing.
        assert!(e.advance(now + 100.0).is_empty());
    }

    #[test]
    fn test_systematic_offset_is_corrected() {
        let mut e = engine();
        e.start(0.0);
        let mut now = 0.0;
        let screen = ScreenGeometry::default();
        let targets = CalibrationConfig::default().targets;

        for target in &targets {
            e.advance(now + 0.9);
            now += 0.9;
            let shifted = ScreenPoint::new(
                target.to_pixels(&screen).x + 60.0,
                target.to_pixels(&screen).y - 25.0,
            );
            for i in 0..40 {
                e.ingest(shifted, now + i as f64 * 0.02);
            }
            now += 3.1;
            e.advance(now);
        }

        assert!(e.is_calibrated());
        // Applying the fit to a shifted raw point recovers the target.
        let raw = ScreenPoint::new(960.0 + 60.0, 540.0 - 25.0);
        let corrected = e.apply(raw);
        assert!((corrected.x - 960.0).abs() < 1.0);
        assert!((corrected.y - 540.0).abs() < 1.0);
    }

    #[test]
    fn test_retry_exhaustion_fails_run() {
        let mut config = CalibrationConfig::default();
        config.max_retries_per_target = Some(2);
        let mut e = CalibrationEngine::new(config, ScreenGeometry::default());
        e.start(0.0);
        let mut now = 0.0;

        let mut completed = Vec::new();
        for _ in 0..3 {
            // Empty windows always retry.
            completed.extend(run_window(&mut e, &mut now, 0));
            now += 0.6;
            completed.extend(e.advance(now));
        }

        assert!(matches!(e.state(), EngineState::Done { success: false }));
        assert!(completed
            .iter()
            .any(|ev| matches!(ev, CalibrationEvent::Completed { success: false, .. })));
        assert!(!e.is_calibrated());
        assert!(e.transform().is_identity());
    }

    #[test]
    fn test_failed_run_preserves_previous_transform() {
        let previous = CalibrationTransform {
            scale_x: 1.2,
            scale_y: 0.9,
            offset_x: 10.0,
            offset_y: -5.0,
        };
        let mut config = CalibrationConfig::default();
        config.max_retries_per_target = Some(0);
        let mut e = CalibrationEngine::new(config, ScreenGeometry::default());
        e.restore_transform(previous);

        e.start(0.0);
        let mut now = 0.0;
        run_window(&mut e, &mut now, 0); // retries once, exhausting the allowance

        assert!(matches!(e.state(), EngineState::Done { success: false }));
        assert_eq!(e.transform(), previous);
        assert!(e.is_calibrated());
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut e = engine();
        e.restore_transform(CalibrationTransform {
            scale_x: 1.1,
            scale_y: 1.1,
            offset_x: 3.0,
            offset_y: 3.0,
        });
        e.start(0.0);
        e.reset();
        assert!(matches!(e.state(), EngineState::Idle));
        assert!(e.transform().is_identity());
        assert!(!e.is_calibrated());
        // A reset engine has no pending deadlines.
        assert!(e.advance(1000.0).is_empty());
    }

    #[test]
    fn test_empty_target_list_completes_immediately() {
        let mut config = CalibrationConfig::default();
        config.targets = Vec::new();
        let mut e = CalibrationEngine::new(config, ScreenGeometry::default());
        let events = e.start(0.0);
        assert_eq!(
            events,
            vec![CalibrationEvent::Completed {
                success: false,
                quality: 0.0
            }]
        );
    }

    #[test]
    fn test_confidence_scoring() {
        let mut e = engine();
        e.start(0.0);
        e.advance(0.9);
        assert!(e.is_collecting());

        // First on-screen sample: base confidence, no proximity context.
        e.ingest(ScreenPoint::new(960.0, 540.0), 1.0);
        // Nearby follow-up earns the bonus.
        e.ingest(ScreenPoint::new(970.0, 540.0), 1.02);
        // A far jump is penalized.
        e.ingest(ScreenPoint::new(100.0, 100.0), 1.04);
        // Off-screen (overscan) sample starts from the lower base.
        e.ingest(ScreenPoint::new(-50.0, 540.0), 1.06);

        let samples: Vec<CalibrationSample> = e.buffer.iter().copied().collect();
        assert!((samples[0].confidence - 0.8).abs() < 1e-9);
        assert!((samples[1].confidence - 1.0).abs() < 1e-9);
        assert!((samples[2].confidence - 0.4).abs() < 1e-9);
        // Off-screen and far from the previous point: 0.4 * 0.5.
        assert!((samples[3].confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_clean_samples_rejects_outlier() {
        let mut samples = Vec::new();
        for i in 0..30 {
            let point = if i == 15 {
                ScreenPoint::new(2000.0, 2000.0)
            } else {
                ScreenPoint::new(500.0 + (i % 3) as f64, 500.0)
            };
            samples.push(CalibrationSample {
                point,
                timestamp_s: i as f64 * 0.02,
                confidence: 0.9,
            });
        }
        let cleaned = clean_samples(&samples, 0.6);
        assert!(cleaned.iter().all(|s| s.point.x < 1000.0));
        // 30 samples trim to 21, minus the one outlier.
        assert_eq!(cleaned.len(), 20);
    }

    #[test]
    fn test_clean_samples_never_empties_confident_window() {
        // Two clusters far apart produce a huge MAD; cleaning must still
        // keep samples rather than emptying the window.
        let mut samples = Vec::new();
        for i in 0..20 {
            let x = if i % 2 == 0 { 0.0 } else { 1000.0 };
            samples.push(CalibrationSample {
                point: ScreenPoint::new(x, 0.0),
                timestamp_s: i as f64 * 0.02,
                confidence: 0.9,
            });
        }
        let cleaned = clean_samples(&samples, 0.6);
        assert!(!cleaned.is_empty());
    }

    #[test]
    fn test_fit_requires_three_usable_points() {
        let results = vec![
            CalibrationPointResult {
                target_point: ScreenPoint::new(100.0, 100.0),
                measured_point: ScreenPoint::new(110.0, 105.0),
                quality: 0.8,
                timestamp_s: 1.0,
            },
            CalibrationPointResult {
                target_point: ScreenPoint::new(900.0, 100.0),
                measured_point: ScreenPoint::new(890.0, 108.0),
                quality: 0.8,
                timestamp_s: 2.0,
            },
            CalibrationPointResult {
                target_point: ScreenPoint::new(500.0, 500.0),
                measured_point: ScreenPoint::new(505.0, 495.0),
                quality: 0.1, // below the usability bar
                timestamp_s: 3.0,
            },
        ];
        assert!(fit_transform(&results, 0.3).is_none());
    }

    #[test]
    fn test_fit_collinear_axis_falls_back_to_unit_scale() {
        // All targets on one horizontal line: no vertical spread, so the
        // y scale stays 1.0.
        let results: Vec<CalibrationPointResult> = [100.0, 500.0, 900.0]
            .iter()
            .map(|&x| CalibrationPointResult {
                target_point: ScreenPoint::new(x, 300.0),
                measured_point: ScreenPoint::new(x + 20.0, 310.0),
                quality: 0.8,
                timestamp_s: 0.0,
            })
            .collect();
        let t = fit_transform(&results, 0.3).unwrap();
        assert!((t.scale_y - 1.0).abs() < 1e-9);
        assert!((t.offset_y + 10.0).abs() < 1e-9);
        assert!((t.scale_x - 1.0).abs() < 1e-9);
        assert!((t.offset_x + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_clean_samples_keeps_mild_spread() {
        // A tight fixation with a couple of 2px wobbles: everything within
        // three median distances of the center survives.
        let xs = [
            400.0, 400.0, 500.0, 501.0, 501.0, 499.0, 499.0, 502.0, 498.0, 400.0,
        ];
        let samples: Vec<CalibrationSample> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| CalibrationSample {
                point: ScreenPoint::new(x, 500.0),
                timestamp_s: i as f64 * 0.02,
                confidence: 0.9,
            })
            .collect();
        let cleaned = clean_samples(&samples, 0.6);
        // 10 samples trim to the middle 7; none of those are outliers.
        assert_eq!(cleaned.len(), 7);
    }

    #[test]
    fn test_weak_targets_excluded_from_overall_quality() {
        // Three solid points carry the run; the weak ones stay out of both
        // the fit and the overall score.
        let mut e = engine();
        for (i, &(x, y)) in [(192.0, 108.0), (1728.0, 108.0), (960.0, 972.0)]
            .iter()
            .enumerate()
        {
            e.results.push(CalibrationPointResult {
                target_point: ScreenPoint::new(x, y),
                measured_point: ScreenPoint::new(x, y),
                quality: 0.5,
                timestamp_s: i as f64,
            });
        }
        for i in 0..4 {
            e.results.push(CalibrationPointResult {
                target_point: ScreenPoint::new(960.0, 540.0),
                measured_point: ScreenPoint::new(400.0, 900.0),
                quality: 0.2,
                timestamp_s: 10.0 + i as f64,
            });
        }

        let mut events = Vec::new();
        e.finish_run(true, &mut events);
        match events.as_slice() {
            [CalibrationEvent::Completed { success, quality }] => {
                assert!(*success);
                assert!((*quality - 0.5).abs() < 1e-9);
            }
            other => panic!("unexpected events: {other:?}"),
        }
        assert!(e.calibrated);
        assert!(e.transform.is_identity());
    }
}
