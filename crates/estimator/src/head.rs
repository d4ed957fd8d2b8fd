//! Head motion compensation.
//!
//! Gaze directions are calibrated against the head pose the user held at
//! calibration time. As the head drifts, the raw eye ray picks up an error
//! roughly proportional to the rotation delta. This stage keeps a reference
//! head pose, corrects each frame's eye ray relative to it, and silently
//! re-anchors the reference while the user is effectively still so long
//! sessions do not accumulate drift.

use std::collections::VecDeque;

use glam::{Mat4, Quat, Vec3};

use crate::config::HeadCompensationConfig;

/// Maintains the reference head pose and corrects eye rays for head
/// rotation/translation relative to it.
#[derive(Debug, Clone)]
pub struct HeadMotionCompensator {
    config: HeadCompensationConfig,
    reference: Option<Mat4>,
    history: VecDeque<Mat4>,
}

impl HeadMotionCompensator {
    pub fn new(config: HeadCompensationConfig) -> Self {
        let capacity = config.history_window.max(1);
        Self {
            config,
            reference: None,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Record this frame's head transform.
    ///
    /// Bootstraps the reference from the first transform seen. Once the
    /// history is full, a run of mutually stable recent poses re-anchors
    /// the reference to the newest one.
    pub fn observe(&mut self, transform: Mat4) {
        if self.history.len() >= self.config.history_window.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(transform);

        if self.reference.is_none() {
            self.reference = Some(transform);
            tracing::debug!("Head reference bootstrapped");
            return;
        }

        if self.history.len() >= self.config.history_window && self.recent_poses_stable() {
            self.reference = Some(transform);
            tracing::debug!("Head reference re-anchored to stable pose");
        }
    }

    /// Correct an eye position/direction for head drift relative to the
    /// reference pose. Without a reference the inputs pass through
    /// unchanged.
    pub fn compensate(&self, position: Vec3, direction: Vec3) -> (Vec3, Vec3) {
        let Some(reference) = self.reference else {
            return (position, direction);
        };
        let Some(current) = self.history.back() else {
            return (position, direction);
        };

        let (ref_rotation, ref_translation) = decompose(&reference);
        let (cur_rotation, cur_translation) = decompose(current);

        let rotation_delta = shortest_arc(cur_rotation * ref_rotation.inverse()).to_scaled_axis();
        let translation_delta = cur_translation - ref_translation;

        let f = self.config.compensation_factor as f32;
        let compensated_direction = Vec3::new(
            direction.x - rotation_delta.y * f,
            direction.y + rotation_delta.x * f,
            direction.z,
        )
        .normalize();

        (position - translation_delta, compensated_direction)
    }

    /// Force the reference to the most recent head transform, e.g. right
    /// before calibration starts.
    pub fn set_reference(&mut self) {
        if let Some(latest) = self.history.back() {
            self.reference = Some(*latest);
            tracing::debug!("Head reference set manually");
        }
    }

    /// Clear the reference and history.
    pub fn reset(&mut self) {
        self.reference = None;
        self.history.clear();
    }

    /// Whether a reference pose has been established.
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Max pairwise translation and rotation variation among the most
    /// recent poses, compared against the stability thresholds.
    fn recent_poses_stable(&self) -> bool {
        let span = self.config.stability_span.max(2);
        if self.history.len() < span {
            return false;
        }

        let recent: Vec<(Quat, Vec3)> = self
            .history
            .iter()
            .rev()
            .take(span)
            .map(decompose)
            .collect();

        let mut max_translation = 0.0f32;
        let mut max_rotation = 0.0f32;
        for i in 0..recent.len() {
            for j in (i + 1)..recent.len() {
                let translation = recent[i].1.distance(recent[j].1);
                let rotation = recent[i].0.angle_between(recent[j].0);
                max_translation = max_translation.max(translation);
                max_rotation = max_rotation.max(rotation);
            }
        }

        max_translation < self.config.stability_translation as f32
            && max_rotation < self.config.stability_rotation_rad as f32
    }
}

fn decompose(transform: &Mat4) -> (Quat, Vec3) {
    let (_, rotation, translation) = transform.to_scale_rotation_translation();
    (rotation, translation)
}

/// Pick the short-arc representation so the scaled-axis delta stays small
/// for small rotations.
fn shortest_arc(q: Quat) -> Quat {
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}
