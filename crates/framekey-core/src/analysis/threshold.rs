use tracing::info;

use super::stats::{MetricStats, SequenceStatistics};
use crate::config::check_unit_interval;
use crate::error::Result;

/// Cutoffs a combined score must exceed to start a new keyframe group.
///
/// This is a tunable heuristic, not a changepoint detector: each metric
/// contributes the spread between its average and its minimum, shrunk by a
/// user weight. A weight of 0 keeps the whole spread (fewer keyframes), a
/// weight of 1 collapses the term to zero (a keyframe on any change).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub motion: f64,
    pub color: f64,
}

impl Threshold {
    pub fn compute(
        stats: &SequenceStatistics,
        motion_threshold_weight: f64,
        color_threshold_weight: f64,
    ) -> Result<Self> {
        check_unit_interval("motion_threshold", motion_threshold_weight)?;
        check_unit_interval("color_threshold", color_threshold_weight)?;

        let threshold = Self {
            motion: headroom(&stats.motion, motion_threshold_weight),
            color: headroom(&stats.color, color_threshold_weight),
        };

        info!(
            motion_threshold = threshold.motion,
            color_threshold = threshold.color,
            combined_threshold = threshold.combined(),
            "thresholds computed"
        );

        Ok(threshold)
    }

    pub fn combined(&self) -> f64 {
        self.motion + self.color
    }
}

fn headroom(stats: &MetricStats, weight: f64) -> f64 {
    (stats.avg - stats.min) * (1.0 - weight)
}
