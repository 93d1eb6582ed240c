use rayon::prelude::*;
use tracing::info;

use super::diff::{DiffScore, FrameDiffer, LumaFrame};
use crate::error::{Error, Result};

/// Extremes and mean of one difference metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl MetricStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            min,
            max,
            avg: sum / count as f64,
        })
    }
}

/// Motion and color statistics over every adjacent frame pair of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceStatistics {
    pub motion: MetricStats,
    pub color: MetricStats,
}

impl SequenceStatistics {
    /// Score every frame against its predecessor and aggregate the results.
    pub fn compute(frames: &[LumaFrame], differ: &FrameDiffer) -> Result<Self> {
        Self::from_scores(&adjacent_scores(frames, differ)?)
    }

    /// Aggregate precomputed predecessor scores. A sequence of N frames has
    /// N - 1 of them, so an empty slice means fewer than 2 frames.
    pub fn from_scores(scores: &[DiffScore]) -> Result<Self> {
        let motion = MetricStats::from_values(scores.iter().map(|s| s.motion));
        let color = MetricStats::from_values(scores.iter().map(|s| s.color));
        let (Some(motion), Some(color)) = (motion, color) else {
            return Err(Error::InsufficientFrames(scores.len() + 1));
        };

        info!(
            pairs = scores.len(),
            min_motion = motion.min,
            max_motion = motion.max,
            avg_motion = motion.avg,
            min_color = color.min,
            max_color = color.max,
            avg_color = color.avg,
            "sequence statistics computed"
        );

        Ok(Self { motion, color })
    }
}

/// Score each frame against the one before it. Element `i` is the score of
/// frame `i + 1`. Pairs are independent and scored in parallel.
pub fn adjacent_scores(frames: &[LumaFrame], differ: &FrameDiffer) -> Result<Vec<DiffScore>> {
    if frames.len() < 2 {
        return Err(Error::InsufficientFrames(frames.len()));
    }

    frames
        .par_windows(2)
        .map(|pair| differ.diff(&pair[1], &pair[0]))
        .collect()
}
