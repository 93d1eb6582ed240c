use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Weights and bounds that drive keyframe determination.
///
/// `motion_weight` and `color_weight` calibrate the two difference metrics
/// against each other: raw pixel-difference sums are several orders of
/// magnitude larger than histogram distances. Scores produced with different
/// weights are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframeConfig {
    /// Scales the summed absolute luminance difference.
    pub motion_weight: f64,
    /// Scales the chi-squared histogram distance.
    pub color_weight: f64,
    /// Fraction of the average-minus-minimum motion spread removed from the cutoff (0.0 to 1.0).
    pub motion_threshold: f64,
    /// Fraction of the average-minus-minimum color spread removed from the cutoff (0.0 to 1.0).
    pub color_threshold: f64,
    /// A frame is promoted once its keyframe holds more than this many children.
    pub max_keyframe_group_size: usize,
}

impl Default for KeyframeConfig {
    fn default() -> Self {
        Self {
            motion_weight: 0.001,
            color_weight: 1.0,
            motion_threshold: 0.1,
            color_threshold: 0.1,
            max_keyframe_group_size: 12,
        }
    }
}

impl KeyframeConfig {
    pub fn validate(&self) -> Result<()> {
        check_metric_weight("motion_weight", self.motion_weight)?;
        check_metric_weight("color_weight", self.color_weight)?;
        check_unit_interval("motion_threshold", self.motion_threshold)?;
        check_unit_interval("color_threshold", self.color_threshold)?;
        if self.max_keyframe_group_size == 0 {
            return Err(Error::InvalidConfiguration(
                "max_keyframe_group_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn check_metric_weight(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidConfiguration(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidConfiguration(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}
