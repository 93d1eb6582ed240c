mod keyframe;

pub use keyframe::KeyframeConfig;
pub(crate) use keyframe::check_unit_interval;

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::keyframes::DEFAULT_LINE_WIDTH;

/// On-disk project configuration. Every field is optional.
///
/// ```json
/// {
///     "keyframe_determination": {
///         "motion_weight": 0.001,
///         "color_weight": 1.0,
///         "motion_threshold": 0.1,
///         "color_threshold": 0.1,
///         "max_keyframe_group_size": 12
///     },
///     "visualization_line_width": 39
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub keyframe_determination: KeyframeConfig,
    pub visualization_line_width: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            keyframe_determination: KeyframeConfig::default(),
            visualization_line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!(?path, ?config, "loaded config file");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
