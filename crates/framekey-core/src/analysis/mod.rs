//! Frame scoring, sequence statistics, thresholds and keyframe segmentation.

pub mod diff;
pub mod segment;
pub mod stats;
pub mod threshold;

pub use diff::{DiffScore, FrameDiffer, LumaFrame};
pub use segment::{KeyframeSegmenter, Segmentation};
pub use stats::{MetricStats, SequenceStatistics};
pub use threshold::Threshold;
