//! Analysis results and their persisted forms: the protobuf report and the
//! human-readable run log.

use std::fmt::{self, Write as _};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use framekey_proto::proto;

use crate::analysis::{DiffScore, SequenceStatistics, Threshold};
use crate::config::KeyframeConfig;
use crate::error::Result;
use crate::keyframes::{FrameClass, GroupSummary, Keyframe, KeyframeIndex};

/// What was decided about one frame, and on which scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub class: FrameClass,
    /// Against the preceding frame. `None` for frame 0.
    pub predecessor_score: Option<DiffScore>,
    /// Against the anchor keyframe at classification time. `None` for frame 0.
    pub anchor_score: Option<DiffScore>,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub source: PathBuf,
    pub fps: f64,
    pub config: KeyframeConfig,
    pub statistics: SequenceStatistics,
    pub threshold: Threshold,
    pub index: KeyframeIndex,
    pub records: Vec<FrameRecord>,
    pub visualization: String,
}

impl Analysis {
    /// Pair each frame's classification with its scores. `predecessor_scores`
    /// holds one score per frame after the first; `anchor_scores` one per frame.
    pub fn build_records(
        index: &KeyframeIndex,
        predecessor_scores: &[DiffScore],
        anchor_scores: &[Option<DiffScore>],
    ) -> Vec<FrameRecord> {
        index
            .classes()
            .zip(anchor_scores)
            .enumerate()
            .map(|(frame_index, (class, anchor_score))| FrameRecord {
                frame_index,
                class,
                predecessor_score: frame_index
                    .checked_sub(1)
                    .and_then(|i| predecessor_scores.get(i))
                    .copied(),
                anchor_score: *anchor_score,
            })
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.index.frame_count()
    }

    pub fn summary(&self) -> GroupSummary {
        self.index.summary()
    }

    pub fn to_proto(&self) -> proto::AnalysisReport {
        let summary = self.summary();
        proto::AnalysisReport {
            source: self.source.to_string_lossy().into_owned(),
            fps: self.fps,
            frame_count: self.frame_count() as u32,
            weights: Some(proto::Weights {
                motion_weight: self.config.motion_weight,
                color_weight: self.config.color_weight,
                motion_threshold: self.config.motion_threshold,
                color_threshold: self.config.color_threshold,
                max_keyframe_group_size: self.config.max_keyframe_group_size as u32,
            }),
            statistics: Some(proto::DifferenceStatistics {
                min_motion_diff: self.statistics.motion.min,
                max_motion_diff: self.statistics.motion.max,
                average_motion_diff: self.statistics.motion.avg,
                min_color_diff: self.statistics.color.min,
                max_color_diff: self.statistics.color.max,
                average_color_diff: self.statistics.color.avg,
            }),
            thresholds: Some(proto::Thresholds {
                motion_threshold: self.threshold.motion,
                color_threshold: self.threshold.color,
                combined_threshold: self.threshold.combined(),
            }),
            keyframes: self
                .index
                .keyframes()
                .iter()
                .map(|kf| proto::KeyframeGroup {
                    keyframe_index: kf.keyframe_index() as u32,
                    frame_index: kf.frame_index() as u32,
                    children: kf.children().iter().map(|&c| c as u32).collect(),
                })
                .collect(),
            frames: self
                .records
                .iter()
                .map(|r| proto::FrameRecord {
                    frame_index: r.frame_index as u32,
                    is_keyframe: r.class.is_keyframe(),
                    keyframe_index: r.class.keyframe_index() as u32,
                    predecessor_score: r.predecessor_score.map(score_to_proto),
                    anchor_score: r.anchor_score.map(score_to_proto),
                })
                .collect(),
            summary: Some(proto::GroupSummary {
                keyframe_count: summary.keyframe_count as u32,
                keyframe_ratio: summary.keyframe_ratio,
                average_group_size: summary.average_group_size,
                largest_group_size: summary.largest_group_size as u32,
                smallest_group_size: summary.smallest_group_size as u32,
            }),
            visualization: self.visualization.clone(),
        }
    }

    /// The human-readable block written to the run log.
    pub fn text_summary(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_summary(&mut out);
        out
    }

    fn write_summary(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let stats = &self.statistics;
        let summary = self.summary();
        let indices: Vec<String> = self
            .index
            .original_indices()
            .iter()
            .map(usize::to_string)
            .collect();

        writeln!(out, "source: {}", self.source.display())?;
        writeln!(out, "fps: {}", self.fps)?;
        writeln!(out, "frame count: {}", self.frame_count())?;
        writeln!(out, "difference properties:")?;
        for (name, value) in [
            ("min_motion_diff", stats.motion.min),
            ("max_motion_diff", stats.motion.max),
            ("average_motion_diff", stats.motion.avg),
            ("min_color_diff", stats.color.min),
            ("max_color_diff", stats.color.max),
            ("average_color_diff", stats.color.avg),
            ("calculated_motion_threshold", self.threshold.motion),
            ("calculated_color_threshold", self.threshold.color),
            ("combined_threshold", self.threshold.combined()),
        ] {
            writeln!(out, "  {name}: {value}")?;
        }
        writeln!(out, "keyframe details:")?;
        writeln!(out, "  number of keyframes: {}", summary.keyframe_count)?;
        writeln!(out, "  ratio of keyframes to frames: {}", summary.keyframe_ratio)?;
        writeln!(out, "  average keyframe group size: {}", summary.average_group_size)?;
        writeln!(out, "  largest keyframe group: {}", summary.largest_group_size)?;
        writeln!(out, "  smallest keyframe group: {}", summary.smallest_group_size)?;
        writeln!(out, "keyframe original indices:\n[{}]", indices.join(", "))?;
        writeln!(
            out,
            "keyframe visualization:\n{}",
            self.visualization.trim_end_matches('\n')
        )
    }
}

fn score_to_proto(score: DiffScore) -> proto::Score {
    proto::Score {
        motion: score.motion,
        color: score.color,
        combined: score.combined(),
    }
}

/// Rebuild and validate the keyframe index stored in a report.
pub fn index_from_report(report: &proto::AnalysisReport) -> Result<KeyframeIndex> {
    let keyframes = report
        .keyframes
        .iter()
        .map(|group| {
            Keyframe::new(
                group.keyframe_index as usize,
                group.frame_index as usize,
                group.children.iter().map(|&c| c as usize).collect(),
            )
        })
        .collect();
    KeyframeIndex::from_groups(keyframes, report.frame_count as usize)
}

/// Append a timestamped summary block to a plain-text log, creating the file
/// and its directory if needed.
pub fn append_run_log(path: &Path, analysis: &Analysis) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let written_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    write!(
        file,
        "\n== framekey analysis (unix time {written_at}) ==\n{}",
        analysis.text_summary()
    )?;

    info!(?path, "appended run log entry");
    Ok(())
}
