use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::analysis::stats::adjacent_scores;
use crate::analysis::{FrameDiffer, KeyframeSegmenter, LumaFrame, SequenceStatistics, Threshold};
use crate::composite::{CompositeDirectory, CompositePropagator, OutputDirectory, SequentialBackground};
use crate::config::{ConfigFile, KeyframeConfig};
use crate::debug::ContactSheet;
use crate::error::Error;
use crate::export::export_keyframes;
use crate::keyframes::{KeyframeIndex, DEFAULT_LINE_WIDTH};
use crate::report::Analysis;
use crate::video::{open_source, FrameSource};

/// Parameters for an analysis run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub keyframe: KeyframeConfig,
    /// Characters per line of the keyframe visualization.
    pub line_width: usize,
    /// Directory to export keyframe images to, or None to skip.
    pub export_dir: Option<PathBuf>,
    /// Colour source for exported keyframes. Defaults to the analysis input.
    pub export_from: Option<PathBuf>,
    /// Path of the contact sheet image, or None to skip.
    pub contact_sheet: Option<PathBuf>,
    /// Font for contact sheet labels.
    pub font: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keyframe: KeyframeConfig::default(),
            line_width: DEFAULT_LINE_WIDTH,
            export_dir: None,
            export_from: None,
            contact_sheet: None,
            font: None,
        }
    }
}

impl From<ConfigFile> for PipelineConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            keyframe: file.keyframe_determination,
            line_width: file.visualization_line_width,
            ..Self::default()
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> crate::Result<()> {
        self.keyframe.validate()?;
        if self.line_width == 0 {
            return Err(Error::InvalidConfiguration(
                "visualization line width must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Run keyframe analysis on a video file or a directory of frames.
///
/// The input is decoded once and only its luminance planes are kept. Keyframe
/// export re-reads its colour source, so it never holds more than one full
/// frame at a time.
pub fn run_analysis(input: &Path, config: &PipelineConfig) -> Result<Analysis> {
    config.validate()?;

    info!(
        ?input,
        motion_weight = config.keyframe.motion_weight,
        color_weight = config.keyframe.color_weight,
        motion_threshold = config.keyframe.motion_threshold,
        color_threshold = config.keyframe.color_threshold,
        max_group_size = config.keyframe.max_keyframe_group_size,
        "pipeline starting"
    );

    let mut source = open_source(input).context("failed to open input")?;
    let fps = source.fps();
    let frames = collect_luma_frames(&mut source)?;
    info!(frame_count = frames.len(), fps, "frame collection complete");

    let analysis = analyze_frames(input, fps, &frames, &config.keyframe, config.line_width)
        .context("keyframe analysis failed")?;

    if let Some(dir) = &config.export_dir {
        let from = config.export_from.as_deref().unwrap_or(input);
        let mut colour = open_source(from).context("failed to open keyframe export source")?;
        export_keyframes(&mut colour, &analysis.index, dir)?;
    }

    if let Some(path) = &config.contact_sheet {
        ContactSheet::new(config.font.as_deref()).save(&frames, &analysis.index, path)?;
    }

    info!(
        frame_count = analysis.frame_count(),
        keyframe_count = analysis.index.len(),
        combined_threshold = analysis.threshold.combined(),
        "pipeline complete"
    );
    Ok(analysis)
}

/// Statistics, thresholds and segmentation over already decoded frames.
pub fn analyze_frames(
    source: &Path,
    fps: f64,
    frames: &[LumaFrame],
    config: &KeyframeConfig,
    line_width: usize,
) -> crate::Result<Analysis> {
    config.validate()?;

    let differ = FrameDiffer::from_config(config);
    let predecessor_scores = adjacent_scores(frames, &differ)?;
    let statistics = SequenceStatistics::from_scores(&predecessor_scores)?;
    let threshold =
        Threshold::compute(&statistics, config.motion_threshold, config.color_threshold)?;

    let segmentation =
        KeyframeSegmenter::new(differ, threshold, config.max_keyframe_group_size).segment(frames)?;
    let records = Analysis::build_records(
        &segmentation.index,
        &predecessor_scores,
        &segmentation.anchor_scores,
    );
    let visualization = segmentation.index.visualization(line_width);

    Ok(Analysis {
        source: source.to_path_buf(),
        fps,
        config: *config,
        statistics,
        threshold,
        index: segmentation.index,
        records,
        visualization,
    })
}

/// Blend the composites in `composites_dir` over the background sequence and
/// write one image per frame into `output_dir`. Returns the number of frames
/// written; fails after the pass if any group could not be blended.
pub fn run_blend(
    background: &Path,
    index: &KeyframeIndex,
    composites_dir: &Path,
    output_dir: &Path,
) -> Result<usize> {
    if !composites_dir.is_dir() {
        bail!("composites directory does not exist: {}", composites_dir.display());
    }

    info!(?background, ?composites_dir, ?output_dir, "blend starting");

    let source = open_source(background).context("failed to open background")?;
    let mut backgrounds = SequentialBackground::new(source);
    let mut composites = CompositeDirectory::new(composites_dir);
    let mut sink = OutputDirectory::create(output_dir).context("failed to create output directory")?;

    let report = CompositePropagator::blend(index, &mut composites, &mut backgrounds, &mut sink);
    if !report.failed_groups.is_empty() {
        warn!(
            failed_groups = ?report.failed_groups,
            frames_written = report.frames_written,
            "some keyframe groups were not blended"
        );
    }
    Ok(report.into_result()?)
}

fn collect_luma_frames(source: &mut dyn FrameSource) -> Result<Vec<LumaFrame>> {
    let mut frames = Vec::new();
    while let Some(frame) = source.next_frame()? {
        if frame.index != frames.len() {
            bail!(
                "frame source skipped ahead: expected frame {}, got {}",
                frames.len(),
                frame.index
            );
        }
        debug!(index = frame.index, "converting frame to luma");
        frames.push(LumaFrame::from_rgb(frame.index, &frame.image));
    }
    Ok(frames)
}
