use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "framekey", about = "Video keyframe extraction and composite propagation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Split a video into keyframe groups.
    Analyze {
        /// Input video file, or a directory of numbered frame images.
        #[arg(short, long)]
        input: PathBuf,

        /// Path to write the output protobuf report.
        #[arg(short, long)]
        output: PathBuf,

        /// JSON project config. Flags below override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: KeyframeOverrides,

        /// Characters per line of the keyframe visualization.
        #[arg(long)]
        line_width: Option<usize>,

        /// Directory to write each keyframe to as `{keyframe_index}.png`.
        #[arg(long)]
        export_keyframes: Option<PathBuf>,

        /// Colour source for exported keyframes (defaults to --input).
        #[arg(long, requires = "export_keyframes")]
        export_from: Option<PathBuf>,

        /// Write a thumbnail grid with keyframes outlined.
        #[arg(long)]
        contact_sheet: Option<PathBuf>,

        /// TTF/OTF font used to label keyframes on the contact sheet.
        #[arg(long, requires = "contact_sheet")]
        font: Option<PathBuf>,

        /// Append a human-readable summary to this text log.
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Propagate edited keyframe composites onto every frame.
    Blend {
        /// Original video file or frame directory to blend over.
        #[arg(short, long)]
        background: PathBuf,

        /// Report written by `analyze`.
        #[arg(short, long)]
        report: PathBuf,

        /// Directory holding one `{keyframe_index}.png` per keyframe.
        #[arg(short, long)]
        composites: PathBuf,

        /// Directory to write `frame_NNNNNN.png` outputs to.
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Per-run overrides of the keyframe determination settings.
#[derive(Args, Debug, Default)]
pub struct KeyframeOverrides {
    /// Weight applied to the summed luminance difference.
    #[arg(long)]
    pub motion_weight: Option<f64>,

    /// Weight applied to the histogram distance.
    #[arg(long)]
    pub color_weight: Option<f64>,

    /// Motion threshold weight in [0, 1]; higher yields more keyframes.
    #[arg(long)]
    pub motion_threshold: Option<f64>,

    /// Color threshold weight in [0, 1]; higher yields more keyframes.
    #[arg(long)]
    pub color_threshold: Option<f64>,

    /// Promote a frame once its keyframe holds more than this many children.
    #[arg(long)]
    pub max_group_size: Option<usize>,
}
