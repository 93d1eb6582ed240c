mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use prost::Message;
use tracing::{info, warn};

use framekey_core::config::ConfigFile;
use framekey_core::pipeline::{self, PipelineConfig};
use framekey_core::report;
use framekey_proto::proto::AnalysisReport;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Analyze {
            input,
            output,
            config,
            overrides,
            line_width,
            export_keyframes,
            export_from,
            contact_sheet,
            font,
            log,
        } => {
            info!(?input, ?output, ?config, "starting analysis");

            let file = match &config {
                Some(path) => ConfigFile::load(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => ConfigFile::default(),
            };
            let mut config = PipelineConfig::from(file);
            apply_overrides(&mut config, &overrides, line_width);
            config.export_dir = export_keyframes;
            config.export_from = export_from;
            config.contact_sheet = contact_sheet;
            config.font = font;

            let analysis = pipeline::run_analysis(&input, &config).context("pipeline failed")?;

            if analysis.index.len() == analysis.frame_count() {
                warn!("every frame became a keyframe, consider lowering the threshold weights");
            }

            write_report(&analysis.to_proto(), &output)?;

            if let Some(log) = &log {
                report::append_run_log(log, &analysis)
                    .with_context(|| format!("failed to append to {}", log.display()))?;
            }

            info!(
                frame_count = analysis.frame_count(),
                keyframe_count = analysis.index.len(),
                ?output,
                "analysis complete"
            );
            println!("{}", analysis.visualization.trim_end());

            Ok(())
        }
        cli::Command::Blend {
            background,
            report: report_path,
            composites,
            output,
        } => {
            info!(?background, ?report_path, ?composites, ?output, "starting blend");

            let analysis_report = read_report(&report_path)?;
            let index = report::index_from_report(&analysis_report)
                .with_context(|| format!("invalid keyframe index in {}", report_path.display()))?;

            let written = pipeline::run_blend(&background, &index, &composites, &output)
                .context("blend failed")?;

            info!(frames_written = written, ?output, "blend complete");
            Ok(())
        }
    }
}

fn apply_overrides(
    config: &mut PipelineConfig,
    overrides: &cli::KeyframeOverrides,
    line_width: Option<usize>,
) {
    let keyframe = &mut config.keyframe;
    if let Some(v) = overrides.motion_weight {
        keyframe.motion_weight = v;
    }
    if let Some(v) = overrides.color_weight {
        keyframe.color_weight = v;
    }
    if let Some(v) = overrides.motion_threshold {
        keyframe.motion_threshold = v;
    }
    if let Some(v) = overrides.color_threshold {
        keyframe.color_threshold = v;
    }
    if let Some(v) = overrides.max_group_size {
        keyframe.max_keyframe_group_size = v;
    }
    if let Some(v) = line_width {
        config.line_width = v;
    }
}

/// Serialize the report as length-delimited protobuf and write it to file.
fn write_report(report: &AnalysisReport, output: &Path) -> Result<()> {
    info!(?output, keyframe_count = report.keyframes.len(), "writing protobuf output");

    let mut buf = Vec::new();
    report
        .encode_length_delimited(&mut buf)
        .context("failed to encode AnalysisReport")?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).context("failed to create output directory")?;
    }

    std::fs::write(output, &buf)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(?output, bytes = buf.len(), "protobuf output written");
    Ok(())
}

/// Read the first length-delimited report from a file.
fn read_report(path: &Path) -> Result<AnalysisReport> {
    let buf = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if buf.is_empty() {
        bail!("report file is empty: {}", path.display());
    }
    let report = AnalysisReport::decode_length_delimited(buf.as_slice())
        .with_context(|| format!("failed to decode AnalysisReport from {}", path.display()))?;
    info!(?path, frame_count = report.frame_count, keyframe_count = report.keyframes.len(), "read report");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use framekey_proto::proto::KeyframeGroup;

    use super::*;

    #[test]
    fn overrides_replace_only_given_values() {
        let mut config = PipelineConfig::default();
        let overrides = cli::KeyframeOverrides {
            motion_threshold: Some(0.7),
            max_group_size: Some(3),
            ..Default::default()
        };
        apply_overrides(&mut config, &overrides, Some(12));

        assert_eq!(config.keyframe.motion_threshold, 0.7);
        assert_eq!(config.keyframe.max_keyframe_group_size, 3);
        assert_eq!(config.keyframe.color_threshold, 0.1);
        assert_eq!(config.keyframe.motion_weight, 0.001);
        assert_eq!(config.line_width, 12);
    }

    #[test]
    fn report_file_round_trips() {
        let dir = std::env::temp_dir().join(format!("framekey-cli-{}", std::process::id()));
        let path = dir.join("report.pb");
        let written = AnalysisReport {
            source: "clip.mp4".into(),
            frame_count: 3,
            keyframes: vec![
                KeyframeGroup { keyframe_index: 0, frame_index: 0, children: vec![1] },
                KeyframeGroup { keyframe_index: 1, frame_index: 2, children: vec![] },
            ],
            ..Default::default()
        };

        write_report(&written, &path).unwrap();
        let read = read_report(&path).unwrap();
        assert_eq!(read, written);
        assert_eq!(report::index_from_report(&read).unwrap().original_indices(), [0, 2]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cli_parses_analyze_flags() {
        let cli = cli::Cli::try_parse_from([
            "framekey",
            "analyze",
            "-i",
            "clip.mp4",
            "-o",
            "out.pb",
            "--motion-threshold",
            "0.3",
            "--export-keyframes",
            "kf",
        ])
        .unwrap();
        let cli::Command::Analyze { overrides, export_keyframes, .. } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(overrides.motion_threshold, Some(0.3));
        assert_eq!(export_keyframes.as_deref(), Some(Path::new("kf")));
    }

    #[test]
    fn export_from_requires_export_dir() {
        let result = cli::Cli::try_parse_from([
            "framekey", "analyze", "-i", "a", "-o", "b", "--export-from", "c",
        ]);
        assert!(result.is_err());
    }
}
