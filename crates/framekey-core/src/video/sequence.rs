use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use super::frame::Frame;
use super::FrameSource;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Reads a directory of still images as an ordered frame sequence.
///
/// Files are ordered by the numeric value of their stem (`1.png`, `2.png`,
/// ..., `10.png`, as written by `ffmpeg -i in.mp4 %d.png`). Stems that are not
/// numbers sort after numeric ones, lexically. The position in that order is
/// the frame index, regardless of the number in the file name.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to read frame directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            bail!("no image files found in {}", dir.display());
        }

        paths.sort_by(|a, b| compare_frame_paths(a, b));
        info!(?dir, frame_count = paths.len(), "opened image sequence");

        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let index = self.next;
        let Some(path) = self.paths.get(index) else {
            return Ok(None);
        };
        // Advance first so an unreadable file costs only its own position.
        self.next += 1;

        let image = image::open(path)
            .with_context(|| format!("failed to load frame {}", path.display()))?
            .into_rgb8();
        debug!(index, ?path, "loaded frame");

        Ok(Some(Frame {
            image,
            index,
            timestamp_seconds: 0.0,
        }))
    }

    fn fps(&self) -> f64 {
        0.0
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn numeric_stem(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn compare_frame_paths(a: &Path, b: &Path) -> Ordering {
    match (numeric_stem(a), numeric_stem(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.file_name().cmp(&b.file_name()),
    }
}
