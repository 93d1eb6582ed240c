use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::keyframes::KeyframeIndex;
use crate::video::FrameSource;

/// Path of the exported image for `keyframe_index`.
pub fn keyframe_path(dir: &Path, keyframe_index: usize) -> PathBuf {
    dir.join(format!("{keyframe_index}.png"))
}

/// Stream `source` and save each keyframe as `{keyframe_index}.png` in `dir`,
/// in full colour. Reading stops after the last keyframe.
pub fn export_keyframes(
    source: &mut dyn FrameSource,
    index: &KeyframeIndex,
    dir: &Path,
) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create keyframe directory {}", dir.display()))?;
    info!(?dir, keyframe_count = index.len(), "exporting keyframes");

    let mut pending = index.keyframes().iter().peekable();
    let mut exported = 0;

    while let Some(next) = pending.peek() {
        let Some(frame) = source.next_frame()? else {
            bail!(
                "source ended before keyframe {} (frame {})",
                next.keyframe_index(),
                next.frame_index()
            );
        };
        if frame.index < next.frame_index() {
            continue;
        }
        if frame.index > next.frame_index() {
            bail!(
                "source skipped past keyframe {} (frame {}), got frame {}",
                next.keyframe_index(),
                next.frame_index(),
                frame.index
            );
        }

        let path = keyframe_path(dir, next.keyframe_index());
        frame
            .image
            .save(&path)
            .with_context(|| format!("failed to save keyframe to {}", path.display()))?;
        debug!(
            keyframe_index = next.keyframe_index(),
            frame_index = frame.index,
            ?path,
            "exported keyframe"
        );
        exported += 1;
        pending.next();
    }

    info!(?dir, exported, "keyframe export complete");
    Ok(exported)
}
