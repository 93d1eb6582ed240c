pub mod decoder;
pub mod frame;
pub mod sequence;

use std::path::Path;

use anyhow::{bail, Result};

use decoder::VideoDecoder;
use frame::Frame;
use sequence::ImageSequence;

/// An ordered producer of decoded frames.
pub trait FrameSource {
    /// Read the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Frames per second, 0.0 if the source has no timing.
    fn fps(&self) -> f64;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn fps(&self) -> f64 {
        (**self).fps()
    }
}

/// Open a frame source: a directory is read as an image sequence,
/// anything else is decoded as a video file.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if !path.exists() {
        bail!("input does not exist: {}", path.display());
    }
    if path.is_dir() {
        Ok(Box::new(ImageSequence::open(path)?))
    } else {
        Ok(Box::new(VideoDecoder::open(path)?))
    }
}
