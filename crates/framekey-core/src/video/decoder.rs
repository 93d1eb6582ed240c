use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info, warn};

use super::frame::Frame;
use super::FrameSource;

/// Geometry and rate of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StreamInfo {
    width: u32,
    height: u32,
    fps: f64,
}

impl StreamInfo {
    fn probe(path: &Path) -> Result<Self> {
        info!(?path, "probing video metadata with ffprobe");

        let output = Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate"])
            .args(["-of", "csv=p=0"])
            .arg(path)
            .output()
            .context("failed to run ffprobe, is ffmpeg installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(%stderr, ?path, "ffprobe failed");
            bail!("ffprobe failed: {stderr}");
        }
        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse ffprobe's `width,height,rate` line, where rate is `num/den` or a
    /// plain number.
    fn parse(line: &str) -> Result<Self> {
        let mut fields = line.trim().split(',');
        let (Some(width), Some(height), Some(rate)) = (fields.next(), fields.next(), fields.next())
        else {
            bail!("unexpected ffprobe output, expected width,height,fps: {line:?}");
        };

        let width: u32 = width.parse().context("failed to parse width")?;
        let height: u32 = height.parse().context("failed to parse height")?;
        if width == 0 || height == 0 {
            bail!("invalid video dimensions: {width}x{height}");
        }

        let fps = match rate.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.parse().context("failed to parse fps numerator")?;
                let den: f64 = den.parse().context("failed to parse fps denominator")?;
                if den > 0.0 { num / den } else { 0.0 }
            }
            None => rate.parse().context("failed to parse fps")?,
        };
        if fps <= 0.0 {
            warn!(fps, "video has non-positive fps, timestamps will be 0.0");
        }

        Ok(Self { width, height, fps })
    }

    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Splits a stream of packed RGB24 frames into numbered images.
struct RawFrames<R> {
    reader: R,
    info: StreamInfo,
    next_index: usize,
}

impl<R: Read> RawFrames<R> {
    fn new(reader: R, info: StreamInfo) -> Self {
        Self {
            reader,
            info,
            next_index: 0,
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let frame_bytes = self.info.frame_bytes();
        let mut buf = Vec::with_capacity(frame_bytes);
        let read = (&mut self.reader)
            .take(frame_bytes as u64)
            .read_to_end(&mut buf)
            .with_context(|| format!("failed to read frame {}", self.next_index))?;

        if read == 0 {
            info!(total_frames = self.next_index, "video stream ended");
            return Ok(None);
        }
        if read < frame_bytes {
            error!(read, frame_bytes, index = self.next_index, "stream ended mid-frame");
            bail!("stream ended mid-frame {} ({read}/{frame_bytes} bytes)", self.next_index);
        }

        let image = RgbImage::from_raw(self.info.width, self.info.height, buf)
            .context("raw frame does not match the probed dimensions")?;
        let index = self.next_index;
        self.next_index += 1;
        let timestamp_seconds = if self.info.fps > 0.0 {
            index as f64 / self.info.fps
        } else {
            0.0
        };
        debug!(index, timestamp_seconds, "decoded frame");

        Ok(Some(Frame {
            image,
            index,
            timestamp_seconds,
        }))
    }
}

/// Decodes a video file through an `ffmpeg` child process piping rawvideo.
pub struct VideoDecoder {
    child: Child,
    frames: RawFrames<ChildStdout>,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("video file does not exist: {}", path.display());
        }
        let info = StreamInfo::probe(path)?;

        let mut child = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-v", "error", "pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn ffmpeg, is ffmpeg installed?")?;
        let stdout = child.stdout.take().context("ffmpeg stdout not available")?;

        info!(?path, width = info.width, height = info.height, fps = info.fps, "video decoder opened");
        Ok(Self {
            child,
            frames: RawFrames::new(stdout, info),
        })
    }
}

impl FrameSource for VideoDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frames.read_frame()
    }

    fn fps(&self) -> f64 {
        self.frames.info.fps
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        debug!(total_frames = self.frames.next_index, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
