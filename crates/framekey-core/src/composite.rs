//! Propagates one composite image per keyframe group onto every frame of
//! that group.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::keyframes::{Keyframe, KeyframeIndex};
use crate::video::FrameSource;

/// Supplies the edited image for a keyframe group.
pub trait CompositeSource {
    /// `None` when no composite exists for `keyframe_index`.
    fn composite(&mut self, keyframe_index: usize) -> Result<Option<RgbaImage>>;
}

/// Supplies the original frame at a sequence position. Positions are
/// requested in strictly increasing order.
pub trait BackgroundSource {
    fn background(&mut self, frame_index: usize) -> Result<RgbImage>;
}

/// Receives one blended output per original frame.
pub trait FrameSink {
    fn write(&mut self, frame_index: usize, image: &RgbaImage) -> Result<()>;
}

/// Outcome of a blend pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlendReport {
    pub frames_written: usize,
    pub groups_blended: usize,
    /// Keyframe indices of the groups that failed, ascending.
    pub failed_groups: Vec<usize>,
}

impl BlendReport {
    /// Number of frames written, or an error naming every failed group.
    pub fn into_result(self) -> Result<usize> {
        if self.failed_groups.is_empty() {
            Ok(self.frames_written)
        } else {
            Err(Error::BlendFailed(self.failed_groups))
        }
    }
}

/// Blends each keyframe's composite over the frames of its group.
pub struct CompositePropagator;

impl CompositePropagator {
    /// Walk the index in frame order. A failing group is logged and skipped;
    /// groups that completed stay written.
    pub fn blend(
        index: &KeyframeIndex,
        composites: &mut dyn CompositeSource,
        backgrounds: &mut dyn BackgroundSource,
        sink: &mut dyn FrameSink,
    ) -> BlendReport {
        info!(
            keyframe_count = index.len(),
            frame_count = index.frame_count(),
            "blending composites"
        );

        let mut report = BlendReport::default();
        for keyframe in index.keyframes() {
            match Self::blend_group(keyframe, composites, backgrounds, sink) {
                Ok(written) => {
                    report.frames_written += written;
                    report.groups_blended += 1;
                }
                Err(e) => {
                    error!(
                        keyframe_index = keyframe.keyframe_index(),
                        frame_index = keyframe.frame_index(),
                        error = %e,
                        "failed to blend keyframe group"
                    );
                    report.failed_groups.push(keyframe.keyframe_index());
                }
            }
        }

        info!(
            frames_written = report.frames_written,
            groups_blended = report.groups_blended,
            failed_groups = report.failed_groups.len(),
            "blending complete"
        );
        report
    }

    fn blend_group(
        keyframe: &Keyframe,
        composites: &mut dyn CompositeSource,
        backgrounds: &mut dyn BackgroundSource,
        sink: &mut dyn FrameSink,
    ) -> Result<usize> {
        let keyframe_index = keyframe.keyframe_index();
        let composite = composites
            .composite(keyframe_index)?
            .ok_or(Error::MissingComposite(keyframe_index))?;

        let mut written = 0;
        for frame_index in keyframe.members() {
            let background = backgrounds.background(frame_index)?;
            let output = blend_over(&background, &composite);
            sink.write(frame_index, &output)?;
            written += 1;
        }

        debug!(keyframe_index, written, "blended keyframe group");
        Ok(written)
    }
}

/// Porter-Duff "over" of `composite` onto `background`. The background is
/// resampled with Lanczos3 when its size differs from the composite's.
pub fn blend_over(background: &RgbImage, composite: &RgbaImage) -> RgbaImage {
    let (width, height) = composite.dimensions();
    let background = if background.dimensions() == (width, height) {
        background.clone()
    } else {
        imageops::resize(background, width, height, FilterType::Lanczos3)
    };

    let mut canvas = DynamicImage::ImageRgb8(background).into_rgba8();
    imageops::overlay(&mut canvas, composite, 0, 0);
    canvas
}

/// Composites stored as `{keyframe_index}.png` in one directory.
pub struct CompositeDirectory {
    dir: PathBuf,
}

impl CompositeDirectory {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, keyframe_index: usize) -> PathBuf {
        self.dir.join(format!("{keyframe_index}.png"))
    }
}

impl CompositeSource for CompositeDirectory {
    fn composite(&mut self, keyframe_index: usize) -> Result<Option<RgbaImage>> {
        let path = self.path_for(keyframe_index);
        if !path.is_file() {
            return Ok(None);
        }
        let image = image::open(&path)?.into_rgba8();
        debug!(keyframe_index, ?path, "loaded composite");
        Ok(Some(image))
    }
}

/// Writes blended frames as `frame_{index:06}.png`.
pub struct OutputDirectory {
    dir: PathBuf,
}

impl OutputDirectory {
    /// Create `dir` if needed.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        info!(?dir, "output directory ready");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, frame_index: usize) -> PathBuf {
        self.dir.join(format!("frame_{frame_index:06}.png"))
    }
}

impl FrameSink for OutputDirectory {
    fn write(&mut self, frame_index: usize, image: &RgbaImage) -> Result<()> {
        let path = self.path_for(frame_index);
        image.save(&path)?;
        debug!(frame_index, ?path, "wrote blended frame");
        Ok(())
    }
}

/// Serves backgrounds from a forward-only frame source, discarding frames
/// that no group asked for.
pub struct SequentialBackground<S> {
    source: S,
}

impl<S: FrameSource> SequentialBackground<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: FrameSource> BackgroundSource for SequentialBackground<S> {
    fn background(&mut self, frame_index: usize) -> Result<RgbImage> {
        loop {
            let Some(frame) = self.source.next_frame()? else {
                return Err(anyhow!("background ends before frame {frame_index}").into());
            };
            match frame.index.cmp(&frame_index) {
                Ordering::Less => debug!(skipped = frame.index, "skipping background frame"),
                Ordering::Equal => return Ok(frame.image),
                Ordering::Greater => {
                    return Err(anyhow!(
                        "background frame {frame_index} requested after frame {} was read",
                        frame.index
                    )
                    .into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use image::{Rgb, Rgba};
    use tracing_test::traced_test;

    use super::*;
    use crate::video::frame::Frame;

    struct MemoryComposites(HashMap<usize, RgbaImage>);

    impl CompositeSource for MemoryComposites {
        fn composite(&mut self, keyframe_index: usize) -> Result<Option<RgbaImage>> {
            Ok(self.0.get(&keyframe_index).cloned())
        }
    }

    /// Flat frames whose red channel is the frame index.
    struct FlatBackgrounds {
        width: u32,
        height: u32,
        requested: Vec<usize>,
    }

    impl FlatBackgrounds {
        fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                requested: Vec::new(),
            }
        }
    }

    impl BackgroundSource for FlatBackgrounds {
        fn background(&mut self, frame_index: usize) -> Result<RgbImage> {
            self.requested.push(frame_index);
            Ok(RgbImage::from_pixel(
                self.width,
                self.height,
                Rgb([frame_index as u8, 0, 0]),
            ))
        }
    }

    #[derive(Default)]
    struct MemorySink(BTreeMap<usize, RgbaImage>);

    impl FrameSink for MemorySink {
        fn write(&mut self, frame_index: usize, image: &RgbaImage) -> Result<()> {
            self.0.insert(frame_index, image.clone());
            Ok(())
        }
    }

    struct VecSource(std::vec::IntoIter<Frame>);

    impl FrameSource for VecSource {
        fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
            Ok(self.0.next())
        }

        fn fps(&self) -> f64 {
            0.0
        }
    }

    fn vec_source(count: usize) -> VecSource {
        let frames: Vec<Frame> = (0..count)
            .map(|index| Frame {
                image: RgbImage::from_pixel(2, 2, Rgb([index as u8 * 10, 0, 0])),
                index,
                timestamp_seconds: 0.0,
            })
            .collect();
        VecSource(frames.into_iter())
    }

    /// Keyframe 0 owns frames 0-1, keyframe 1 (frame 2) owns 3, 4 and 5.
    fn two_groups() -> KeyframeIndex {
        KeyframeIndex::from_groups(
            vec![
                Keyframe::new(0, 0, vec![1]),
                Keyframe::new(1, 2, vec![3, 4, 5]),
            ],
            6,
        )
        .unwrap()
    }

    fn opaque(width: u32, height: u32, color: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]))
    }

    fn assert_pixel_near(actual: &Rgba<u8>, expected: [u8; 4]) {
        for (a, e) in actual.0.iter().zip(expected) {
            assert!(a.abs_diff(e) <= 1, "got {actual:?}, expected {expected:?}");
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framekey-composite-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    #[traced_test]
    fn group_composite_is_reused_for_every_member() {
        let index = two_groups();
        let composite = opaque(3, 3, [0, 200, 0]);
        let mut composites = MemoryComposites(HashMap::from([(1, composite.clone())]));
        let mut backgrounds = FlatBackgrounds::new(3, 3);
        let mut sink = MemorySink::default();

        let report =
            CompositePropagator::blend(&index, &mut composites, &mut backgrounds, &mut sink);

        assert_eq!(sink.0.keys().copied().collect::<Vec<_>>(), [2, 3, 4, 5]);
        for image in sink.0.values() {
            assert_eq!(image.dimensions(), composite.dimensions());
            assert_pixel_near(image.get_pixel(2, 1), [0, 200, 0, 255]);
        }
        assert_eq!(backgrounds.requested, [2, 3, 4, 5]);
        assert_eq!(report.frames_written, 4);
        assert_eq!(report.groups_blended, 1);
        assert_eq!(report.failed_groups, [0]);
        assert!(logs_contain("failed to blend keyframe group"));
    }

    #[test]
    fn missing_composites_are_named_in_the_error() {
        let index = two_groups();
        let mut composites = MemoryComposites(HashMap::new());
        let mut backgrounds = FlatBackgrounds::new(1, 1);
        let mut sink = MemorySink::default();

        let report =
            CompositePropagator::blend(&index, &mut composites, &mut backgrounds, &mut sink);

        assert!(sink.0.is_empty());
        assert!(backgrounds.requested.is_empty());
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, Error::BlendFailed(ref groups) if groups == &[0, 1]), "got {err:?}");
    }

    #[test]
    fn complete_blend_reports_frame_count() {
        let index = two_groups();
        let mut composites = MemoryComposites(HashMap::from([
            (0, opaque(1, 1, [1, 1, 1])),
            (1, opaque(1, 1, [2, 2, 2])),
        ]));
        let mut sink = MemorySink::default();

        let report = CompositePropagator::blend(
            &index,
            &mut composites,
            &mut FlatBackgrounds::new(1, 1),
            &mut sink,
        );

        assert_eq!(report.clone().into_result().unwrap(), 6);
        assert_pixel_near(sink.0[&1].get_pixel(0, 0), [1, 1, 1, 255]);
        assert_pixel_near(sink.0[&5].get_pixel(0, 0), [2, 2, 2, 255]);
    }

    #[test]
    fn half_transparent_composite_mixes_with_background() {
        let background = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
        let composite = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        let out = blend_over(&background, &composite);
        let p = out.get_pixel(1, 1);
        assert!(p[0].abs_diff(128) <= 1, "red {}", p[0]);
        assert_eq!(p[1], 0);
        assert!(p[2].abs_diff(127) <= 1, "blue {}", p[2]);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn background_is_resized_to_the_composite() {
        let background = RgbImage::from_pixel(2, 2, Rgb([90, 90, 90]));
        let transparent = RgbaImage::from_pixel(5, 3, Rgba([0, 0, 0, 0]));
        let out = blend_over(&background, &transparent);
        assert_eq!(out.dimensions(), (5, 3));
        for p in out.pixels() {
            assert!(p[0].abs_diff(90) <= 1, "got {p:?}");
            assert_eq!(p[3], 255);
        }
    }

    #[test]
    fn sequential_background_skips_unrequested_frames() {
        let mut backgrounds = SequentialBackground::new(vec_source(6));
        assert_eq!(backgrounds.background(2).unwrap().get_pixel(0, 0), &Rgb([20, 0, 0]));
        assert_eq!(backgrounds.background(5).unwrap().get_pixel(0, 0), &Rgb([50, 0, 0]));
        assert!(backgrounds.background(6).is_err());
    }

    #[test]
    fn sequential_background_rejects_going_backwards() {
        let mut backgrounds = SequentialBackground::new(vec_source(6));
        backgrounds.background(3).unwrap();
        assert!(backgrounds.background(1).is_err());
    }

    #[test]
    fn directories_round_trip_composites_and_outputs() {
        let composites_dir = scratch_dir("in");
        let output_dir = scratch_dir("out").join("nested");
        opaque(2, 2, [9, 8, 7]).save(composites_dir.join("0.png")).unwrap();
        opaque(2, 2, [1, 2, 3]).save(composites_dir.join("1.png")).unwrap();

        let mut composites = CompositeDirectory::new(&composites_dir);
        assert!(composites.composite(7).unwrap().is_none());

        let mut sink = OutputDirectory::create(&output_dir).unwrap();
        let report = CompositePropagator::blend(
            &two_groups(),
            &mut composites,
            &mut SequentialBackground::new(vec_source(6)),
            &mut sink,
        );
        assert_eq!(report.into_result().unwrap(), 6);

        let written = image::open(output_dir.join("frame_000004.png")).unwrap().into_rgba8();
        assert_pixel_near(written.get_pixel(1, 1), [1, 2, 3, 255]);
        assert!(output_dir.join("frame_000000.png").is_file());
        assert!(!output_dir.join("frame_000006.png").exists());

        let _ = std::fs::remove_dir_all(&composites_dir);
        let _ = std::fs::remove_dir_all(output_dir.parent().unwrap());
    }
}
