use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::analysis::LumaFrame;
use crate::keyframes::{FrameClass, KeyframeIndex};

pub const COLUMNS: u32 = 22;
pub const CELL_WIDTH: u32 = 45;
pub const CELL_HEIGHT: u32 = 25;

const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 48, 48]);
const TEXT_SCALE: f32 = 12.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Renders a grid of frame thumbnails with the keyframes marked, for a quick
/// visual check of a segmentation.
pub struct ContactSheet {
    font: Option<FontVec>,
}

impl ContactSheet {
    /// Keyframe labels are drawn only when `font_path` names a readable TTF/OTF.
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = font_path.and_then(Self::load_font);
        Self { font }
    }

    /// One cell per frame, row-major, `COLUMNS` cells wide.
    pub fn render(&self, frames: &[LumaFrame], index: &KeyframeIndex) -> RgbImage {
        let rows = (frames.len() as u32).div_ceil(COLUMNS).max(1);
        let mut sheet = RgbImage::new(COLUMNS * CELL_WIDTH, rows * CELL_HEIGHT);

        for (frame, class) in frames.iter().zip(index.classes()) {
            let position = frame.index as u32;
            let x = (position % COLUMNS) * CELL_WIDTH;
            let y = (position / COLUMNS) * CELL_HEIGHT;

            let thumb = thumbnail(frame);
            imageops::replace(&mut sheet, &thumb, x as i64, y as i64);

            if let FrameClass::Keyframe { keyframe_index } = class {
                let cell = Rect::at(x as i32, y as i32).of_size(CELL_WIDTH, CELL_HEIGHT);
                draw_hollow_rect_mut(&mut sheet, cell, OUTLINE_COLOR);
                self.draw_label(&mut sheet, x as i32 + 2, y as i32 + 2, keyframe_index);
            }
        }

        debug!(frame_count = frames.len(), rows, "rendered contact sheet");
        sheet
    }

    pub fn save(&self, frames: &[LumaFrame], index: &KeyframeIndex, path: &Path) -> Result<()> {
        let sheet = self.render(frames, index);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        sheet
            .save(path)
            .with_context(|| format!("failed to save contact sheet to {}", path.display()))?;
        info!(?path, width = sheet.width(), height = sheet.height(), "saved contact sheet");
        Ok(())
    }

    fn draw_label(&self, img: &mut RgbImage, x: i32, y: i32, keyframe_index: usize) {
        let Some(font) = &self.font else { return };
        let scale = PxScale::from(TEXT_SCALE);
        draw_text_mut(img, TEXT_COLOR, x, y, scale, font, &keyframe_index.to_string());
    }

    fn load_font(path: &Path) -> Option<FontVec> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(?path, error = %e, "failed to read font file");
                return None;
            }
        };
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                info!(?path, "loaded label font");
                Some(font)
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to parse font file");
                None
            }
        }
    }
}

/// Shrink a frame to fit a cell, keeping its aspect ratio. Frames already
/// smaller than a cell are left as they are.
fn thumbnail(frame: &LumaFrame) -> RgbImage {
    let (width, height) = frame.dimensions();
    let scale = (CELL_WIDTH as f64 / width as f64)
        .min(CELL_HEIGHT as f64 / height as f64)
        .min(1.0);
    let thumb_width = ((width as f64 * scale).round() as u32).max(1);
    let thumb_height = ((height as f64 * scale).round() as u32).max(1);

    let luma = if (thumb_width, thumb_height) == (width, height) {
        frame.luma().clone()
    } else {
        imageops::resize(frame.luma(), thumb_width, thumb_height, FilterType::Triangle)
    };
    DynamicImage::ImageLuma8(luma).into_rgb8()
}
