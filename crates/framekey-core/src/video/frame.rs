use image::RgbImage;

/// A single decoded frame with its position in the source.
#[derive(Debug)]
pub struct Frame {
    /// The frame's image data.
    pub image: RgbImage,
    /// Position of the frame in the source sequence (0-based).
    pub index: usize,
    /// Elapsed seconds from the start of the source, 0.0 when the rate is unknown.
    pub timestamp_seconds: f64,
}
