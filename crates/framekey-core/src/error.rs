/// Errors produced by keyframe analysis and composite propagation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("at least 2 frames are required, got {0}")]
    InsufficientFrames(usize),

    #[error("cannot compare a {left_width}x{left_height} frame with a {right_width}x{right_height} frame")]
    IncompatibleFrames {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no composite image for keyframe {0}")]
    MissingComposite(usize),

    #[error("blending failed for keyframe groups {0:?}")]
    BlendFailed(Vec<usize>),

    #[error("invalid keyframe index: {0}")]
    InvalidIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
