pub mod analysis;
pub mod composite;
pub mod config;
pub mod debug;
pub mod error;
pub mod export;
pub mod keyframes;
pub mod pipeline;
pub mod report;
pub mod video;

pub use error::{Error, Result};
