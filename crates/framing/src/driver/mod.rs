#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use image::RgbImage;

use crate::sources::Source;

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("Failed to initialize driver: {0}")]
    Initialization(String),
    #[error("Input not found: {0}")]
    MissingInput(String),
    #[error("Failed to decode video: {0}")]
    Decode(String),
    #[error("Execution failed: {0}")]
    Execution(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A backend that can decode videos into still frames.
/// Each backend defines its own Source type.
pub trait Driver {
    /// The type of source this driver works with
    type Source: Source;

    /// Frames of one decoded video, produced one at a time
    type Frames: Iterator<Item = Result<RgbImage, DriverError>>;

    /// Build a source for a video file path
    fn source(&self, path: &std::path::Path) -> Self::Source;

    /// Decode at most `max_frames` leading frames of `source`, in presentation order.
    ///
    /// An unreadable video is an error; a short video simply yields fewer frames.
    fn decode(&self, source: &Self::Source, max_frames: usize) -> Result<Self::Frames, DriverError>;
}

impl<D: Driver + ?Sized> Driver for &D {
    type Source = D::Source;
    type Frames = D::Frames;

    fn source(&self, path: &std::path::Path) -> Self::Source {
        (**self).source(path)
    }

    fn decode(&self, source: &Self::Source, max_frames: usize) -> Result<Self::Frames, DriverError> {
        (**self).decode(source, max_frames)
    }
}
