use thiserror::Error;

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Hand detector error: {0}")]
    Detector(String),

    #[error("Invalid detector output: {0}")]
    InvalidOutput(String),

    #[error("Keypoint data error: {0}")]
    Keypoints(#[from] keypoints::KeypointsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LandmarkError>;
