use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Invalid parameter {name}: {value} (expected {expected})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("Keypoint data error: {0}")]
    Keypoints(#[from] keypoints::KeypointsError),
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Reject probabilities and ratios outside `[0, 1]`.
pub(crate) fn check_unit_interval(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PreprocessError::InvalidParameter {
            name,
            value,
            expected: "a value in [0, 1]",
        })
    }
}
