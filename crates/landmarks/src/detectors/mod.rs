pub mod process;

pub use process::{DetectedHand, ProcessDetector};

use image::RgbImage;
use keypoints::HandObservation;

use crate::{error::Result, traits::HandDetector};

/// Detector that never finds a hand.
///
/// Useful for dry runs of the frame extractor where no overlay is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

impl HandDetector for NullDetector {
    fn detect(&self, _frame: &RgbImage) -> Result<Vec<HandObservation>> {
        Ok(Vec::new())
    }

    fn name(&self) -> String {
        "null".to_string()
    }
}
