use image::RgbImage;
use keypoints::HandObservation;

use crate::error::Result;

/// An external hand-landmark detector.
///
/// Given one RGB frame, returns zero or more detected hands, each with a
/// handedness label and 21 landmark points in the detector's normalized
/// image coordinates (`x`, `y` in `[0, 1]`, `z` relative depth).
pub trait HandDetector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<HandObservation>>;

    /// Human-readable name used in logs
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<T: HandDetector + ?Sized> HandDetector for Box<T> {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<HandObservation>> {
        (**self).detect(frame)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

impl<T: HandDetector + ?Sized> HandDetector for &T {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<HandObservation>> {
        (**self).detect(frame)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
