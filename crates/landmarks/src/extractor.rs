use std::path::Path;

use image::RgbImage;
use keypoints::{utils, FrameKeypoints, KeypointsDataset, VideoKeypoints};
use tracing::{debug, info, warn};

use crate::{error::Result, traits::HandDetector};

/// Default cap on hands kept per frame.
pub const DEFAULT_MAX_HANDS: usize = 2;

/// Turns frame images into per-frame hand keypoints with a [`HandDetector`].
pub struct LandmarkExtractor<D: HandDetector> {
    detector: D,
    max_hands: usize,
}

impl<D: HandDetector> LandmarkExtractor<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            max_hands: DEFAULT_MAX_HANDS,
        }
    }

    pub fn with_max_hands(mut self, max_hands: usize) -> Self {
        self.max_hands = max_hands.max(1);
        self
    }

    /// Get reference to the detector for advanced usage
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Keypoints of one decoded frame.
    ///
    /// A frame without any detected hand yields [`FrameKeypoints::undetected`].
    pub fn extract_frame(&self, frame: &RgbImage) -> Result<FrameKeypoints> {
        let mut hands = self.detector.detect(frame)?;
        if hands.is_empty() {
            return Ok(FrameKeypoints::undetected());
        }
        hands.truncate(self.max_hands);
        Ok(FrameKeypoints::new(hands))
    }

    /// Keypoints of every frame image in `dir`, in lexicographic file-name order.
    ///
    /// Files without an image extension are ignored; image files that cannot be
    /// decoded are skipped, not padded.
    pub fn extract_video(&self, dir: &Path) -> Result<VideoKeypoints> {
        let mut frames = Vec::new();
        for (name, path) in utils::files(dir)? {
            if !utils::is_image_file(&path) {
                debug!("Ignoring non-image file {}", path.display());
                continue;
            }
            let image = match image::open(&path) {
                Ok(image) => image.to_rgb8(),
                Err(e) => {
                    warn!("Skipping undecodable frame {}: {}", path.display(), e);
                    continue;
                }
            };
            let keypoints = self.extract_frame(&image)?;
            debug!("{}: {} hand(s)", name, keypoints.hands.len());
            frames.push(keypoints);
        }
        Ok(VideoKeypoints::new(frames))
    }

    /// Walk `<root>/<category>/<subcategory>/<frame_image>` into a dataset.
    pub fn extract_dataset(&self, root: &Path) -> Result<KeypointsDataset> {
        info!(
            "Extracting landmarks from {} with {}",
            root.display(),
            self.detector.name()
        );

        let mut dataset = KeypointsDataset::new();
        for (category, category_path) in utils::subdirectories(root)? {
            for (subcategory, subcategory_path) in utils::subdirectories(&category_path)? {
                let video = self.extract_video(&subcategory_path)?;
                info!("{}/{}: {} frames", category, subcategory, video.len());
                dataset.insert(category.clone(), subcategory, video);
            }
        }

        info!("Extracted {} label(s)", dataset.label_count());
        Ok(dataset)
    }
}
