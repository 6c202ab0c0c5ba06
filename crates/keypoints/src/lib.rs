//! # Keypoints - Shared Data Model
//!
//! Hand keypoint types shared by every stage of the gesture data-preparation
//! pipeline, together with the JSON persistence layout used between stages.
//!
//! ## Example
//!
//! ```rust
//! use keypoints::{FrameKeypoints, Handedness, KeypointsDataset, VideoKeypoints};
//!
//! let video = VideoKeypoints::new(vec![FrameKeypoints::undetected()]);
//! let mut dataset = KeypointsDataset::new();
//! dataset.insert("Adjectives", "clean", video);
//!
//! let frame = &dataset.get("Adjectives", "clean").unwrap().frames[0];
//! assert_eq!(frame.hands[0].handedness, Handedness::Left);
//! ```

pub mod dataset;
pub mod io;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

pub use dataset::{AugmentedDataset, Category, Dataset, KeypointsDataset, NormalizedDataset, Split, SplitDataset};
pub use io::{WriteReport, KEYPOINTS_FILE};

/// Number of landmarks the hand detector reports per hand.
pub const LANDMARK_COUNT: usize = 21;

/// A single `[x, y, z]` landmark position.
pub type Point3 = [f64; 3];

/// Placeholder point used wherever a frame or observation carries no data.
pub const ORIGIN: Point3 = [0.0, 0.0, 0.0];

/// Untagged point list of one frame (handedness dropped).
pub type PointFrame = Vec<Point3>;

/// Ordered untagged frames of one video.
pub type PointSequence = Vec<PointFrame>;

/// Result type for keypoint operations
pub type Result<T> = std::result::Result<T, KeypointsError>;

/// Standard error type for keypoint operations
#[derive(Error, Debug)]
pub enum KeypointsError {
    #[error("Input not found: {path}")]
    MissingInput { path: String },

    #[error("Hand observation must have {expected} points, found {found}")]
    InvalidObservation { expected: usize, found: usize },

    #[error("Label '{label}' appears in more than one category")]
    DuplicateLabel { label: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which hand a detection belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Handedness {
    Left,
    Right,
}

/// One detected hand: its handedness and exactly [`LANDMARK_COUNT`] points.
///
/// Serialized as the pair `[handedness, [[x, y, z], ...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ObservationRepr", try_from = "ObservationRepr")]
pub struct HandObservation {
    pub handedness: Handedness,
    pub points: [Point3; LANDMARK_COUNT],
}

#[derive(Serialize, Deserialize)]
struct ObservationRepr(Handedness, Vec<Point3>);

impl From<HandObservation> for ObservationRepr {
    fn from(observation: HandObservation) -> Self {
        ObservationRepr(observation.handedness, observation.points.to_vec())
    }
}

impl TryFrom<ObservationRepr> for HandObservation {
    type Error = KeypointsError;

    fn try_from(repr: ObservationRepr) -> Result<Self> {
        Self::from_points(repr.0, &repr.1)
    }
}

impl HandObservation {
    pub fn new(handedness: Handedness, points: [Point3; LANDMARK_COUNT]) -> Self {
        Self { handedness, points }
    }

    /// Build an observation from a slice, rejecting anything but 21 points.
    pub fn from_points(handedness: Handedness, points: &[Point3]) -> Result<Self> {
        let points: [Point3; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            KeypointsError::InvalidObservation {
                expected: LANDMARK_COUNT,
                found: points.len(),
            }
        })?;
        Ok(Self { handedness, points })
    }

    /// Zero-filled observation standing in for an undetected hand.
    pub fn missing(handedness: Handedness) -> Self {
        Self {
            handedness,
            points: [ORIGIN; LANDMARK_COUNT],
        }
    }
}

/// All hands observed in one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameKeypoints {
    pub hands: Vec<HandObservation>,
}

impl FrameKeypoints {
    pub fn new(hands: Vec<HandObservation>) -> Self {
        Self { hands }
    }

    /// The fixed-shape entry recorded when detection finds no hand:
    /// one zero-filled left hand followed by one zero-filled right hand.
    pub fn undetected() -> Self {
        Self {
            hands: vec![
                HandObservation::missing(Handedness::Left),
                HandObservation::missing(Handedness::Right),
            ],
        }
    }

    /// Concatenate the points of every hand, dropping handedness.
    pub fn to_point_frame(&self) -> PointFrame {
        self.hands
            .iter()
            .flat_map(|hand| hand.points.iter().copied())
            .collect()
    }
}

/// Per-frame keypoints of one video, in frame order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoKeypoints {
    pub frames: Vec<FrameKeypoints>,
}

impl VideoKeypoints {
    pub fn new(frames: Vec<FrameKeypoints>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every hand observation of the video, frame by frame.
    pub fn observations(&self) -> impl Iterator<Item = &HandObservation> {
        self.frames.iter().flat_map(|frame| frame.hands.iter())
    }

    pub fn observations_mut(&mut self) -> impl Iterator<Item = &mut HandObservation> {
        self.frames.iter_mut().flat_map(|frame| frame.hands.iter_mut())
    }

    /// Untagged form consumed by augmentation and sampling.
    pub fn to_point_sequence(&self) -> PointSequence {
        self.frames.iter().map(FrameKeypoints::to_point_frame).collect()
    }
}

/// Utility functions for walking the input directory trees
pub mod utils {
    use super::*;
    use std::path::{Path, PathBuf};

    /// Sorted `(name, path)` pairs of the sub-directories of `path`.
    pub fn subdirectories(path: &Path) -> Result<Vec<(String, PathBuf)>> {
        entries(path, |p| p.is_dir())
    }

    /// Sorted `(name, path)` pairs of the regular files in `path`.
    pub fn files(path: &Path) -> Result<Vec<(String, PathBuf)>> {
        entries(path, |p| p.is_file())
    }

    fn entries(path: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<(String, PathBuf)>> {
        if !path.exists() {
            return Err(KeypointsError::MissingInput {
                path: path.display().to_string(),
            });
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry_path = entry?.path();
            if !keep(&entry_path) {
                continue;
            }
            if let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) {
                found.push((name.to_string(), entry_path.clone()));
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    /// Check if a file extension indicates a video file
    pub fn is_video_file(path: &Path) -> bool {
        matches!(
            get_file_extension(path).as_deref(),
            Some("mp4" | "avi" | "mov" | "mkv" | "webm" | "flv" | "wmv" | "m4v")
        )
    }

    /// Check if a file extension indicates a still image
    pub fn is_image_file(path: &Path) -> bool {
        matches!(
            get_file_extension(path).as_deref(),
            Some("jpg" | "jpeg" | "png" | "bmp")
        )
    }

    /// Get the lowercased file extension
    pub fn get_file_extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}
