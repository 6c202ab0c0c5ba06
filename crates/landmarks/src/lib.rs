//! # Hand Landmark Extraction
//!
//! Runs an external hand-landmark detector over directories of frame images
//! and assembles the results into a [`keypoints::KeypointsDataset`].
//!
//! The detector itself lives outside this crate behind the [`HandDetector`]
//! trait; [`ProcessDetector`] keeps one external program running and exchanges
//! length-prefixed PNG frames on its stdin for one JSON line of hands each.
//!
//! ```rust,no_run
//! use landmarks::{LandmarkExtractor, ProcessDetector};
//! use std::path::Path;
//!
//! let detector = ProcessDetector::new("hand-landmarks")?.with_args(["--max-hands", "2"]);
//! let dataset = LandmarkExtractor::new(detector).extract_dataset(Path::new("frames"))?;
//! dataset.to_json_file("keypoints.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod detectors;
pub mod error;
pub mod extractor;
pub mod overlay;
pub mod traits;

pub use detectors::{DetectedHand, NullDetector, ProcessDetector};
pub use error::{LandmarkError, Result};
pub use extractor::{LandmarkExtractor, DEFAULT_MAX_HANDS};
pub use overlay::{annotate, draw_landmarks, OverlayStyle, HAND_CONNECTIONS};
pub use traits::HandDetector;
