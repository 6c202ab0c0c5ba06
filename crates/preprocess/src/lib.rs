//! Keypoint preprocessing stages.
//!
//! - [`normalize`]: per-video min-max rescaling into `[0, 1]`
//! - [`augment`]: frame dropping plus uniform jitter to synthesize variants
//! - [`sample`]: per-frame random point subsampling
//! - [`split`]: shuffled train/test partitioning of sampled frames
//!
//! Every randomized operation takes a caller-supplied [`rand::Rng`], so
//! results are reproducible from a seeded generator.

pub mod augment;
pub mod error;
pub mod normalize;
pub mod sample;
pub mod split;

pub use augment::Augmenter;
pub use error::{PreprocessError, Result};
pub use normalize::{axis_bounds, normalize_dataset, normalize_video};
pub use sample::Sampler;
pub use split::Splitter;
