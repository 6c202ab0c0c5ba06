use std::collections::BTreeMap;

use keypoints::{AugmentedDataset, NormalizedDataset, PointFrame, PointSequence};
use rand::Rng;
use tracing::{debug, info};

use crate::error::{check_unit_interval, PreprocessError, Result};

/// Synthetic variant generation by frame dropping and coordinate jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct Augmenter {
    /// Variants produced per label
    pub variants: usize,
    /// Independent probability of keeping each frame
    pub keep_probability: f64,
    /// Half-width of the uniform jitter added to every coordinate
    pub noise: f64,
}

impl Default for Augmenter {
    fn default() -> Self {
        Self {
            variants: 20,
            keep_probability: 0.7,
            noise: 0.05,
        }
    }
}

impl Augmenter {
    pub fn new(variants: usize, keep_probability: f64, noise: f64) -> Result<Self> {
        let augmenter = Self {
            variants,
            keep_probability,
            noise,
        };
        augmenter.validate()?;
        Ok(augmenter)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit_interval("keep_probability", self.keep_probability)?;
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(PreprocessError::InvalidParameter {
                name: "noise",
                value: self.noise,
                expected: "a finite, non-negative value",
            });
        }
        Ok(())
    }

    fn jitter<R: Rng + ?Sized>(&self, frame: &PointFrame, rng: &mut R) -> PointFrame {
        frame
            .iter()
            .map(|point| {
                let mut noisy = *point;
                for coordinate in noisy.iter_mut() {
                    *coordinate += rng.gen_range(-self.noise..=self.noise);
                }
                noisy
            })
            .collect()
    }

    /// One variant: each frame kept with `keep_probability`, jittered, in order.
    ///
    /// If every frame is dropped the unmodified source is returned instead.
    /// Jittered values are not clamped and may leave `[0, 1]`.
    pub fn augment_sequence<R: Rng + ?Sized>(&self, sequence: &PointSequence, rng: &mut R) -> PointSequence {
        let mut variant = Vec::new();
        for frame in sequence {
            if rng.gen_bool(self.keep_probability) {
                variant.push(self.jitter(frame, rng));
            }
        }

        if variant.is_empty() {
            debug!("All frames dropped, falling back to the source sequence");
            return sequence.clone();
        }
        variant
    }

    /// `variants` independent augmentations of one sequence.
    pub fn augment_label<R: Rng + ?Sized>(&self, sequence: &PointSequence, rng: &mut R) -> Result<Vec<PointSequence>> {
        self.validate()?;
        Ok((0..self.variants)
            .map(|_| self.augment_sequence(sequence, rng))
            .collect())
    }

    /// Augment every label of a label -> sequence mapping.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        sequences: &BTreeMap<String, PointSequence>,
        rng: &mut R,
    ) -> Result<AugmentedDataset> {
        let mut augmented = AugmentedDataset::new();
        for (label, sequence) in sequences {
            let variants = self.augment_label(sequence, rng)?;
            debug!("{}: {} variants", label, variants.len());
            augmented.labels.insert(label.clone(), variants);
        }
        Ok(augmented)
    }

    /// Augment a normalized dataset keyed by label, handedness dropped.
    ///
    /// Labels must be unique across categories.
    pub fn augment_dataset<R: Rng + ?Sized>(
        &self,
        dataset: &NormalizedDataset,
        rng: &mut R,
    ) -> Result<AugmentedDataset> {
        let sequences: BTreeMap<String, PointSequence> = dataset
            .by_label()?
            .into_iter()
            .map(|(label, video)| (label, video.to_point_sequence()))
            .collect();

        let augmented = self.augment(&sequences, rng)?;
        info!(
            "Augmented {} label(s) into {} variant(s)",
            augmented.labels.len(),
            augmented.variant_count()
        );
        Ok(augmented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypoints::{FrameKeypoints, KeypointsError, VideoKeypoints};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sequence(frames: usize) -> PointSequence {
        (0..frames)
            .map(|f| (0..5).map(|p| [f as f64 * 0.1, p as f64 * 0.2, 0.5]).collect())
            .collect()
    }

    #[test]
    fn test_zero_keep_probability_falls_back_to_source() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let augmenter = Augmenter::new(20, 0.0, 0.05).unwrap();
        let source = sequence(8);

        let variants = augmenter.augment_label(&source, &mut rng).unwrap();
        assert_eq!(variants.len(), 20);
        assert!(variants.iter().all(|v| *v == source));
    }

    #[test]
    fn test_full_keep_without_noise_is_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let augmenter = Augmenter::new(3, 1.0, 0.0).unwrap();
        let source = sequence(6);
        for variant in augmenter.augment_label(&source, &mut rng).unwrap() {
            assert_eq!(variant, source);
        }
    }

    #[test]
    fn test_jitter_is_bounded_per_coordinate() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let augmenter = Augmenter::new(5, 1.0, 0.05).unwrap();
        let source = sequence(10);

        for variant in augmenter.augment_label(&source, &mut rng).unwrap() {
            assert_eq!(variant.len(), source.len());
            for (frame, original) in variant.iter().zip(&source) {
                assert_eq!(frame.len(), original.len());
                for (point, reference) in frame.iter().zip(original) {
                    for axis in 0..3 {
                        assert!((point[axis] - reference[axis]).abs() <= 0.05 + 1e-12);
                    }
                }
            }
            assert_ne!(variant, source);
        }
    }

    #[test]
    fn test_dropped_frames_keep_order_and_never_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let augmenter = Augmenter::new(50, 0.5, 0.0).unwrap();
        let source = sequence(12);

        let variants = augmenter.augment_label(&source, &mut rng).unwrap();
        assert!(variants.iter().all(|v| !v.is_empty() && v.len() <= source.len()));
        assert!(variants.iter().any(|v| v.len() < source.len()));

        // Without noise, kept frames are exact copies in source order.
        for variant in &variants {
            let mut cursor = source.iter();
            for frame in variant {
                assert!(cursor.any(|original| original == frame));
            }
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let augmenter = Augmenter::default();
        let source = sequence(10);
        let a = augmenter.augment_label(&source, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let b = augmenter.augment_label(&source, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Augmenter::new(1, 1.5, 0.05).is_err());
        assert!(Augmenter::new(1, -0.1, 0.05).is_err());
        assert!(Augmenter::new(1, 0.7, -0.01).is_err());
        assert!(Augmenter::new(1, 0.7, f64::NAN).is_err());
    }

    #[test]
    fn test_augment_dataset_by_label() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut dataset = NormalizedDataset::new();
        dataset.insert("Adjectives", "clean", VideoKeypoints::new(vec![FrameKeypoints::undetected(); 4]));
        dataset.insert("Pronouns", "he", VideoKeypoints::new(vec![FrameKeypoints::undetected(); 2]));

        let augmenter = Augmenter::new(3, 0.7, 0.05).unwrap();
        let augmented = augmenter.augment_dataset(&dataset, &mut rng).unwrap();

        assert_eq!(augmented.labels.len(), 2);
        assert_eq!(augmented.variant_count(), 6);
        // Both zeroed hands flatten into one 42-point frame.
        assert!(augmented.labels["clean"].iter().flatten().all(|frame| frame.len() == 42));

        dataset.insert("Places", "clean", VideoKeypoints::default());
        assert!(matches!(
            augmenter.augment_dataset(&dataset, &mut rng),
            Err(PreprocessError::Keypoints(KeypointsError::DuplicateLabel { .. }))
        ));
    }
}
