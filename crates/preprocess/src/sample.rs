use keypoints::{PointFrame, PointSequence, ORIGIN};
use rand::{seq::index, Rng};

use crate::error::{PreprocessError, Result};

/// Per-frame random point subsampling.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampler {
    /// Share of each frame's points kept, rounded down
    pub fraction: f64,
}

impl Default for Sampler {
    fn default() -> Self {
        Self { fraction: 0.7 }
    }
}

impl Sampler {
    pub fn new(fraction: f64) -> Result<Self> {
        let sampler = Self { fraction };
        sampler.validate()?;
        Ok(sampler)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fraction > 0.0 && self.fraction <= 1.0 {
            Ok(())
        } else {
            Err(PreprocessError::InvalidParameter {
                name: "sample_fraction",
                value: self.fraction,
                expected: "a value in (0, 1]",
            })
        }
    }

    /// Number of points kept from a frame of `len` points.
    pub fn kept(&self, len: usize) -> usize {
        (len as f64 * self.fraction).floor() as usize
    }

    /// Draw `floor(fraction * len)` distinct points uniformly at random.
    ///
    /// Empty frames, and frames too small to keep any point, become `[ORIGIN]`.
    pub fn sample_frame<R: Rng + ?Sized>(&self, frame: &PointFrame, rng: &mut R) -> PointFrame {
        let amount = self.kept(frame.len());
        if amount == 0 {
            return vec![ORIGIN];
        }
        index::sample(rng, frame.len(), amount)
            .into_iter()
            .map(|i| frame[i])
            .collect()
    }

    /// Sample every frame independently; the frame count is preserved.
    pub fn sample_sequence<R: Rng + ?Sized>(&self, sequence: &PointSequence, rng: &mut R) -> PointSequence {
        sequence
            .iter()
            .map(|frame| self.sample_frame(frame, rng))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn distinct_frame(len: usize) -> PointFrame {
        (0..len).map(|i| [i as f64, i as f64 + 0.5, -(i as f64)]).collect()
    }

    #[test]
    fn test_keeps_seventy_percent_without_duplicates() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sampler = Sampler::default();

        for (len, expected) in [(21, 14), (42, 29), (10, 7), (2, 1)] {
            let frame = distinct_frame(len);
            let sampled = sampler.sample_frame(&frame, &mut rng);
            assert_eq!(sampled.len(), expected, "frame of {} points", len);

            let unique: HashSet<_> = sampled.iter().map(|p| p[0] as i64).collect();
            assert_eq!(unique.len(), sampled.len());
            assert!(sampled.iter().all(|p| frame.contains(p)));
        }
    }

    #[test]
    fn test_empty_frame_becomes_origin() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sampled = Sampler::default().sample_frame(&Vec::new(), &mut rng);
        assert_eq!(sampled, vec![[0.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_single_point_frame_becomes_origin() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sampled = Sampler::default().sample_frame(&vec![[0.3, 0.3, 0.3]], &mut rng);
        assert_eq!(sampled, vec![ORIGIN]);
    }

    #[test]
    fn test_sequence_length_preserved() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let sequence = vec![distinct_frame(21), Vec::new(), distinct_frame(42)];
        let sampled = Sampler::default().sample_sequence(&sequence, &mut rng);

        let lengths: Vec<_> = sampled.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![14, 1, 29]);
    }

    #[test]
    fn test_full_fraction_is_a_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let frame = distinct_frame(21);
        let mut sampled = Sampler::new(1.0).unwrap().sample_frame(&frame, &mut rng);
        sampled.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert_eq!(sampled, frame);
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(Sampler::new(0.0).is_err());
        assert!(Sampler::new(1.2).is_err());
        assert!(Sampler::new(f64::NAN).is_err());
    }
}
