use keypoints::{NormalizedDataset, SplitDataset};
use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info};

use crate::{
    error::{check_unit_interval, Result},
    sample::Sampler,
};

/// Shuffled train/test partitioning.
#[derive(Debug, Clone, PartialEq)]
pub struct Splitter {
    /// Share of items assigned to the train side, rounded down
    pub train_ratio: f64,
}

impl Default for Splitter {
    fn default() -> Self {
        Self { train_ratio: 0.8 }
    }
}

impl Splitter {
    pub fn new(train_ratio: f64) -> Result<Self> {
        let splitter = Self { train_ratio };
        splitter.validate()?;
        Ok(splitter)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit_interval("train_ratio", self.train_ratio)
    }

    /// Index separating train from test for `len` items.
    pub fn split_index(&self, len: usize) -> usize {
        ((len as f64 * self.train_ratio).floor() as usize).min(len)
    }

    /// Shuffle `items`, then cut at `floor(len * train_ratio)`: prefix is train, suffix is test.
    pub fn split<T, R: Rng + ?Sized>(&self, mut items: Vec<T>, rng: &mut R) -> (Vec<T>, Vec<T>) {
        items.shuffle(rng);
        let test = items.split_off(self.split_index(items.len()));
        (items, test)
    }

    /// Subsample then split every label of a normalized dataset.
    ///
    /// Each label's video is flattened to untagged frames, every frame is
    /// subsampled by `sampler`, and the frames are partitioned train/test.
    pub fn split_dataset<R: Rng + ?Sized>(
        &self,
        dataset: &NormalizedDataset,
        sampler: &Sampler,
        rng: &mut R,
    ) -> Result<SplitDataset> {
        self.validate()?;
        sampler.validate()?;

        let mut split = SplitDataset::new();
        for (category, label, video) in dataset.iter() {
            let sampled = sampler.sample_sequence(&video.to_point_sequence(), rng);
            let (train, test) = self.split(sampled, rng);
            debug!("{}/{}: {} train, {} test", category, label, train.len(), test.len());

            split.train.insert(category, label, train);
            split.test.insert(category, label, test);
        }

        info!(
            "Split {} label(s) with train ratio {}",
            dataset.label_count(),
            self.train_ratio
        );
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypoints::{FrameKeypoints, VideoKeypoints, LANDMARK_COUNT};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_partition_sizes_and_membership() {
        let splitter = Splitter::default();
        for len in [0usize, 1, 4, 5, 10, 37] {
            let mut rng = ChaCha8Rng::seed_from_u64(len as u64);
            let items: Vec<usize> = (0..len).collect();
            let (train, test) = splitter.split(items.clone(), &mut rng);

            assert_eq!(train.len() + test.len(), len);
            assert_eq!(train.len(), (len as f64 * 0.8).floor() as usize);

            let mut union: Vec<_> = train.iter().chain(test.iter()).copied().collect();
            union.sort_unstable();
            assert_eq!(union, items, "union equals the input");
            assert!(train.iter().all(|t| !test.contains(t)), "sides are disjoint");
        }
    }

    #[test]
    fn test_shuffle_depends_on_seed() {
        let splitter = Splitter::default();
        let items: Vec<u32> = (0..50).collect();
        let a = splitter.split(items.clone(), &mut ChaCha8Rng::seed_from_u64(1));
        let b = splitter.split(items.clone(), &mut ChaCha8Rng::seed_from_u64(1));
        let c = splitter.split(items, &mut ChaCha8Rng::seed_from_u64(2));
        assert_eq!(a, b);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(Splitter::new(1.1).is_err());
        assert!(Splitter::new(-0.5).is_err());

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (train, test) = Splitter::new(1.0).unwrap().split(vec![1, 2, 3], &mut rng);
        assert_eq!((train.len(), test.len()), (3, 0));
        let (train, test) = Splitter::new(0.0).unwrap().split(vec![1, 2, 3], &mut rng);
        assert_eq!((train.len(), test.len()), (0, 3));
    }

    #[test]
    fn test_split_dataset_samples_then_partitions_frames() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut dataset = NormalizedDataset::new();
        dataset.insert("Places", "school", VideoKeypoints::new(vec![FrameKeypoints::undetected(); 10]));
        dataset.insert("Places", "house", VideoKeypoints::new(vec![FrameKeypoints::undetected(); 3]));

        let split = Splitter::default()
            .split_dataset(&dataset, &Sampler::default(), &mut rng)
            .unwrap();

        let school_train = split.train.get("Places", "school").unwrap();
        let school_test = split.test.get("Places", "school").unwrap();
        assert_eq!((school_train.len(), school_test.len()), (8, 2));
        assert_eq!(split.train.get("Places", "house").unwrap().len(), 2);
        assert_eq!(split.test.get("Places", "house").unwrap().len(), 1);

        // Two 21-point hands per frame, 70% of 42 points kept.
        let kept = (2 * LANDMARK_COUNT) * 7 / 10;
        assert!(school_train.iter().chain(school_test).all(|frame| frame.len() == kept));
    }
}
