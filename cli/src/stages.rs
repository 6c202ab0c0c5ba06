//! Stage runners.
//!
//! Each stage reads its input from disk and writes its output back to disk
//! under [`PathsConfig`](crate::PathsConfig), so stages run independently.

use std::path::PathBuf;

use framing::{driver::Driver, FrameExtractor, FrameReport};
use keypoints::{KeypointsDataset, NormalizedDataset, WriteReport};
use landmarks::{HandDetector, LandmarkExtractor, NullDetector};
use preprocess::normalize_dataset;
use tracing::{info, warn};

use crate::{stage_rng, PipelineConfig, PrepError, Result, Stage};

/// Files produced by one stage run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: Stage,
    pub written: usize,
    pub failed: Vec<PathBuf>,
    /// Inputs that could not be decoded at all
    pub skipped: Vec<PathBuf>,
}

impl StageSummary {
    fn from_writes(stage: Stage, report: WriteReport) -> Self {
        Self {
            stage,
            written: report.written.len(),
            failed: report.failed,
            skipped: Vec::new(),
        }
    }

    fn from_frames(report: FrameReport) -> Self {
        Self {
            stage: Stage::ExtractFrames,
            written: report.frames_written,
            failed: report.failed_writes,
            skipped: report.skipped,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write `dataset` as one document and as a per-label tree.
///
/// A failed document write is recorded like a failed leaf; the tree is still written.
fn persist(dataset: &KeypointsDataset, document: PathBuf, tree: PathBuf) -> WriteReport {
    let outcome = dataset.to_json_file(&document);
    let mut report = WriteReport::default();
    report.record(document, outcome);
    report.merge(dataset.write_tree(tree));
    report
}

/// Frame extraction through an arbitrary decoding backend.
pub fn extract_frames_with<D: Driver>(config: &PipelineConfig, driver: D) -> Result<StageSummary> {
    let videos = config.paths.videos.as_ref().ok_or(PrepError::MissingPath("videos"))?;

    let mut extractor = FrameExtractor::new(driver).with_config(config.frames.extract_config());
    if config.frames.annotate {
        match &config.landmarks.detector {
            Some(detector) => extractor = extractor.with_detector(detector.build()?),
            None => warn!("No detector configured, frames are written without landmark overlay"),
        }
    }

    let report = extractor.extract_dataset(videos, &config.paths.frames_dir())?;
    Ok(StageSummary::from_frames(report))
}

pub fn extract_frames(config: &PipelineConfig) -> Result<StageSummary> {
    let driver = match &config.frames.ffmpeg_path {
        Some(path) => framing::driver::ffmpeg::FFmpegDriver::with_path(path.as_str())?,
        None => framing::driver::ffmpeg::FFmpegDriver::new()?,
    };
    extract_frames_with(config, driver)
}

/// Landmark extraction with an arbitrary detector.
pub fn extract_landmarks_with<D: HandDetector>(config: &PipelineConfig, detector: D) -> Result<StageSummary> {
    let dataset = LandmarkExtractor::new(detector)
        .with_max_hands(config.landmarks.max_hands)
        .extract_dataset(&config.paths.frames_dir())?;

    let report = persist(&dataset, config.paths.keypoints_file(), config.paths.keypoints_dir());
    Ok(StageSummary::from_writes(Stage::ExtractLandmarks, report))
}

pub fn extract_landmarks(config: &PipelineConfig) -> Result<StageSummary> {
    match &config.landmarks.detector {
        Some(detector) => extract_landmarks_with(config, detector.build()?),
        None => {
            warn!("No detector configured, every frame is recorded as undetected");
            extract_landmarks_with(config, NullDetector)
        }
    }
}

pub fn normalize(config: &PipelineConfig) -> Result<StageSummary> {
    let dataset = KeypointsDataset::from_json_file(config.paths.keypoints_file())?;
    let normalized = normalize_dataset(&dataset);

    let report = persist(&normalized, config.paths.normalized_file(), config.paths.normalized_dir());
    Ok(StageSummary::from_writes(Stage::Normalize, report))
}

pub fn augment(config: &PipelineConfig) -> Result<StageSummary> {
    let augmenter = config.augment.augmenter()?;
    let dataset = NormalizedDataset::from_json_file(config.paths.normalized_file())?;

    let mut rng = stage_rng(config.augment.seed);
    let augmented = augmenter.augment_dataset(&dataset, &mut rng)?;
    let report = augmented.write_tree(config.paths.augmented_dir());
    Ok(StageSummary::from_writes(Stage::Augment, report))
}

pub fn split(config: &PipelineConfig) -> Result<StageSummary> {
    let splitter = config.split.splitter()?;
    let sampler = config.split.sampler()?;
    let dataset = NormalizedDataset::from_json_file(config.paths.normalized_file())?;

    let mut rng = stage_rng(config.split.seed);
    let split = splitter.split_dataset(&dataset, &sampler, &mut rng)?;
    let report = split.write_tree(config.paths.split_dir());
    Ok(StageSummary::from_writes(Stage::Split, report))
}

pub fn run_stage(config: &PipelineConfig, stage: Stage) -> Result<StageSummary> {
    info!("Running stage {}", stage);
    let summary = match stage {
        Stage::ExtractFrames => extract_frames(config)?,
        Stage::ExtractLandmarks => extract_landmarks(config)?,
        Stage::Normalize => normalize(config)?,
        Stage::Augment => augment(config)?,
        Stage::Split => split(config)?,
    };

    if summary.is_complete() {
        info!("Stage {} wrote {} file(s)", stage, summary.written);
    } else {
        warn!(
            "Stage {} wrote {} file(s), {} failed",
            stage,
            summary.written,
            summary.failed.len()
        );
    }
    Ok(summary)
}

/// Run `stages` in pipeline order, each at most once.
pub fn run(config: &PipelineConfig, stages: &[Stage]) -> Result<Vec<StageSummary>> {
    config.validate()?;

    let mut ordered = stages.to_vec();
    ordered.sort();
    ordered.dedup();

    ordered
        .into_iter()
        .map(|stage| run_stage(config, stage))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathsConfig;
    use framing::{driver::DriverError, sources::VideoFile};
    use image::{Rgb, RgbImage};
    use keypoints::{AugmentedDataset, FrameKeypoints, SplitDataset};
    use std::path::Path;

    /// Turns any file into `frames` solid frames.
    struct SolidDriver {
        frames: usize,
    }

    impl Driver for SolidDriver {
        type Source = VideoFile;
        type Frames = std::vec::IntoIter<std::result::Result<RgbImage, DriverError>>;

        fn source(&self, path: &Path) -> VideoFile {
            VideoFile::new(path)
        }

        fn decode(&self, _source: &VideoFile, max_frames: usize) -> std::result::Result<Self::Frames, DriverError> {
            let frame = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
            let frames: Vec<_> = (0..self.frames.min(max_frames)).map(|_| Ok(frame.clone())).collect();
            Ok(frames.into_iter())
        }
    }

    fn config_in(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths = PathsConfig {
            videos: Some(root.join("videos")),
            output: root.join("out"),
        };
        config.frames.max_frames = 6;
        config.frames.frame_extension = "png".to_string();
        config.augment.variants = 3;
        config.augment.seed = Some(1);
        config.split.seed = Some(2);
        config
    }

    #[test]
    fn test_frames_through_split_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        for (category, gesture) in [("Places", "school"), ("Pronouns", "he")] {
            let gesture_dir = config.paths.videos.as_ref().unwrap().join(category).join(gesture);
            std::fs::create_dir_all(&gesture_dir).unwrap();
            std::fs::write(gesture_dir.join("clip.mp4"), b"video").unwrap();
        }

        let frames = extract_frames_with(&config, SolidDriver { frames: 4 }).unwrap();
        assert_eq!(frames.written, 12);
        assert!(config.paths.frames_dir().join("Places/school/clip_frame_5.png").is_file());

        let landmarks = extract_landmarks_with(&config, NullDetector).unwrap();
        assert_eq!(landmarks.written, 3, "document plus two leaves");
        let keypoints = KeypointsDataset::from_json_file(config.paths.keypoints_file()).unwrap();
        let video = keypoints.get("Places", "school").unwrap();
        assert_eq!(video.len(), 6);
        assert!(video.frames.iter().all(|f| *f == FrameKeypoints::undetected()));

        let normalized = run_stage(&config, Stage::Normalize).unwrap();
        assert_eq!(normalized.written, 3);
        assert!(config.paths.normalized_dir().join("Pronouns/he/keypoints.json").is_file());

        run(&config, &[Stage::Split, Stage::Augment, Stage::Split]).unwrap();

        let augmented = AugmentedDataset::read_tree(config.paths.augmented_dir()).unwrap();
        assert_eq!(augmented.variant_count(), 6);

        let split = SplitDataset::read_tree(config.paths.split_dir()).unwrap();
        let train = split.train.get("Places", "school").unwrap();
        let test = split.test.get("Places", "school").unwrap();
        assert_eq!((train.len(), test.len()), (4, 2));
    }

    #[test]
    fn test_seeded_stages_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut dataset = NormalizedDataset::new();
        dataset.insert("Places", "school", keypoints::VideoKeypoints::new(vec![FrameKeypoints::undetected(); 5]));
        dataset.to_json_file(config.paths.normalized_file()).unwrap();

        split(&config).unwrap();
        let first = SplitDataset::read_tree(config.paths.split_dir()).unwrap();
        split(&config).unwrap();
        let second = SplitDataset::read_tree(config.paths.split_dir()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unwritable_document_does_not_stop_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut dataset = KeypointsDataset::new();
        dataset.insert("Places", "school", keypoints::VideoKeypoints::new(vec![FrameKeypoints::undetected(); 2]));
        dataset.insert("Pronouns", "he", keypoints::VideoKeypoints::new(vec![FrameKeypoints::undetected(); 2]));
        dataset.to_json_file(config.paths.keypoints_file()).unwrap();
        // A directory where the whole-dataset document should go
        std::fs::create_dir_all(config.paths.normalized_file()).unwrap();

        let summary = normalize(&config).unwrap();
        assert_eq!(summary.failed, vec![config.paths.normalized_file()]);
        assert_eq!(summary.written, 2);
        assert!(config.paths.normalized_dir().join("Places/school/keypoints.json").is_file());
        assert!(config.paths.normalized_dir().join("Pronouns/he/keypoints.json").is_file());
    }

    #[test]
    fn test_missing_inputs_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());

        assert!(matches!(
            normalize(&config),
            Err(PrepError::Keypoints(keypoints::KeypointsError::MissingInput { .. }))
        ));

        config.paths.videos = None;
        assert!(matches!(
            extract_frames_with(&config, SolidDriver { frames: 1 }),
            Err(PrepError::MissingPath("videos"))
        ));
    }
}
