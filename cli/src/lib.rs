pub mod stages;

use std::fs;
use std::path::{Path, PathBuf};

use framing::ExtractConfig;
use landmarks::ProcessDetector;
use preprocess::{Augmenter, Sampler, Splitter};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;

pub use stages::{run, run_stage, StageSummary};

#[derive(Error, Debug)]
pub enum PrepError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Missing '{0}' path: set it in the configuration or on the command line")]
    MissingPath(&'static str),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
    #[error(transparent)]
    Keypoints(#[from] keypoints::KeypointsError),
    #[error(transparent)]
    Frames(#[from] framing::ExtractError),
    #[error(transparent)]
    Driver(#[from] framing::driver::DriverError),
    #[error(transparent)]
    Landmarks(#[from] landmarks::LandmarkError),
    #[error(transparent)]
    Preprocess(#[from] preprocess::PreprocessError),
}

pub type Result<T> = std::result::Result<T, PrepError>;

/// Pipeline stages, declared in execution order.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, PartialOrd, Ord, Hash
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Decode videos into padded frame sequences
    ExtractFrames,
    /// Detect hand landmarks on every frame
    ExtractLandmarks,
    /// Min-max rescale every video into [0, 1]
    Normalize,
    /// Generate jittered, frame-dropped variants per label
    Augment,
    /// Subsample points and partition frames into train/test
    Split,
}

impl Stage {
    /// Get a list of all stage names
    pub fn names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }
}

/// Where every stage reads and writes.
///
/// Stages communicate only through these locations, so any stage can be
/// rerun on its own once its input exists.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// `<category>/<gesture>/<video>` tree read by frame extraction
    pub videos: Option<PathBuf>,
    /// Root of every stage output
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            videos: None,
            output: PathBuf::from("output"),
        }
    }
}

impl PathsConfig {
    pub fn frames_dir(&self) -> PathBuf {
        self.output.join("frames")
    }

    /// Whole-dataset keypoints document
    pub fn keypoints_file(&self) -> PathBuf {
        self.output.join("keypoints.json")
    }

    pub fn keypoints_dir(&self) -> PathBuf {
        self.output.join("keypoints")
    }

    /// Whole-dataset normalized document
    pub fn normalized_file(&self) -> PathBuf {
        self.output.join("normalized_keypoints.json")
    }

    pub fn normalized_dir(&self) -> PathBuf {
        self.output.join("normalized")
    }

    pub fn augmented_dir(&self) -> PathBuf {
        self.output.join("augmented")
    }

    pub fn split_dir(&self) -> PathBuf {
        self.output.join("split")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct FramesConfig {
    /// Exact number of frames written per video
    #[schemars(range(min = 1))]
    pub max_frames: usize,
    /// Draw detected landmarks onto the written frames
    pub annotate: bool,
    /// Image format of written frames
    pub frame_extension: String,
    /// Explicit ffmpeg executable, otherwise searched on PATH
    pub ffmpeg_path: Option<String>,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            max_frames: framing::DEFAULT_MAX_FRAMES,
            annotate: true,
            frame_extension: "jpeg".to_string(),
            ffmpeg_path: None,
        }
    }
}

impl FramesConfig {
    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            max_frames: self.max_frames,
            annotate: self.annotate,
            extension: self.frame_extension.clone(),
            ..ExtractConfig::default()
        }
    }
}

/// External landmark program, see [`landmarks::ProcessDetector`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DetectorConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl DetectorConfig {
    pub fn build(&self) -> landmarks::Result<ProcessDetector> {
        Ok(ProcessDetector::new(self.program.as_str())?.with_args(self.args.iter().cloned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct LandmarksConfig {
    /// Without a detector every frame is recorded as undetected
    pub detector: Option<DetectorConfig>,
    #[schemars(range(min = 1))]
    pub max_hands: usize,
}

impl Default for LandmarksConfig {
    fn default() -> Self {
        Self {
            detector: None,
            max_hands: landmarks::DEFAULT_MAX_HANDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AugmentConfig {
    pub variants: usize,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub keep_probability: f64,
    #[schemars(range(min = 0.0))]
    pub noise: f64,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        let augmenter = Augmenter::default();
        Self {
            variants: augmenter.variants,
            keep_probability: augmenter.keep_probability,
            noise: augmenter.noise,
            seed: None,
        }
    }
}

impl AugmentConfig {
    pub fn augmenter(&self) -> preprocess::Result<Augmenter> {
        Augmenter::new(self.variants, self.keep_probability, self.noise)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    #[schemars(range(min = 0.0, max = 1.0))]
    pub train_ratio: f64,
    /// Share of each frame's points kept before splitting
    #[schemars(range(min = 0.0, max = 1.0))]
    pub sample_fraction: f64,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: Splitter::default().train_ratio,
            sample_fraction: Sampler::default().fraction,
            seed: None,
        }
    }
}

impl SplitConfig {
    pub fn splitter(&self) -> preprocess::Result<Splitter> {
        Splitter::new(self.train_ratio)
    }

    pub fn sampler(&self) -> preprocess::Result<Sampler> {
        Sampler::new(self.sample_fraction)
    }
}

/// Random source for one stage run: seeded when `seed` is set, from OS entropy otherwise.
pub fn stage_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Full pipeline configuration; every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub frames: FramesConfig,
    pub landmarks: LandmarksConfig,
    pub augment: AugmentConfig,
    pub split: SplitConfig,
}

impl PipelineConfig {
    /// Get the JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(PrepError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Reject out-of-range parameters before any stage touches the disk.
    pub fn validate(&self) -> Result<()> {
        self.augment.augmenter()?;
        self.split.splitter()?;
        self.split.sampler()?;
        Ok(())
    }
}
