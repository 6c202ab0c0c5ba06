use std::fmt::Debug;
use std::path::PathBuf;

use image::RgbImage;

use crate::driver::DriverError;

/// Generic trait for data sources (input videos)
/// Different backends can implement this for their specific source types
pub trait Source: Debug + Clone {
    /// Type-specific validation that the source is accessible
    fn validate(&self) -> Result<(), DriverError>;

    /// Get a human-readable description of this source
    fn description(&self) -> String;

    /// Base name given to everything derived from this source
    fn stem(&self) -> String;
}

/// Generic trait for data sinks (output destinations)
pub trait Sink: Debug + Clone {
    /// Type-specific validation that the sink can be written to
    fn validate(&self) -> Result<(), DriverError>;

    /// Get a human-readable description of this sink
    fn description(&self) -> String;
}

/// A video file on disk
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub path: PathBuf,
}

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for VideoFile {
    fn validate(&self) -> Result<(), DriverError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(DriverError::MissingInput(self.path.display().to_string()))
        }
    }

    fn description(&self) -> String {
        format!("File: {}", self.path.display())
    }

    /// File name without extension
    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }
}

/// A directory receiving `<stem>_frame_<index>.<extension>` images
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    pub path: PathBuf,
    pub stem: String,
    pub extension: String,
}

impl FrameDirectory {
    pub fn new(path: impl Into<PathBuf>, stem: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stem: stem.into(),
            extension: extension.into(),
        }
    }

    pub fn frame_name(&self, index: usize) -> String {
        format!("{}_frame_{}.{}", self.stem, index, self.extension)
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.path.join(self.frame_name(index))
    }

    /// Encode `frame` under `index`, overwriting any existing file.
    /// The format follows the extension.
    pub fn write(&self, index: usize, frame: &RgbImage) -> Result<PathBuf, DriverError> {
        let path = self.frame_path(index);
        frame.save(&path)?;
        Ok(path)
    }
}

impl Sink for FrameDirectory {
    fn validate(&self) -> Result<(), DriverError> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| DriverError::Execution(format!("Cannot create output directory: {}", e)))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "Directory: {} (pattern: {}_frame_<n>.{})",
            self.path.display(),
            self.stem,
            self.extension
        )
    }
}
