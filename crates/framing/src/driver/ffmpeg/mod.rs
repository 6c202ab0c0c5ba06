use crate::driver::{Driver, DriverError};
use crate::sources::{Source, VideoFile};
use image::RgbImage;
use keypoints::utils;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

/// FFmpeg driver implementation
///
/// Decodes by asking `ffmpeg` to dump the leading frames as PNG files into a
/// scratch directory, then loads them back one at a time through [`FrameFiles`].
pub struct FFmpegDriver {
    ffmpeg_path: String,
}

impl FFmpegDriver {
    pub fn new() -> Result<Self, DriverError> {
        // Check if ffmpeg is available in PATH
        let ffmpeg_path = Self::find_ffmpeg_executable()?;

        Ok(Self { ffmpeg_path })
    }

    pub fn with_path(ffmpeg_path: impl Into<String>) -> Result<Self, DriverError> {
        let path = ffmpeg_path.into();

        // Verify the provided path is valid
        if !Path::new(&path).exists() {
            return Err(DriverError::Initialization(format!("FFmpeg executable not found at: {}", path)));
        }

        Ok(Self { ffmpeg_path: path })
    }

    fn find_ffmpeg_executable() -> Result<String, DriverError> {
        // Try to find ffmpeg in PATH
        if let Ok(output) = Command::new("which").arg("ffmpeg").output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(path);
                }
            }
        }

        // Try common locations
        let common_paths = [
            "/usr/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/opt/homebrew/bin/ffmpeg",
        ];

        for path in &common_paths {
            if Path::new(path).exists() {
                return Ok(path.to_string());
            }
        }

        Err(DriverError::Initialization(
            "FFmpeg executable not found. Please install FFmpeg or specify the path.".to_string(),
        ))
    }

    fn build_decode_command(&self, input: &Path, output_dir: &Path, max_frames: usize) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-nostdin")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .arg("-frames:v")
            .arg(max_frames.to_string())
            .args(["-vsync", "0"])
            .arg("-y")
            .arg(output_dir.join("frame_%05d.png"));
        cmd
    }

    fn execute_command(&self, mut cmd: Command) -> Result<(), DriverError> {
        debug!("Executing FFmpeg command: {:?}", cmd);

        // Clear DYLD_LIBRARY_PATH to avoid conflicts with framework libraries
        cmd.env_remove("DYLD_LIBRARY_PATH");

        let output = cmd
            .output()
            .map_err(|e| DriverError::Execution(format!("Failed to execute FFmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DriverError::Decode(format!("FFmpeg execution failed: {}", stderr.trim())));
        }

        Ok(())
    }
}

/// Frame images dumped into a scratch directory, loaded lazily in order.
///
/// The scratch directory is removed once the iterator is dropped.
pub struct FrameFiles {
    paths: std::vec::IntoIter<PathBuf>,
    _scratch: Option<TempDir>,
}

impl FrameFiles {
    fn empty() -> Self {
        Self {
            paths: Vec::new().into_iter(),
            _scratch: None,
        }
    }
}

impl Iterator for FrameFiles {
    type Item = Result<RgbImage, DriverError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(image::open(path).map(|frame| frame.to_rgb8()).map_err(DriverError::from))
    }
}

impl Driver for FFmpegDriver {
    type Source = VideoFile;
    type Frames = FrameFiles;

    fn source(&self, path: &Path) -> Self::Source {
        VideoFile::new(path)
    }

    fn decode(&self, source: &Self::Source, max_frames: usize) -> Result<FrameFiles, DriverError> {
        source.validate()?;
        if max_frames == 0 {
            return Ok(FrameFiles::empty());
        }

        let scratch = tempfile::tempdir()?;
        let cmd = self.build_decode_command(&source.path, scratch.path(), max_frames);
        self.execute_command(cmd)?;

        // frame_%05d keeps lexical and temporal order aligned
        let paths: Vec<PathBuf> = utils::files(scratch.path())
            .map_err(|e| DriverError::Decode(e.to_string()))?
            .into_iter()
            .take(max_frames)
            .map(|(_, path)| path)
            .collect();
        debug!("{} produced {} frame(s)", source.description(), paths.len());

        Ok(FrameFiles {
            paths: paths.into_iter(),
            _scratch: Some(scratch),
        })
    }
}
