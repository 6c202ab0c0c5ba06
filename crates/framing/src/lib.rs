//! Frame extraction: decode gesture videos into fixed-length runs of still frames.
//!
//! Input is laid out as `<root>/<category>/<gesture>/<video>`; output mirrors it
//! as `<out>/<category>/<gesture>/<video-stem>_frame_<index>.<ext>`. Every
//! decodable video yields exactly `max_frames` images, short videos being padded
//! by repeating their last decoded frame.

pub mod driver;
pub mod sources;

use std::path::{Path, PathBuf};

use image::RgbImage;
use keypoints::utils;
use landmarks::{annotate, HandDetector, OverlayStyle};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use driver::{Driver, DriverError};
use sources::{FrameDirectory, Sink, Source};

/// Frames written per video unless configured otherwise.
pub const DEFAULT_MAX_FRAMES: usize = 200;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Backend error: {0}")]
    Backend(#[from] DriverError),
    #[error("Input error: {0}")]
    Input(#[from] keypoints::KeypointsError),
}

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Exact number of frames written per decodable video
    pub max_frames: usize,
    /// Draw detected landmarks onto frames before writing them
    pub annotate: bool,
    /// Output image extension, which also selects the encoder
    pub extension: String,
    pub overlay: OverlayStyle,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            annotate: true,
            extension: "jpeg".to_string(),
            overlay: OverlayStyle::default(),
        }
    }
}

/// What happened to a single video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoReport {
    pub decoded: usize,
    pub padded: usize,
    pub written: usize,
    pub failed: Vec<PathBuf>,
}

/// Totals for a whole dataset run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub videos: usize,
    pub skipped: Vec<PathBuf>,
    pub frames_written: usize,
    pub failed_writes: Vec<PathBuf>,
}

impl FrameReport {
    fn add(&mut self, video: VideoReport) {
        self.videos += 1;
        self.frames_written += video.written;
        self.failed_writes.extend(video.failed);
    }
}

/// Decodes videos through a [`Driver`] and writes padded frame sequences.
pub struct FrameExtractor<D: Driver> {
    driver: D,
    config: ExtractConfig,
    detector: Option<Box<dyn HandDetector>>,
}

impl<D: Driver> FrameExtractor<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            config: ExtractConfig::default(),
            detector: None,
        }
    }

    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    /// Detector used only to draw the landmark overlay
    pub fn with_detector(mut self, detector: impl HandDetector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    /// Get reference to the driver for advanced usage
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    fn overlay(&self, frame: &mut RgbImage) {
        if !self.config.annotate {
            return;
        }
        let Some(detector) = &self.detector else {
            return;
        };
        match detector.detect(frame) {
            Ok(hands) => annotate(frame, &hands, &self.config.overlay),
            // The overlay is cosmetic; keep the plain frame
            Err(e) => warn!("Landmark overlay skipped: {}", e),
        }
    }

    fn write_frame(sink: &FrameDirectory, index: usize, frame: &RgbImage, report: &mut VideoReport) {
        match sink.write(index, frame) {
            Ok(path) => {
                debug!("Wrote {}", path.display());
                report.written += 1;
            }
            Err(e) => {
                let path = sink.frame_path(index);
                error!("Failed to write {}: {}", path.display(), e);
                report.failed.push(path);
            }
        }
    }

    /// Decode one video into `output_dir`, one frame at a time.
    ///
    /// Only the most recent frame is held in memory; it is reused for padding.
    /// A frame that fails to decode ends the decoded run early. Returns an
    /// error, writing nothing, when not a single frame can be decoded.
    pub fn extract_video(&self, video: &Path, output_dir: &Path) -> Result<VideoReport, DriverError> {
        let max_frames = self.config.max_frames;
        let source = self.driver.source(video);
        let frames = self.driver.decode(&source, max_frames)?;

        let sink = FrameDirectory::new(output_dir, source.stem(), self.config.extension.as_str());
        sink.validate()?;
        debug!("{} -> {}", source.description(), sink.description());

        let mut report = VideoReport::default();
        let mut last = None;
        for (index, frame) in frames.take(max_frames).enumerate() {
            let mut frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("{}: decoding stopped after {} frame(s): {}", source.description(), index, e);
                    break;
                }
            };
            self.overlay(&mut frame);
            Self::write_frame(&sink, index, &frame, &mut report);
            report.decoded += 1;
            last = Some(frame);
        }

        let Some(last) = last else {
            if max_frames == 0 {
                return Ok(report);
            }
            return Err(DriverError::Decode(format!("{} produced no frames", source.description())));
        };
        for index in report.decoded..max_frames {
            Self::write_frame(&sink, index, &last, &mut report);
            report.padded += 1;
        }

        Ok(report)
    }

    /// Walk `<input_root>/<category>/<gesture>/<video>` and mirror frames under `output_root`.
    ///
    /// Non-video files are ignored and videos that fail to open or decode are
    /// skipped. A gesture whose output directory cannot be created is recorded
    /// as a failed write and the walk continues.
    pub fn extract_dataset(&self, input_root: &Path, output_root: &Path) -> Result<FrameReport, ExtractError> {
        info!(
            "Extracting frames: {} -> {}",
            input_root.display(),
            output_root.display()
        );

        let mut report = FrameReport::default();
        for (category, category_path) in utils::subdirectories(input_root)? {
            for (gesture, gesture_path) in utils::subdirectories(&category_path)? {
                let frames_dir = output_root.join(&category).join(&gesture);
                if let Err(e) = std::fs::create_dir_all(&frames_dir) {
                    error!("Failed to create {}: {}", frames_dir.display(), e);
                    report.failed_writes.push(frames_dir);
                    continue;
                }

                for (name, video) in utils::files(&gesture_path)? {
                    if !utils::is_video_file(&video) {
                        debug!("Ignoring non-video file {}/{}/{}", category, gesture, name);
                        continue;
                    }
                    match self.extract_video(&video, &frames_dir) {
                        Ok(video_report) => {
                            info!(
                                "{}/{}: {} decoded, {} padded",
                                category,
                                gesture,
                                video_report.decoded,
                                video_report.padded
                            );
                            report.add(video_report);
                        }
                        Err(e) => {
                            warn!("Skipping {}: {}", video.display(), e);
                            report.skipped.push(video);
                        }
                    }
                }
            }
        }

        info!(
            "Frame extraction complete: {} videos, {} frames, {} skipped",
            report.videos,
            report.frames_written,
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(feature = "ffmpeg")]
impl FrameExtractor<driver::ffmpeg::FFmpegDriver> {
    pub fn ffmpeg_default() -> Result<Self, DriverError> {
        Ok(Self::new(driver::ffmpeg::FFmpegDriver::new()?))
    }

    pub fn ffmpeg_with_path(ffmpeg_path: &str) -> Result<Self, DriverError> {
        Ok(Self::new(driver::ffmpeg::FFmpegDriver::with_path(ffmpeg_path)?))
    }
}
