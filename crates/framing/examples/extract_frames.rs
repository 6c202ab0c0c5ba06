use framing::{ExtractConfig, FrameExtractor};
use landmarks::ProcessDetector;
use std::path::Path;

/// Usage: extract_frames [videos] [frames] [detector-program]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "videos".to_string());
    let output = args.next().unwrap_or_else(|| "frames".to_string());
    let detector = args.next();

    let mut extractor = FrameExtractor::ffmpeg_default()?.with_config(ExtractConfig {
        annotate: detector.is_some(),
        ..ExtractConfig::default()
    });
    if let Some(program) = detector {
        extractor = extractor.with_detector(ProcessDetector::new(program)?);
    }

    let report = extractor.extract_dataset(Path::new(&input), Path::new(&output))?;
    println!(
        "Extracted {} frames from {} videos ({} skipped)",
        report.frames_written,
        report.videos,
        report.skipped.len()
    );

    Ok(())
}
