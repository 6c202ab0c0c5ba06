use std::fmt;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use image::{ImageFormat, RgbImage};
use keypoints::{HandObservation, Handedness, Point3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{LandmarkError, Result},
    traits::HandDetector,
};

/// One hand as reported on the detector program's stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
    pub handedness: Handedness,
    pub landmarks: Vec<Point3>,
}

/// A running detector program and its pipes.
struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LandmarkError::Detector(format!("Failed to start {}: {}", program, e)))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(LandmarkError::Detector(format!("No pipes to {}", program)));
        };
        debug!("Started detector {} (pid {})", program, child.id());

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Send one encoded frame and read its reply line.
    ///
    /// `None` when the program closed its output instead of answering.
    fn exchange(&mut self, frame: &[u8]) -> std::io::Result<Option<String>> {
        writeln!(self.stdin, "{}", frame.len())?;
        self.stdin.write_all(frame)?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn exit_description(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => format!("exited with {}", status),
            _ => "stopped answering".to_string(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Drives a long-running external landmark-detection program.
///
/// The program is started on the first frame and kept alive across frames.
/// For every frame it receives, on stdin, a line holding the byte length of a
/// PNG image followed by the image bytes, and must answer with exactly one
/// line on stdout: a JSON array of [`DetectedHand`] objects, empty when no
/// hand was found. If the program exits it is restarted on the next frame.
pub struct ProcessDetector {
    program: String,
    args: Vec<String>,
    session: Mutex<Option<Session>>,
}

impl fmt::Debug for ProcessDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessDetector")
            .field("program", &self.program)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl ProcessDetector {
    pub fn new(program: impl Into<String>) -> Result<Self> {
        let program = program.into();

        // Bare names are resolved through PATH at spawn time
        let path = Path::new(&program);
        if path.components().count() > 1 && !path.exists() {
            return Err(LandmarkError::Detector(format!(
                "Detector executable not found at: {}",
                program
            )));
        }

        Ok(Self {
            program,
            args: Vec::new(),
            session: Mutex::new(None),
        })
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn encode_frame(frame: &RgbImage) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        frame.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }
}

/// Parse the detector program's stdout into hand observations.
pub fn parse_detections(stdout: &[u8]) -> Result<Vec<HandObservation>> {
    let hands: Vec<DetectedHand> = serde_json::from_slice(stdout)
        .map_err(|e| LandmarkError::InvalidOutput(e.to_string()))?;

    hands
        .into_iter()
        .map(|hand| Ok(HandObservation::from_points(hand.handedness, &hand.landmarks)?))
        .collect()
}

impl HandDetector for ProcessDetector {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<HandObservation>> {
        let input = Self::encode_frame(frame)?;
        let mut slot = self
            .session
            .lock()
            .map_err(|_| LandmarkError::Detector(format!("{} session poisoned", self.program)))?;

        let mut session = match slot.take() {
            Some(session) => session,
            None => Session::spawn(&self.program, &self.args)?,
        };
        match session.exchange(&input) {
            Ok(Some(reply)) => {
                *slot = Some(session);
                parse_detections(reply.as_bytes())
            }
            Ok(None) => {
                let exit = session.exit_description();
                warn!("Detector {} {}", self.program, exit);
                Err(LandmarkError::Detector(format!("{} {}", self.program, exit)))
            }
            Err(e) => Err(LandmarkError::Detector(format!(
                "Lost connection to {}: {}",
                self.program, e
            ))),
        }
    }

    fn name(&self) -> String {
        format!("process:{}", self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypoints::LANDMARK_COUNT;

    fn hand_json(handedness: Handedness, count: usize) -> String {
        let hands = vec![DetectedHand {
            handedness,
            landmarks: (0..count).map(|i| [i as f64 / 20.0, 0.5, 0.0]).collect(),
        }];
        serde_json::to_string(&hands).unwrap()
    }

    #[test]
    fn test_parse_detections() {
        let hands = parse_detections(hand_json(Handedness::Left, LANDMARK_COUNT).as_bytes()).unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, Handedness::Left);
        assert_eq!(hands[0].points[20], [1.0, 0.5, 0.0]);

        assert!(parse_detections(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_output() {
        assert!(matches!(
            parse_detections(b"not json"),
            Err(LandmarkError::InvalidOutput(_))
        ));
        assert!(matches!(
            parse_detections(hand_json(Handedness::Right, 5).as_bytes()),
            Err(LandmarkError::Keypoints(_))
        ));
    }

    #[test]
    fn test_missing_executable_path() {
        assert!(ProcessDetector::new("/no/such/dir/detector").is_err());
        assert!(ProcessDetector::new("detector-on-path").is_ok());
    }

    /// Shell loop speaking the frame protocol; `reply` is evaluated once per frame with `$n` set.
    #[cfg(unix)]
    fn looping_detector(reply: &str) -> ProcessDetector {
        let script = format!(
            "n=0; while read len; do dd bs=1 count=\"$len\" of=/dev/null 2>/dev/null; n=$((n+1)); {}; done",
            reply
        );
        ProcessDetector::new("sh").unwrap().with_args(["-c".to_string(), script])
    }

    #[cfg(unix)]
    #[test]
    fn test_one_process_answers_every_frame() {
        // Only the first frame of the process's life reports a hand
        let reply = format!(
            "if [ \"$n\" -eq 1 ]; then echo '{}'; else echo '[]'; fi",
            hand_json(Handedness::Right, LANDMARK_COUNT)
        );
        let detector = looping_detector(&reply);

        let first = detector.detect(&RgbImage::new(8, 8)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].handedness, Handedness::Right);
        for _ in 0..3 {
            assert!(detector.detect(&RgbImage::new(16, 16)).unwrap().is_empty());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_program_is_restarted() {
        let detector = looping_detector("echo '[]'; exit 0");

        assert!(detector.detect(&RgbImage::new(4, 4)).unwrap().is_empty());
        assert!(matches!(
            detector.detect(&RgbImage::new(4, 4)),
            Err(LandmarkError::Detector(_))
        ));
        assert!(detector.detect(&RgbImage::new(4, 4)).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_bad_reply_keeps_the_process() {
        let detector = looping_detector("if [ \"$n\" -eq 1 ]; then echo oops; else echo '[]'; fi");

        assert!(matches!(
            detector.detect(&RgbImage::new(4, 4)),
            Err(LandmarkError::InvalidOutput(_))
        ));
        assert!(detector.detect(&RgbImage::new(4, 4)).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_is_an_error() {
        let detector = ProcessDetector::new("sh")
            .unwrap()
            .with_args(["-c", "echo boom >&2; exit 3"]);

        assert!(matches!(
            detector.detect(&RgbImage::new(8, 8)),
            Err(LandmarkError::Detector(_))
        ));
    }

    #[test]
    fn test_unknown_program_fails_on_first_frame() {
        let detector = ProcessDetector::new("gesture-prep-no-such-detector").unwrap();
        let err = detector.detect(&RgbImage::new(2, 2)).unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }
}
