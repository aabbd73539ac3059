//! Landmark detection through an external model process
//!
//! The model runs as a long-lived child process. For each frame we write a
//! single JSON header line followed by the raw pixels, then read back one
//! JSON line with the detected hands:
//!
//! ```text
//! -> {"width":640,"height":480,"order":"bgr"}\n<width*height*3 bytes>
//! <- {"hands":[{"handedness":"left","landmarks":[[0.5,0.4,-0.01], ...]}]}\n
//! ```
//!
//! The pipe I/O happens on a worker thread so `detect` can give up after
//! the configured response timeout. At most one frame is in flight; while
//! a late answer is outstanding, new frames are skipped.

use super::landmarks::{Handedness, Landmark, LandmarkSet};
use super::{DetectError, LandmarkDetector};
use crate::capture::{ChannelOrder, Frame};
use crate::config::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Largest accepted normalized coordinate magnitude. Models report points
/// slightly outside the image; anything beyond this is garbage.
pub const COORDINATE_LIMIT: f32 = 2.0;

type DetectResult = Result<Vec<LandmarkSet>, DetectError>;

#[derive(Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
    order: ChannelOrder,
}

#[derive(Deserialize)]
struct DetectionResponse {
    #[serde(default)]
    hands: Vec<HandRecord>,
}

#[derive(Deserialize)]
struct HandRecord {
    #[serde(default)]
    handedness: Option<Handedness>,
    landmarks: Vec<Vec<f32>>,
}

fn checked_coordinate(value: f32) -> Result<f32, DetectError> {
    if value.is_finite() && value.abs() <= COORDINATE_LIMIT {
        Ok(value)
    } else {
        Err(DetectError::Protocol(format!("landmark coordinate {value} out of range")))
    }
}

fn parse_landmark(coords: &[f32]) -> Result<Landmark, DetectError> {
    match coords {
        [x, y] => Ok(Landmark::new(checked_coordinate(*x)?, checked_coordinate(*y)?)),
        [x, y, z] if z.is_finite() => Ok(Landmark {
            x: checked_coordinate(*x)?,
            y: checked_coordinate(*y)?,
            z: Some(*z),
        }),
        [_, _, z] => Err(DetectError::Protocol(format!("landmark depth {z} is not finite"))),
        other => Err(DetectError::Protocol(format!(
            "landmark has {} coordinates",
            other.len()
        ))),
    }
}

/// Parse one response line from the model process
pub fn parse_response(line: &str) -> Result<Vec<LandmarkSet>, DetectError> {
    let response: DetectionResponse = serde_json::from_str(line.trim())?;

    response
        .hands
        .into_iter()
        .map(|hand| {
            let points = hand
                .landmarks
                .iter()
                .map(|coords| parse_landmark(coords))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(LandmarkSet {
                handedness: hand.handedness,
                points,
            })
        })
        .collect()
}

/// Arguments passed to the model process after the configured ones
pub fn model_args(config: &DetectorConfig) -> Vec<String> {
    let mut args = config.args.clone();
    args.extend([
        "--max-hands".to_string(),
        config.max_hands.to_string(),
        "--model-complexity".to_string(),
        config.model_complexity.to_string(),
        "--min-detection-confidence".to_string(),
        config.min_detection_confidence.to_string(),
        "--min-tracking-confidence".to_string(),
        config.min_tracking_confidence.to_string(),
    ]);
    args
}

/// Detector backed by an external model process
pub struct ProcessDetector {
    process: Child,

    /// Frames for the I/O thread (None once shut down)
    requests: Option<Sender<Frame>>,

    responses: Receiver<DetectResult>,

    worker: Option<JoinHandle<()>>,

    timeout: Duration,

    /// A frame was sent but its answer has not been collected
    in_flight: bool,
}

impl ProcessDetector {
    /// Start the model process
    pub fn spawn(config: &DetectorConfig) -> Result<Self, DetectError> {
        let args = model_args(config);
        tracing::info!("Starting landmark model: {} {:?}", config.command, args);

        let mut process = Command::new(&config.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(DetectError::Spawn)?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| DetectError::Protocol("failed to capture model stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| DetectError::Protocol("failed to capture model stdout".to_string()))?;

        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("landmark-model".to_string())
            .spawn(move || model_thread(stdin, stdout, request_rx, response_tx));
        let worker = match worker {
            Ok(worker) => worker,
            Err(e) => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(DetectError::Spawn(e));
            }
        };

        Ok(Self {
            process,
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
            timeout: config.response_timeout(),
            in_flight: false,
        })
    }

    /// Collect a late answer, if it has arrived. Returns false while the
    /// model is still busy.
    fn collect_late_answer(&mut self) -> Result<bool, DetectError> {
        if !self.in_flight {
            return Ok(true);
        }
        match self.responses.try_recv() {
            Ok(_) => {
                // Belongs to an older frame
                self.in_flight = false;
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(DetectError::Closed),
        }
    }
}

impl LandmarkDetector for ProcessDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>, DetectError> {
        if !self.collect_late_answer()? {
            return Err(DetectError::Busy);
        }

        self.requests
            .as_ref()
            .ok_or(DetectError::Closed)?
            .send(frame.clone())
            .map_err(|_| DetectError::Closed)?;

        match self.responses.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.in_flight = true;
                Err(DetectError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DetectError::Closed),
        }
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        // Killing the model unblocks the I/O thread if it is mid-exchange
        let _ = self.process.kill();
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Landmark model thread panicked");
            }
        }
        let _ = self.process.wait();
    }
}

fn model_thread(
    mut stdin: ChildStdin,
    stdout: ChildStdout,
    frames: Receiver<Frame>,
    answers: Sender<DetectResult>,
) {
    let mut stdout = BufReader::new(stdout);
    let mut line = String::new();

    for frame in frames {
        let result = exchange(&mut stdin, &mut stdout, &mut line, &frame);
        let broken = matches!(result, Err(DetectError::Io(_) | DetectError::Closed));
        if broken {
            tracing::warn!("Landmark model pipe closed; overlay disabled");
        }
        if answers.send(result).is_err() || broken {
            break;
        }
    }
}

fn exchange(
    stdin: &mut ChildStdin,
    stdout: &mut BufReader<ChildStdout>,
    line: &mut String,
    frame: &Frame,
) -> DetectResult {
    let header = FrameHeader {
        width: frame.width(),
        height: frame.height(),
        order: frame.order(),
    };
    serde_json::to_writer(&mut *stdin, &header)?;
    stdin.write_all(b"\n")?;
    stdin.write_all(frame.data())?;
    stdin.flush()?;

    line.clear();
    if stdout.read_line(line)? == 0 {
        return Err(DetectError::Closed);
    }
    parse_response(line)
}
