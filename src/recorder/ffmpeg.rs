//! FFmpeg-backed recording sink
//!
//! Raw frames are piped into an FFmpeg child process which encodes them
//! into the output container.

use super::sink::{FrameSink, SinkError, SinkFactory, SinkSpec};
use crate::capture::Frame;
use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};

/// Opens `FfmpegSink`s
#[derive(Debug, Clone)]
pub struct FfmpegSinkFactory {
    /// FFmpeg executable
    program: String,
}

impl FfmpegSinkFactory {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that FFmpeg runs and ships the given encoder
    fn probe_encoder(&self, encoder: &str) -> Result<(), SinkError> {
        let output = Command::new(&self.program)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                SinkError::EncoderUnavailable(format!(
                    "FFmpeg not found ({}). Please install FFmpeg",
                    e
                ))
            })?;

        let listing = String::from_utf8_lossy(&output.stdout);
        if !has_encoder(&listing, encoder) {
            return Err(SinkError::EncoderUnavailable(format!(
                "FFmpeg build has no '{}' encoder",
                encoder
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn FrameSink>, SinkError> {
        let encoder = spec.codec.ffmpeg_encoder().ok_or_else(|| {
            SinkError::EncoderUnavailable(format!("no encoder known for codec {}", spec.codec))
        })?;
        self.probe_encoder(encoder)?;

        let args = encoder_args(spec, encoder);
        tracing::info!("Starting FFmpeg encoder: {:?}", args);

        let mut process = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SinkError::EncoderUnavailable(format!("failed to start FFmpeg: {}", e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| SinkError::EncoderUnavailable("failed to capture FFmpeg stdin".to_string()))?;

        Ok(Box::new(FfmpegSink {
            process: Some(process),
            stdin: Some(stdin),
            spec: spec.clone(),
            frames_written: 0,
        }))
    }
}

/// `ffmpeg -encoders` lines look like ` V....D mpeg4   MPEG-4 part 2`
fn has_encoder(listing: &str, encoder: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == encoder)
}

/// Build FFmpeg arguments for a raw-frame input on stdin
pub fn encoder_args(spec: &SinkSpec, encoder: &str) -> Vec<String> {
    // stderr is only read at close, so keep FFmpeg quiet while recording
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-nostats".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pixel_format".to_string(),
        spec.input_order.ffmpeg_pixel_format().to_string(),
        "-video_size".to_string(),
        spec.frame_size.to_string(),
        "-framerate".to_string(),
        spec.frame_rate.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        encoder.to_string(),
    ];

    match encoder {
        "mpeg4" => {
            args.extend([
                "-vtag".to_string(),
                spec.codec.to_string(),
                "-q:v".to_string(),
                "5".to_string(),
            ]);
        }
        "mjpeg" => {
            args.extend(["-q:v".to_string(), "3".to_string()]);
        }
        "libx264" => {
            args.extend([
                "-preset".to_string(),
                "veryfast".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
            ]);
        }
        _ => {}
    }

    args.push(spec.path.to_string_lossy().to_string());
    args
}

/// A running FFmpeg encoder fed through stdin
pub struct FfmpegSink {
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    spec: SinkSpec,
    frames_written: u64,
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.spec.check_frame(frame)?;
        let stdin = self.stdin.as_mut().ok_or(SinkError::Closed)?;

        let frame = frame.to_order(self.spec.input_order);
        stdin.write_all(frame.data())?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        // Closing stdin signals EOF so FFmpeg writes the trailer
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                tracing::warn!("Failed to flush FFmpeg stdin: {}", e);
            }
        }

        let Some(process) = self.process.take() else {
            return Ok(());
        };

        let output = process.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("FFmpeg exited with status {}: {}", output.status, stderr);
            return Err(SinkError::EncoderUnavailable(format!(
                "FFmpeg exited with status {}",
                output.status
            )));
        }

        tracing::info!(
            "FFmpeg finished: {} frames, output: {:?}",
            self.frames_written,
            self.spec.path
        );
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to finalize {:?}: {}", self.spec.path, e);
        }
    }
}
