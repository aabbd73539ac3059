//! Webcam capture using nokhwa
//!
//! nokhwa's `Camera` is not `Send`, so it lives on a dedicated thread for
//! its whole life. `NokhwaCamera` talks to that thread over channels and
//! puts a timeout on every frame request. The thread drives the device
//! through `CaptureDevice`, which nokhwa's `Camera` implements.

use super::frame::{ChannelOrder, Frame};
use super::traits::{CameraInfo, CaptureError, FrameSource, Resolution};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType,
    Resolution as CameraResolution,
};
use nokhwa::Camera;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Upper bound on a single frame read
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Get list of available cameras
pub fn list_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .filter_map(|info| {
                let index = match info.index() {
                    CameraIndex::Index(i) => *i,
                    CameraIndex::String(s) => match s.parse::<u32>() {
                        Ok(i) => i,
                        Err(_) => {
                            tracing::debug!("Skipping camera with non-numeric id {}", s);
                            return None;
                        }
                    },
                };
                Some(CameraInfo {
                    index,
                    name: info.human_name(),
                    description: info.description().to_string(),
                })
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

enum CameraRequest {
    Configure {
        resolution: Resolution,
        reply: Sender<Result<Resolution, CaptureError>>,
    },
    Frame {
        reply: Sender<Result<Frame, CaptureError>>,
    },
    Release,
}

/// Device operations the capture thread needs
trait CaptureDevice {
    fn open_stream(&mut self) -> Result<(), CaptureError>;
    fn stop_stream(&mut self) -> Result<(), CaptureError>;
    fn request_resolution(&mut self, requested: Resolution) -> Result<(), CaptureError>;
    /// Resolution the device is actually delivering
    fn resolution(&self) -> Resolution;
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl CaptureDevice for Camera {
    fn open_stream(&mut self) -> Result<(), CaptureError> {
        Camera::open_stream(self).map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
    }

    fn stop_stream(&mut self) -> Result<(), CaptureError> {
        Camera::stop_stream(self).map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
    }

    fn request_resolution(&mut self, requested: Resolution) -> Result<(), CaptureError> {
        self.set_resolution(CameraResolution::new(requested.width, requested.height))
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
    }

    fn resolution(&self) -> Resolution {
        let resolution = Camera::resolution(self);
        Resolution {
            width: resolution.width(),
            height: resolution.height(),
        }
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let buffer = self
            .frame()
            .map_err(|e| CaptureError::FrameAcquisition(e.to_string()))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::FrameAcquisition(e.to_string()))?;
        let (width, height) = image.dimensions();

        Frame::new(width, height, ChannelOrder::Rgb, image.into_raw())
            .map_err(|e| CaptureError::FrameAcquisition(e.to_string()))
    }
}

/// Webcam frame source backed by a nokhwa capture thread
pub struct NokhwaCamera {
    /// Device index
    index: u32,

    /// Request channel to the capture thread (None once released)
    requests: Option<Sender<CameraRequest>>,

    /// Capture thread handle
    worker: Option<JoinHandle<()>>,

    /// Last negotiated resolution
    resolution: Resolution,

    /// How long `read_frame` waits for the capture thread
    read_timeout: Duration,
}

impl NokhwaCamera {
    /// Open the camera at `device_index` and start streaming
    pub fn open(device_index: u32) -> Result<Self, CaptureError> {
        Self::spawn(device_index, move || open_nokhwa(device_index))
    }

    /// Start the capture thread; `open_device` runs on that thread
    fn spawn<D, F>(device_index: u32, open_device: F) -> Result<Self, CaptureError>
    where
        D: CaptureDevice,
        F: FnOnce() -> Result<D, CaptureError> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name(format!("camera-{device_index}"))
            .spawn(move || match open_device() {
                Ok(device) => {
                    let _ = ready_tx.send(Ok(device.resolution()));
                    serve_requests(device_index, device, request_rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!("failed to spawn capture thread: {e}"))
            })?;

        let resolution = match ready_rx.recv() {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::DeviceUnavailable(format!(
                    "capture thread for camera {device_index} exited during startup"
                )));
            }
        };

        tracing::info!("Camera {} opened at {}", device_index, resolution);

        Ok(Self {
            index: device_index,
            requests: Some(request_tx),
            worker: Some(worker),
            resolution,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Change the frame read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn sender(&self) -> Result<&Sender<CameraRequest>, CaptureError> {
        self.requests.as_ref().ok_or(CaptureError::Released)
    }
}

impl FrameSource for NokhwaCamera {
    fn configure(&mut self, width: u32, height: u32) -> Result<Resolution, CaptureError> {
        let (reply, response) = mpsc::channel();
        self.sender()?
            .send(CameraRequest::Configure {
                resolution: Resolution { width, height },
                reply,
            })
            .map_err(|_| CaptureError::DeviceUnavailable("capture thread stopped".to_string()))?;

        let negotiated = response
            .recv()
            .map_err(|_| CaptureError::DeviceUnavailable("capture thread stopped".to_string()))??;

        if negotiated != (Resolution { width, height }) {
            tracing::info!(
                "Camera {} negotiated {} (requested {}x{})",
                self.index,
                negotiated,
                width,
                height
            );
        }
        self.resolution = negotiated;
        Ok(negotiated)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let (reply, response) = mpsc::channel();
        self.sender()?
            .send(CameraRequest::Frame { reply })
            .map_err(|_| CaptureError::FrameAcquisition("capture thread stopped".to_string()))?;

        response
            .recv_timeout(self.read_timeout)
            .map_err(|e| CaptureError::FrameAcquisition(format!("no frame from camera: {e}")))?
    }

    fn release(&mut self) {
        let Some(requests) = self.requests.take() else {
            return;
        };
        let _ = requests.send(CameraRequest::Release);
        drop(requests);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Camera {} capture thread panicked", self.index);
            }
        }
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.release();
    }
}

fn open_nokhwa(index: u32) -> Result<Camera, CaptureError> {
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

    let mut camera = Camera::new(CameraIndex::Index(index), format).map_err(|e| {
        CaptureError::DeviceUnavailable(format!("failed to open camera {index}: {e}"))
    })?;
    camera.open_stream().map_err(|e| {
        CaptureError::DeviceUnavailable(format!("failed to open stream for camera {index}: {e}"))
    })?;
    Ok(camera)
}

fn serve_requests<D: CaptureDevice>(index: u32, mut device: D, requests: Receiver<CameraRequest>) {
    for request in requests {
        match request {
            CameraRequest::Configure { resolution, reply } => {
                let _ = reply.send(negotiate(&mut device, resolution));
            }
            CameraRequest::Frame { reply } => {
                // The receiver may have timed out already
                let _ = reply.send(device.capture());
            }
            CameraRequest::Release => break,
        }
    }

    if let Err(e) = device.stop_stream() {
        tracing::warn!("Error stopping camera stream: {}", e);
    }
    tracing::info!("Camera {} released", index);
}

fn negotiate<D: CaptureDevice>(device: &mut D, requested: Resolution) -> Result<Resolution, CaptureError> {
    if let Err(e) = device.stop_stream() {
        tracing::debug!("Stopping stream before reconfigure failed: {}", e);
    }

    // Drivers are free to pick something else; the actual size is read back below
    if let Err(e) = device.request_resolution(requested) {
        tracing::warn!("Camera rejected resolution {}: {}", requested, e);
    }

    device
        .open_stream()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to reopen stream: {e}")))?;

    Ok(device.resolution())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Delivers sizes rounded down to a multiple of 16, like many UVC drivers
    struct FakeDevice {
        resolution: Resolution,
        streaming: bool,
        frame_delay: Duration,
        stops: Arc<AtomicUsize>,
    }

    impl FakeDevice {
        fn new(stops: Arc<AtomicUsize>) -> Self {
            Self {
                resolution: Resolution { width: 640, height: 480 },
                streaming: true,
                frame_delay: Duration::ZERO,
                stops,
            }
        }
    }

    impl CaptureDevice for FakeDevice {
        fn open_stream(&mut self) -> Result<(), CaptureError> {
            self.streaming = true;
            Ok(())
        }

        fn stop_stream(&mut self) -> Result<(), CaptureError> {
            self.streaming = false;
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn request_resolution(&mut self, requested: Resolution) -> Result<(), CaptureError> {
            if self.streaming {
                return Err(CaptureError::DeviceUnavailable("busy".to_string()));
            }
            self.resolution = Resolution {
                width: requested.width / 16 * 16,
                height: requested.height / 16 * 16,
            };
            Ok(())
        }

        fn resolution(&self) -> Resolution {
            self.resolution
        }

        fn capture(&mut self) -> Result<Frame, CaptureError> {
            if !self.streaming {
                return Err(CaptureError::FrameAcquisition("stream stopped".to_string()));
            }
            std::thread::sleep(self.frame_delay);
            let Resolution { width, height } = self.resolution;
            Ok(Frame::filled(width, height, ChannelOrder::Rgb, [1, 2, 3]))
        }
    }

    fn fake_camera(device: impl FnOnce() -> FakeDevice + Send + 'static) -> NokhwaCamera {
        NokhwaCamera::spawn(7, move || Ok(device())).unwrap()
    }

    #[test]
    fn test_negotiated_resolution_is_read_back_and_stable() {
        let stops = Arc::new(AtomicUsize::new(0));
        let device_stops = stops.clone();
        let mut camera = fake_camera(move || FakeDevice::new(device_stops));
        assert_eq!(camera.resolution(), Resolution { width: 640, height: 480 });

        let negotiated = camera.configure(800, 600).unwrap();

        assert_eq!(negotiated, Resolution { width: 800, height: 592 });
        for _ in 0..5 {
            assert_eq!(camera.read_frame().unwrap().resolution(), negotiated);
            assert_eq!(camera.resolution(), negotiated);
        }
        // Stream was stopped before the size change
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_failure_is_device_unavailable() {
        let result = NokhwaCamera::spawn(3, || -> Result<FakeDevice, CaptureError> {
            Err(CaptureError::DeviceUnavailable("no camera 3".to_string()))
        });
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(msg)) if msg == "no camera 3"));
    }

    #[test]
    fn test_slow_frame_times_out() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut camera = fake_camera(move || FakeDevice {
            frame_delay: Duration::from_millis(300),
            ..FakeDevice::new(stops)
        })
        .with_read_timeout(Duration::from_millis(20));

        assert!(matches!(camera.read_frame(), Err(CaptureError::FrameAcquisition(_))));
    }

    #[test]
    fn test_release_is_idempotent() {
        let stops = Arc::new(AtomicUsize::new(0));
        let device_stops = stops.clone();
        let mut camera = fake_camera(move || FakeDevice::new(device_stops));

        camera.release();
        camera.release();

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(matches!(camera.read_frame(), Err(CaptureError::Released)));
        assert!(matches!(camera.configure(320, 240), Err(CaptureError::Released)));
    }
}
