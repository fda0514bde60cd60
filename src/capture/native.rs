//! Hardware camera backed by `nokhwa`.
//!
//! `nokhwa` only offers blocking frame reads, so each played stream gets a
//! capture thread that owns the device and publishes decoded frames into a
//! [`FrameSlot`]. The polling side never touches the device directly.

use super::slot::FrameSlot;
use super::{select_device, CameraError, CameraSource, CaptureConfig, DeviceInfo, Facing, FrameBuffer, PixelFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest wait for the capture thread to open the device.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest wait for a previous capture thread to exit before replaying.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Consecutive capture failures after which the stream is closed.
const MAX_CAPTURE_FAILURES: u32 = 30;

/// Lists cameras visible to the native backend.
pub fn list_devices() -> Result<Vec<DeviceInfo>, CameraError> {
    let cameras =
        nokhwa::query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(cameras
        .iter()
        .enumerate()
        .map(|(position, info)| {
            let index = match info.index() {
                CameraIndex::Index(i) => *i,
                CameraIndex::String(_) => position as u32,
            };
            let name = info.human_name();
            let facing = guess_facing(&name);
            DeviceInfo::new(index, name, facing)
        })
        .collect())
}

/// Desktop backends do not report facing; infer it from the device name.
fn guess_facing(name: &str) -> Facing {
    let name = name.to_ascii_lowercase();
    if ["front", "facetime", "user", "integrated"]
        .iter()
        .any(|hint| name.contains(hint))
    {
        Facing::Front
    } else {
        Facing::Back
    }
}

/// State shared with the capture thread.
#[derive(Default)]
struct Shared {
    slot: FrameSlot,
    /// Cleared to ask the capture thread to exit.
    running: AtomicBool,
    /// Set while the device stream is open.
    streaming: AtomicBool,
}

/// A physical camera opened through the platform's native API.
///
/// [`play`](CameraSource::play) blocks until the device is open (bounded);
/// after that every trait method returns immediately.
pub struct NokhwaCamera {
    config: CaptureConfig,
    device: Option<DeviceInfo>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    width: u32,
    height: u32,
}

impl NokhwaCamera {
    /// Creates a stopped camera. No device is opened until `play`.
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            config,
            device: None,
            shared: Arc::new(Shared::default()),
            worker: None,
        }
    }

    /// The device picked on the last successful `play`.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    fn select(&self) -> Result<DeviceInfo, CameraError> {
        let devices = list_devices()?;
        select_device(&devices, self.config.facing, self.config.device_id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound("no cameras detected".to_string()))
    }

    /// Waits for a stopped capture thread to exit.
    fn reap_worker(&mut self) -> Result<(), CameraError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                self.worker = Some(worker);
                return Err(CameraError::OpenFailed(
                    "previous capture still shutting down".to_string(),
                ));
            }
            thread::sleep(Duration::from_millis(5));
        }
        if worker.join().is_err() {
            tracing::warn!("Capture thread panicked");
        }
        Ok(())
    }
}

fn requested_format(config: &CaptureConfig) -> RequestedFormat<'static> {
    RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        config.fps,
    )))
}

fn open_stream(index: u32, config: &CaptureConfig) -> Result<Camera, CameraError> {
    let mut camera = Camera::new(CameraIndex::Index(index), requested_format(config))
        .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
    Ok(camera)
}

fn capture_one(camera: &mut Camera, slot: &FrameSlot) -> Result<(), CameraError> {
    let frame = camera
        .frame()
        .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
    let image = frame
        .decode_image::<RgbFormat>()
        .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
    let (width, height) = (image.width(), image.height());
    slot.publish(width, height, image.into_raw());
    Ok(())
}

/// Body of the capture thread. The device lives and dies on this thread.
fn capture_loop(
    index: u32,
    config: CaptureConfig,
    shared: Arc<Shared>,
    opened: mpsc::Sender<Result<(u32, u32), CameraError>>,
) {
    let mut camera = match open_stream(index, &config) {
        Ok(camera) => camera,
        Err(e) => {
            shared.running.store(false, Ordering::Release);
            let _ = opened.send(Err(e));
            return;
        }
    };

    let resolution = camera.resolution();
    shared.streaming.store(true, Ordering::Release);
    if opened.send(Ok((resolution.width(), resolution.height()))).is_err() {
        // play() gave up waiting.
        shared.running.store(false, Ordering::Release);
    }

    let mut failures = 0u32;
    while shared.running.load(Ordering::Acquire) {
        match capture_one(&mut camera, &shared.slot) {
            Ok(()) => failures = 0,
            Err(e) => {
                failures += 1;
                tracing::trace!(error = %e, failures, "Frame capture failed");
                if failures >= MAX_CAPTURE_FAILURES {
                    tracing::error!(error = %e, "Camera stopped delivering frames");
                    break;
                }
            }
        }
    }

    shared.streaming.store(false, Ordering::Release);
    shared.running.store(false, Ordering::Release);
    if let Err(e) = camera.stop_stream() {
        tracing::warn!(error = %e, "Failed to stop camera stream");
    }
    tracing::debug!("Capture thread exited");
}

impl CameraSource for NokhwaCamera {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        list_devices()
    }

    fn play(&mut self) -> Result<(), CameraError> {
        if self.is_playing() {
            return Ok(());
        }
        self.reap_worker()?;

        let device = self.select()?;
        self.shared.slot.clear();
        self.shared.running.store(true, Ordering::Release);

        let (opened_tx, opened_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let index = device.index;
        let worker = thread::Builder::new()
            .name("qrscan-capture".to_string())
            .spawn(move || capture_loop(index, config, shared, opened_tx))
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
        self.worker = Some(worker);

        match opened_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok((width, height))) => {
                self.width = width;
                self.height = height;
                tracing::info!(
                    index = device.index,
                    name = %device.name,
                    facing = %device.facing,
                    width,
                    height,
                    "Camera stream open"
                );
                self.device = Some(device);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.shared.running.store(false, Ordering::Release);
                Err(CameraError::OpenFailed(format!(
                    "device did not open within {OPEN_TIMEOUT:?}"
                )))
            }
        }
    }

    fn stop(&mut self) {
        // The capture thread notices on its next frame and closes the stream.
        self.shared.running.store(false, Ordering::Release);
        self.shared.streaming.store(false, Ordering::Release);
        self.shared.slot.clear();
    }

    fn is_playing(&self) -> bool {
        self.shared.streaming.load(Ordering::Acquire)
    }

    fn width(&self) -> u32 {
        self.shared.slot.dimensions().map_or(self.width, |(w, _)| w)
    }

    fn height(&self) -> u32 {
        self.shared.slot.dimensions().map_or(self.height, |(_, h)| h)
    }

    fn did_update(&mut self) -> bool {
        self.is_playing() && self.shared.slot.did_update()
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgb24
    }

    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> Result<(), CameraError> {
        self.shared.slot.copy_into(buffer)
    }

    fn is_front_facing(&self) -> bool {
        self.device.as_ref().map_or(false, DeviceInfo::is_front_facing)
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_facing() {
        assert_eq!(guess_facing("FaceTime HD Camera"), Facing::Front);
        assert_eq!(guess_facing("Integrated Webcam"), Facing::Front);
        assert_eq!(guess_facing("Logitech C920"), Facing::Back);
    }

    #[test]
    fn test_new_reports_requested_size() {
        let camera = NokhwaCamera::new(CaptureConfig::with_dimensions(640, 480));
        assert_eq!((camera.width(), camera.height()), (640, 480));
        assert!(!camera.is_playing());
    }

    #[test]
    fn test_did_update_does_not_block_without_stream() {
        let mut camera = NokhwaCamera::new(CaptureConfig::default());
        let started = Instant::now();
        for _ in 0..100 {
            assert!(!camera.did_update());
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_published_frame_visible_to_poller() {
        let mut camera = NokhwaCamera::new(CaptureConfig::with_dimensions(640, 480));
        camera.shared.streaming.store(true, Ordering::Release);
        camera.shared.slot.publish(2, 2, vec![5; 12]);

        assert_eq!((camera.width(), camera.height()), (2, 2));
        assert!(camera.did_update());
        assert!(!camera.did_update());

        let mut buffer = FrameBuffer::new(camera.pixel_format());
        buffer.resize_to(2, 2);
        camera.read_frame(&mut buffer).unwrap();
        assert_eq!(buffer.pixels(), &[5; 12]);

        camera.stop();
        assert!(!camera.is_playing());
        assert!(!camera.did_update());
    }
}
