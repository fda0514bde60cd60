//! Camera abstraction for frame sampling.
//!
//! The scan loop only ever polls a camera: it asks whether a new frame has
//! arrived, reads the current resolution, and copies pixels out. Hardware
//! backends and the scripted [`MockCamera`] both sit behind [`CameraSource`].

use super::{DeviceInfo, Facing, FrameBuffer, PixelFormat};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No device matched the request.
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    /// The device exists but could not be opened or streamed.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// Device enumeration failed.
    #[error("failed to enumerate cameras: {0}")]
    QueryFailed(String),
    /// A frame could not be captured or converted.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// The destination buffer does not match the frame resolution.
    #[error("frame size mismatch: buffer is {buffer_width}x{buffer_height}, frame is {frame_width}x{frame_height}")]
    FrameSizeMismatch {
        /// Buffer width in pixels.
        buffer_width: u32,
        /// Buffer height in pixels.
        buffer_height: u32,
        /// Frame width in pixels.
        frame_width: u32,
        /// Frame height in pixels.
        frame_height: u32,
    },
    /// The camera is not playing or has no frame yet.
    #[error("camera not initialized")]
    NotInitialized,
}

/// A live camera that is polled once per scheduler tick.
///
/// Capture runs on the platform's side; this trait only exposes polling
/// signals and never calls back into the scanner.
pub trait CameraSource {
    /// Lists the devices this source can open.
    fn devices(&self) -> Result<Vec<DeviceInfo>, CameraError>;

    /// Starts (or resumes) capture.
    fn play(&mut self) -> Result<(), CameraError>;

    /// Stops capture. Calling this while stopped is a no-op.
    fn stop(&mut self);

    /// Returns true while the camera is capturing.
    fn is_playing(&self) -> bool;

    /// Current frame width in pixels.
    fn width(&self) -> u32;

    /// Current frame height in pixels.
    fn height(&self) -> u32;

    /// Returns true if a new frame arrived since the previous call.
    fn did_update(&mut self) -> bool;

    /// Channel order of the pixels written by [`read_frame`](Self::read_frame).
    fn pixel_format(&self) -> PixelFormat;

    /// Copies the current frame into `buffer`.
    ///
    /// The buffer must already be sized to the current resolution.
    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> Result<(), CameraError>;

    /// Clockwise rotation the frame needs for upright display, in degrees.
    fn rotation_angle(&self) -> i32 {
        0
    }

    /// Returns true if the active device faces the user.
    fn is_front_facing(&self) -> bool {
        false
    }

    /// Returns true if frames arrive with rows bottom-up.
    fn is_vertically_mirrored(&self) -> bool {
        false
    }
}

pub(super) fn check_buffer(buffer: &FrameBuffer, width: u32, height: u32) -> Result<(), CameraError> {
    if buffer.width() != width || buffer.height() != height || buffer.is_empty() {
        return Err(CameraError::FrameSizeMismatch {
            buffer_width: buffer.width(),
            buffer_height: buffer.height(),
            frame_width: width,
            frame_height: height,
        });
    }
    Ok(())
}

/// Scripted camera for tests and demos.
///
/// Frames only "arrive" when [`push_frame`](MockCamera::push_frame) is called
/// (or on every poll when [`continuous`](MockCamera::continuous) is set).
/// Pixel content is a synthetic pattern unless a still image is supplied.
#[derive(Debug)]
pub struct MockCamera {
    devices: Vec<DeviceInfo>,
    width: u32,
    height: u32,
    playing: bool,
    pending: bool,
    continuous: bool,
    /// Stays stopped no matter how often `play` is called.
    stuck: bool,
    /// Number of upcoming `play` calls that fail.
    fail_plays: u32,
    still: Option<Vec<u8>>,
    rotation: i32,
    sequence: u64,
    play_calls: u32,
    stop_calls: u32,
}

impl MockCamera {
    /// Creates a stopped 640x480 back-facing mock.
    pub fn new() -> Self {
        Self {
            devices: vec![DeviceInfo::new(0, "Mock Camera", Facing::Back)],
            width: 640,
            height: 480,
            playing: false,
            pending: false,
            continuous: false,
            stuck: false,
            fail_plays: 0,
            still: None,
            rotation: 0,
            sequence: 0,
            play_calls: 0,
            stop_calls: 0,
        }
    }

    /// Replays a still RGBA image as every frame.
    ///
    /// Returns `None` if `rgba` does not hold `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        let mut camera = Self::new();
        camera.width = width;
        camera.height = height;
        camera.still = Some(rgba);
        Some(camera)
    }

    /// Replaces the device list. An empty list simulates a machine with no camera.
    pub fn with_devices(mut self, devices: Vec<DeviceInfo>) -> Self {
        self.devices = devices;
        self
    }

    /// Makes `play` succeed without the camera ever starting.
    pub fn never_starts(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Makes the next `n` calls to `play` fail.
    pub fn fail_next_plays(&mut self, n: u32) {
        self.fail_plays = n;
    }

    /// Reports a new frame on every poll.
    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    /// Sets the reported rotation angle.
    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Signals that a new frame has arrived. Ignored while stopped.
    pub fn push_frame(&mut self) {
        if self.playing {
            self.pending = true;
        }
    }

    /// Changes the capture resolution, as after a camera switch.
    ///
    /// Any still image is dropped since it no longer matches.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.still = None;
    }

    /// Number of frames read so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of `play` calls, including failed ones.
    pub fn play_calls(&self) -> u32 {
        self.play_calls
    }

    /// Number of `stop` calls.
    pub fn stop_calls(&self) -> u32 {
        self.stop_calls
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSource for MockCamera {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(self.devices.clone())
    }

    fn play(&mut self) -> Result<(), CameraError> {
        self.play_calls += 1;
        if self.devices.is_empty() {
            return Err(CameraError::DeviceNotFound("no mock devices".to_string()));
        }
        if self.fail_plays > 0 {
            self.fail_plays -= 1;
            return Err(CameraError::OpenFailed("mock device busy".to_string()));
        }
        if !self.stuck {
            self.playing = true;
            tracing::info!(width = self.width, height = self.height, "MockCamera playing");
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_calls += 1;
        if self.playing {
            self.playing = false;
            self.pending = false;
            tracing::info!("MockCamera stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn did_update(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        if self.continuous {
            return true;
        }
        std::mem::take(&mut self.pending)
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba32
    }

    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> Result<(), CameraError> {
        if !self.playing {
            return Err(CameraError::NotInitialized);
        }
        check_buffer(buffer, self.width, self.height)?;

        match &self.still {
            Some(still) => buffer.pixels_mut().copy_from_slice(still),
            None => {
                let sequence = self.sequence;
                for (i, px) in buffer.pixels_mut().chunks_exact_mut(4).enumerate() {
                    // Deterministic pattern; never a valid QR code.
                    let v = ((i as u64 ^ sequence) % 256) as u8;
                    px.copy_from_slice(&[v, v, v, 255]);
                }
            }
        }

        self.sequence += 1;
        Ok(())
    }

    fn rotation_angle(&self) -> i32 {
        self.rotation
    }

    fn is_front_facing(&self) -> bool {
        self.devices.first().map_or(false, DeviceInfo::is_front_facing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        assert!(!camera.is_playing());

        camera.play().unwrap();
        assert!(camera.is_playing());

        camera.stop();
        assert!(!camera.is_playing());
        assert_eq!(camera.play_calls(), 1);
        assert_eq!(camera.stop_calls(), 1);
    }

    #[test]
    fn test_update_flag_consumed() {
        let mut camera = MockCamera::new();
        camera.play().unwrap();

        assert!(!camera.did_update());
        camera.push_frame();
        assert!(camera.did_update());
        assert!(!camera.did_update());
    }

    #[test]
    fn test_no_updates_while_stopped() {
        let mut camera = MockCamera::new().continuous();
        camera.push_frame();
        assert!(!camera.did_update());
    }

    #[test]
    fn test_push_while_stopped_is_dropped() {
        let mut camera = MockCamera::new();
        camera.push_frame();
        camera.play().unwrap();
        assert!(!camera.did_update());
    }

    #[test]
    fn test_fail_next_plays() {
        let mut camera = MockCamera::new();
        camera.fail_next_plays(1);
        assert!(matches!(camera.play(), Err(CameraError::OpenFailed(_))));
        assert!(!camera.is_playing());
        camera.play().unwrap();
        assert!(camera.is_playing());
        assert_eq!(camera.play_calls(), 2);
    }

    #[test]
    fn test_read_into_sized_buffer() {
        let mut camera = MockCamera::new();
        camera.play().unwrap();

        let mut buffer = FrameBuffer::new(camera.pixel_format());
        buffer.resize_to(camera.width(), camera.height());
        camera.read_frame(&mut buffer).unwrap();
        assert_eq!(camera.sequence(), 1);
        assert_eq!(buffer.pixels()[3], 255);
    }

    #[test]
    fn test_read_rejects_stale_buffer() {
        let mut camera = MockCamera::new();
        camera.play().unwrap();

        let mut buffer = FrameBuffer::new(camera.pixel_format());
        buffer.resize_to(640, 480);
        camera.set_resolution(1280, 720);

        assert!(matches!(
            camera.read_frame(&mut buffer),
            Err(CameraError::FrameSizeMismatch { frame_width: 1280, .. })
        ));
        assert_eq!(camera.sequence(), 0);
    }

    #[test]
    fn test_play_without_devices_fails() {
        let mut camera = MockCamera::new().with_devices(Vec::new());
        assert!(matches!(camera.play(), Err(CameraError::DeviceNotFound(_))));
        assert!(!camera.is_playing());
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(MockCamera::from_rgba(2, 2, vec![0u8; 16]).is_some());
        assert!(MockCamera::from_rgba(2, 2, vec![0u8; 15]).is_none());
    }
}
