//! Camera input and frame handling.
//!
//! This module provides the polling camera abstraction the scan loop samples
//! from, the reusable frame buffer it copies into, and device and display
//! helpers. Hardware capture through `nokhwa` is behind the `camera` feature.

mod camera;
mod config;
mod device;
mod frame;
#[cfg(feature = "camera")]
mod native;
mod orientation;
mod slot;

pub use camera::{CameraError, CameraSource, MockCamera};
pub use config::{
    CaptureConfig, ConfigError, CooldownMode, FileConfig, OutputConfig, ScanConfig,
    COOLDOWN_RANGE_SECS, STARTUP_TIMEOUT_RANGE_MS,
};
pub use device::{select_device, DeviceInfo, Facing};
pub use frame::{FrameBuffer, PixelFormat};
#[cfg(feature = "camera")]
pub use native::{list_devices, NokhwaCamera};
pub use orientation::{fit_within, DisplayOrientation};
