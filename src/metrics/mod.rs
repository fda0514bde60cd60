//! Prometheus metrics exporter for scan monitoring.
//!
//! # Metrics Exposed
//!
//! - `qrscan_state` - Scan loop state (0=idle, 1=sampling, 2=cooldown)
//! - `qrscan_session_attempts` - Decode attempts since the log was cleared
//! - `qrscan_camera_playing` - Whether the camera is capturing
//! - `qrscan_idle_ticks_total` - Ticks with no new frame
//! - `qrscan_decode_attempts_total` - Frames submitted to the decoder
//! - `qrscan_scans_total` - Successful scans
//! - `qrscan_decode_errors_total` - Decoder failures
//! - `qrscan_frame_errors_total` - Frames that could not be read
//! - `qrscan_buffer_resizes_total` - Frame buffer reallocations
//!
//! With the `metrics` feature, `/health` returns 503 when the loop is idle
//! or sampling without a live camera.
//!
//! # Example
//!
//! ```no_run
//! use qrscan::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot::default());
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
