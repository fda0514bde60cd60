//! Continuous QR Code Scanning
//!
//! Samples a live camera feed, decodes QR codes from new frames and logs
//! each scan with a timestamp. After a successful scan the loop cools down
//! for a fixed period so the same code is not logged over and over.
//!
//! # Architecture
//!
//! ```text
//! capture (CameraSource) → scan (ScanLoop) → decode (Decoder)
//!                               ↓
//!                  LogSink / observers / metrics
//! ```
//!
//! The loop never drives itself: an external scheduler calls
//! [`ScanLoop::tick`] once per frame interval. Camera, decoder and log sink
//! are injected at construction.
//!
//! # Example
//!
//! ```no_run
//! use qrscan::{
//!     capture::{MockCamera, ScanConfig},
//!     decode::RqrrDecoder,
//!     scan::{ScanLog, ScanLoop, TickOutcome},
//! };
//!
//! let mut scanner = ScanLoop::new(
//!     MockCamera::new().continuous(),
//!     RqrrDecoder::new(),
//!     ScanLog::default(),
//!     ScanConfig::default(),
//! )
//! .unwrap();
//! scanner.start().unwrap();
//!
//! for _ in 0..10 {
//!     if let TickOutcome::Decoded(result) = scanner.tick() {
//!         println!("{}", result.log_line());
//!     }
//! }
//!
//! scanner.stop();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod metrics;
pub mod scan;

// Re-export commonly used types at crate root
pub use capture::{CameraSource, CaptureConfig, FileConfig, FrameBuffer, MockCamera, ScanConfig};
pub use decode::{Decoder, RqrrDecoder};
pub use scan::{LogSink, ScanError, ScanLog, ScanLoop, ScanResult, ScanState, TickOutcome};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
