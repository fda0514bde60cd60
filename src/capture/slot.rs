//! Single-frame handoff between a capture thread and the polling side.
//!
//! The capture thread overwrites the slot with every frame it receives; the
//! scan loop only ever sees the newest one. Polling never blocks on capture.

#![cfg_attr(not(feature = "camera"), allow(dead_code))]

use super::camera::check_buffer;
use super::{CameraError, FrameBuffer};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Latest captured frame plus a "new frame" flag.
#[derive(Default)]
pub(crate) struct FrameSlot {
    frame: Mutex<Frame>,
    fresh: AtomicBool,
    width: AtomicU32,
    height: AtomicU32,
}

impl FrameSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the held frame and raises the update flag.
    pub(crate) fn publish(&self, width: u32, height: u32, pixels: Vec<u8>) {
        {
            let mut frame = self.frame.lock().unwrap_or_else(|e| e.into_inner());
            *frame = Frame {
                width,
                height,
                pixels,
            };
        }
        self.width.store(width, Ordering::Release);
        self.height.store(height, Ordering::Release);
        self.fresh.store(true, Ordering::Release);
    }

    /// Returns true once per published frame.
    pub(crate) fn did_update(&self) -> bool {
        self.fresh.swap(false, Ordering::AcqRel)
    }

    /// Resolution of the most recent frame, or `None` before the first one.
    pub(crate) fn dimensions(&self) -> Option<(u32, u32)> {
        let width = self.width.load(Ordering::Acquire);
        let height = self.height.load(Ordering::Acquire);
        (width > 0 && height > 0).then_some((width, height))
    }

    /// Copies the held frame into `buffer`, which must match its resolution.
    pub(crate) fn copy_into(&self, buffer: &mut FrameBuffer) -> Result<(), CameraError> {
        let frame = self.frame.lock().unwrap_or_else(|e| e.into_inner());
        if frame.pixels.is_empty() {
            return Err(CameraError::NotInitialized);
        }
        check_buffer(buffer, frame.width, frame.height)?;
        if frame.pixels.len() != buffer.pixels().len() {
            return Err(CameraError::CaptureFailed(format!(
                "frame holds {} bytes, expected {}",
                frame.pixels.len(),
                buffer.pixels().len()
            )));
        }
        buffer.pixels_mut().copy_from_slice(&frame.pixels);
        Ok(())
    }

    /// Drops the held frame and lowers the flag.
    pub(crate) fn clear(&self) {
        self.fresh.store(false, Ordering::Release);
        let mut frame = self.frame.lock().unwrap_or_else(|e| e.into_inner());
        frame.pixels.clear();
    }
}
