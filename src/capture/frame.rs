//! Reusable pixel storage for sampled camera frames.

use serde::{Deserialize, Serialize};

/// Channel layout of raw pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    Rgba32,
    /// 8-bit red, green, blue.
    Rgb24,
    /// 8-bit luminance.
    Luma8,
}

impl PixelFormat {
    /// Bytes used by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba32 => 4,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Luma8 => 1,
        }
    }
}

/// A mutable 2D pixel buffer sized to the camera's current resolution.
///
/// The buffer is overwritten on every sample and only reallocated when the
/// requested dimensions differ from the current ones.
#[derive(Clone)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Number of times the dimensions changed.
    resizes: u64,
}

impl FrameBuffer {
    /// Creates an empty buffer for the given pixel format.
    pub fn new(format: PixelFormat) -> Self {
        Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
            format,
            resizes: 0,
        }
    }

    /// Resizes the buffer to `width` x `height`.
    ///
    /// Returns `true` if the dimensions changed. Pixel contents are
    /// unspecified after a resize.
    pub fn resize_to(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        let len = self.expected_len();
        self.pixels.clear();
        self.pixels.resize(len, 0);
        self.resizes += 1;
        tracing::debug!(width, height, format = ?self.format, "Frame buffer resized");
        true
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the raw pixel data for writing.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout of the pixels.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns how many times the buffer has been resized.
    #[inline]
    pub fn resize_count(&self) -> u64 {
        self.resizes
    }

    /// Byte length implied by the dimensions and format.
    #[inline]
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * self.format.bytes_per_pixel()
    }

    /// Returns true if the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("pixel_bytes", &self.pixels.len())
            .field("resizes", &self.resizes)
            .finish()
    }
}
