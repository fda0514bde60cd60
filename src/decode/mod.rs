//! QR decoding.
//!
//! The scan loop treats the decoder as a synchronous function from raw
//! pixels to an optional payload. [`RqrrDecoder`] is the production
//! implementation; anything else implementing [`Decoder`] can be injected.

mod luma;
mod qr;

pub use luma::{to_luma, to_luma_into};
pub use qr::RqrrDecoder;

use crate::capture::PixelFormat;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The pixel slice does not match the stated dimensions.
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes implied by width, height and format.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// A code was located but its data could not be recovered.
    #[error("QR code found but unreadable: {0}")]
    Unreadable(String),
    /// A still image could not be loaded.
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
    /// Any other decoder failure.
    #[error("decoder failure: {0}")]
    Internal(String),
}

/// Turns a frame into decoded text.
pub trait Decoder {
    /// Decodes `pixels`, returning `Ok(None)` if no code is present.
    fn decode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Option<String>, DecodeError>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Option<String>, DecodeError> {
        (**self).decode(pixels, width, height, format)
    }
}

/// Decodes a still image from disk.
pub fn decode_image_file(
    path: impl AsRef<Path>,
    decoder: &mut dyn Decoder,
) -> Result<Option<String>, DecodeError> {
    let image = image::open(path.as_ref())?.to_rgba8();
    let (width, height) = image.dimensions();
    decoder.decode(image.as_raw(), width, height, PixelFormat::Rgba32)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl Decoder for Fixed {
        fn decode(&mut self, _: &[u8], _: u32, _: u32, _: PixelFormat) -> Result<Option<String>, DecodeError> {
            Ok(Some(self.0.to_string()))
        }
    }

    #[test]
    fn test_boxed_decoder_delegates() {
        let mut decoder: Box<dyn Decoder> = Box::new(Fixed("hello"));
        let text = decoder.decode(&[], 0, 0, PixelFormat::Luma8).unwrap();
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_missing_image_file() {
        let mut decoder = RqrrDecoder::new();
        let result = decode_image_file("does/not/exist.png", &mut decoder);
        assert!(matches!(result, Err(DecodeError::Image(_))));
    }
}
