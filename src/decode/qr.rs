//! QR decoding through `rqrr`.

use super::luma::to_luma_into;
use super::{DecodeError, Decoder};
use crate::capture::PixelFormat;

/// Decoder that locates QR grids with `rqrr` and returns the first readable one.
#[derive(Debug, Default)]
pub struct RqrrDecoder {
    scratch: Vec<u8>,
}

impl RqrrDecoder {
    /// Creates a decoder with an empty scratch buffer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RqrrDecoder {
    fn decode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Option<String>, DecodeError> {
        let (w, h) = (width as usize, height as usize);
        let expected = w * h * format.bytes_per_pixel();
        if w == 0 || h == 0 || pixels.len() != expected {
            return Err(DecodeError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        to_luma_into(pixels, format, &mut self.scratch);
        let luma = &self.scratch;
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| luma[y * w + x]);

        let grids = prepared.detect_grids();
        if grids.is_empty() {
            return Ok(None);
        }

        let mut last_error = None;
        for grid in &grids {
            match grid.decode() {
                Ok((meta, text)) if !text.is_empty() => {
                    tracing::trace!(version = meta.version.0, grids = grids.len(), "QR grid decoded");
                    return Ok(Some(text));
                }
                Ok(_) => {}
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(DecodeError::Unreadable(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_has_no_result() {
        let mut decoder = RqrrDecoder::new();
        let pixels = vec![255u8; 64 * 48 * 4];
        assert_eq!(decoder.decode(&pixels, 64, 48, PixelFormat::Rgba32).unwrap(), None);
    }

    #[test]
    fn test_size_mismatch_is_error() {
        let mut decoder = RqrrDecoder::new();
        let pixels = vec![0u8; 10];
        assert!(matches!(
            decoder.decode(&pixels, 64, 48, PixelFormat::Rgb24),
            Err(DecodeError::BufferSize { expected: 9216, actual: 10 })
        ));
    }

    #[test]
    fn test_zero_dimensions_is_error() {
        let mut decoder = RqrrDecoder::new();
        assert!(decoder.decode(&[], 0, 0, PixelFormat::Luma8).is_err());
    }
}
