//! Luminance conversion for decoder input.

use crate::capture::PixelFormat;

/// BT.601 weights in 8-bit fixed point: Y = (76*R + 150*G + 29*B) >> 8.
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * u32::from(r) + COEF_G * u32::from(g) + COEF_B * u32::from(b)) >> 8) as u8
}

/// Converts `pixels` to 8-bit luminance, reusing `out`'s allocation.
///
/// Alpha is ignored. `out` is left with exactly one byte per whole pixel.
pub fn to_luma_into(pixels: &[u8], format: PixelFormat, out: &mut Vec<u8>) {
    out.clear();
    match format {
        PixelFormat::Luma8 => out.extend_from_slice(pixels),
        PixelFormat::Rgb24 => out.extend(pixels.chunks_exact(3).map(|p| luma(p[0], p[1], p[2]))),
        PixelFormat::Rgba32 => out.extend(pixels.chunks_exact(4).map(|p| luma(p[0], p[1], p[2]))),
    }
}

/// Converts `pixels` to a freshly allocated luminance buffer.
pub fn to_luma(pixels: &[u8], format: PixelFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() / format.bytes_per_pixel());
    to_luma_into(pixels, format, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_weights() {
        assert_eq!(to_luma(&[255, 0, 0], PixelFormat::Rgb24), vec![75]);
        assert_eq!(to_luma(&[0, 255, 0], PixelFormat::Rgb24), vec![149]);
        assert_eq!(to_luma(&[0, 0, 255], PixelFormat::Rgb24), vec![28]);
    }

    #[test]
    fn test_white_and_black() {
        let rgba = [255, 255, 255, 255, 0, 0, 0, 255];
        assert_eq!(to_luma(&rgba, PixelFormat::Rgba32), vec![254, 0]);
    }

    #[test]
    fn test_alpha_ignored() {
        let opaque = to_luma(&[10, 20, 30, 255], PixelFormat::Rgba32);
        let clear = to_luma(&[10, 20, 30, 0], PixelFormat::Rgba32);
        assert_eq!(opaque, clear);
    }

    #[test]
    fn test_luma_passthrough_reuses_buffer() {
        let mut out = vec![9u8; 100];
        to_luma_into(&[1, 2, 3], PixelFormat::Luma8, &mut out);
        assert_eq!(out, vec![1, 2, 3]);
    }
}
