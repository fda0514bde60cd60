//! Display orientation for camera frames.
//!
//! Cameras report a rotation angle and may deliver mirrored images. These
//! helpers turn that into the transform a display surface should apply. No
//! pixels are touched here.

/// Transform to apply when presenting a camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOrientation {
    /// Clockwise rotation in degrees: 0, 90, 180 or 270.
    pub rotation: u16,
    /// Mirror horizontally (front-facing cameras).
    pub mirror_x: bool,
    /// Flip vertically (sources that deliver rows bottom-up).
    pub flip_y: bool,
}

impl DisplayOrientation {
    /// Derives the display transform from camera-reported properties.
    ///
    /// Arbitrary angles snap to the nearest quarter turn.
    pub fn from_camera(rotation_angle: i32, front_facing: bool, vertically_mirrored: bool) -> Self {
        let quarter_turns = ((rotation_angle as f64) / 90.0).round() as i64;
        let rotation = (quarter_turns.rem_euclid(4) * 90) as u16;
        Self {
            rotation,
            mirror_x: front_facing,
            flip_y: vertically_mirrored,
        }
    }

    /// Returns true if width and height trade places on screen.
    #[inline]
    pub fn swaps_dimensions(&self) -> bool {
        self.rotation == 90 || self.rotation == 270
    }

    /// On-screen size of a `width` x `height` frame after rotation.
    pub fn display_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl Default for DisplayOrientation {
    fn default() -> Self {
        Self::from_camera(0, false, false)
    }
}

/// Largest size with the aspect ratio of `src` that fits inside `dst`.
pub fn fit_within(src: (u32, u32), dst: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = src;
    let (dw, dh) = dst;
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return (0, 0);
    }
    // Compare sw/sh against dw/dh without floating point.
    if u64::from(sw) * u64::from(dh) >= u64::from(sh) * u64::from(dw) {
        let h = (u64::from(dw) * u64::from(sh) / u64::from(sw)) as u32;
        (dw, h)
    } else {
        let w = (u64::from(dh) * u64::from(sw) / u64::from(sh)) as u32;
        (w, dh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_normalized() {
        assert_eq!(DisplayOrientation::from_camera(-90, false, false).rotation, 270);
        assert_eq!(DisplayOrientation::from_camera(450, false, false).rotation, 90);
        assert_eq!(DisplayOrientation::from_camera(185, false, false).rotation, 180);
        assert_eq!(DisplayOrientation::from_camera(360, false, false).rotation, 0);
    }

    #[test]
    fn test_front_camera_mirrors() {
        let orientation = DisplayOrientation::from_camera(0, true, true);
        assert!(orientation.mirror_x);
        assert!(orientation.flip_y);
    }

    #[test]
    fn test_display_size_swaps_for_portrait() {
        let orientation = DisplayOrientation::from_camera(90, false, false);
        assert!(orientation.swaps_dimensions());
        assert_eq!(orientation.display_size(1280, 720), (720, 1280));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within((1280, 720), (1000, 1000)), (1000, 562));
        assert_eq!(fit_within((720, 1280), (1000, 1000)), (562, 1000));
        assert_eq!(fit_within((640, 480), (1280, 960)), (1280, 960));
        assert_eq!(fit_within((0, 480), (100, 100)), (0, 0));
    }
}
