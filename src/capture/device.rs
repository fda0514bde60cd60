//! Camera device enumeration and selection.

use super::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which way a camera points relative to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing the user.
    Front,
    /// Facing away from the user.
    #[default]
    Back,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => f.write_str("front"),
            Facing::Back => f.write_str("back"),
        }
    }
}

impl FromStr for Facing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(Facing::Front),
            "back" | "rear" | "environment" => Ok(Facing::Back),
            other => Err(ConfigError::InvalidFacing(other.to_string())),
        }
    }
}

/// A camera device reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Platform device index.
    pub index: u32,
    /// Human-readable device name.
    pub name: String,
    /// Camera facing.
    pub facing: Facing,
}

impl DeviceInfo {
    /// Creates a device entry.
    pub fn new(index: u32, name: impl Into<String>, facing: Facing) -> Self {
        Self {
            index,
            name: name.into(),
            facing,
        }
    }

    /// Returns true for user-facing devices.
    #[inline]
    pub fn is_front_facing(&self) -> bool {
        self.facing == Facing::Front
    }
}

/// Picks the device to open.
///
/// Preference order: first device with the `preferred` facing, then the
/// device whose index is `fallback_index`, then the first device listed.
pub fn select_device(
    devices: &[DeviceInfo],
    preferred: Facing,
    fallback_index: u32,
) -> Option<&DeviceInfo> {
    devices
        .iter()
        .find(|d| d.facing == preferred)
        .or_else(|| devices.iter().find(|d| d.index == fallback_index))
        .or_else(|| devices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo::new(0, "Integrated Webcam", Facing::Front),
            DeviceInfo::new(1, "USB Camera", Facing::Back),
            DeviceInfo::new(2, "Capture Card", Facing::Back),
        ]
    }

    #[test]
    fn test_prefers_matching_facing() {
        let devices = devices();
        let selected = select_device(&devices, Facing::Back, 0).unwrap();
        assert_eq!(selected.index, 1);
    }

    #[test]
    fn test_falls_back_to_index() {
        let devices = vec![
            DeviceInfo::new(0, "A", Facing::Back),
            DeviceInfo::new(3, "B", Facing::Back),
        ];
        let selected = select_device(&devices, Facing::Front, 3).unwrap();
        assert_eq!(selected.name, "B");
    }

    #[test]
    fn test_falls_back_to_first() {
        let devices = vec![DeviceInfo::new(5, "Only", Facing::Back)];
        let selected = select_device(&devices, Facing::Front, 0).unwrap();
        assert_eq!(selected.index, 5);
    }

    #[test]
    fn test_no_devices() {
        assert!(select_device(&[], Facing::Back, 0).is_none());
    }

    #[test]
    fn test_parse_facing() {
        assert_eq!("Front".parse::<Facing>().unwrap(), Facing::Front);
        assert_eq!("rear".parse::<Facing>().unwrap(), Facing::Back);
        assert!(matches!(
            "sideways".parse::<Facing>(),
            Err(ConfigError::InvalidFacing(_))
        ));
    }
}
