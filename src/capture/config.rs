//! Capture and scanning configuration.

use super::device::Facing;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Allowed cooldown range in seconds.
pub const COOLDOWN_RANGE_SECS: RangeInclusive<f32> = 0.5..=10.0;

/// Allowed camera startup timeout in milliseconds.
pub const STARTUP_TIMEOUT_RANGE_MS: RangeInclusive<u64> = 1..=60_000;

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index used when no device matches `facing`.
    pub device_id: u32,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Target frames per second. Also drives the scan tick rate.
    pub fps: u32,
    /// Preferred camera facing.
    pub facing: Facing,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 1280,
            height: 720,
            fps: 30,
            facing: Facing::Back,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Time between scheduler ticks at the configured frame rate.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// What happens to the camera while a cooldown is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CooldownMode {
    /// Stop the camera for the cooldown and resume it afterwards.
    #[default]
    PauseCamera,
    /// Keep capturing and only suspend decode attempts.
    DecodeOnly,
}

/// Configuration for the scan loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Delay after a successful decode before scanning resumes.
    pub cooldown_secs: f32,
    /// Camera handling during cooldown.
    pub cooldown_mode: CooldownMode,
    /// Maximum wait for the camera to start producing frames.
    pub startup_timeout_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 3.0,
            cooldown_mode: CooldownMode::PauseCamera,
            startup_timeout_ms: 5000,
        }
    }
}

impl ScanConfig {
    /// Creates a configuration with the given cooldown in seconds.
    pub fn with_cooldown(cooldown_secs: f32) -> Self {
        Self {
            cooldown_secs,
            ..Default::default()
        }
    }

    /// Cooldown as a `Duration`.
    #[inline]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f32(self.cooldown_secs)
    }

    /// Camera startup timeout as a `Duration`.
    #[inline]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Checks the cooldown and startup timeout against their allowed ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !COOLDOWN_RANGE_SECS.contains(&self.cooldown_secs) {
            return Err(ConfigError::InvalidCooldown(self.cooldown_secs));
        }
        if !STARTUP_TIMEOUT_RANGE_MS.contains(&self.startup_timeout_ms) {
            return Err(ConfigError::InvalidStartupTimeout(self.startup_timeout_ms));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate outside 1-120.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// Cooldown outside [`COOLDOWN_RANGE_SECS`].
    #[error("invalid cooldown {0}s (must be 0.5-10 seconds)")]
    InvalidCooldown(f32),
    /// Startup timeout outside [`STARTUP_TIMEOUT_RANGE_MS`].
    #[error("invalid startup timeout {0}ms (must be 1-60000 ms)")]
    InvalidStartupTimeout(u64),
    /// Facing is neither front nor back.
    #[error("invalid camera facing: {0} (expected \"front\" or \"back\")")]
    InvalidFacing(String),
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[capture]` section.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// `[scan]` section.
    #[serde(default)]
    pub scan: ScanConfig,
    /// `[output]` section.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of scans kept in the on-screen log.
    pub max_log_entries: usize,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_log_entries: 100,
            metrics_port: 9090,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.scan.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(CaptureConfig::default().validate().is_ok());
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_cooldown_bounds() {
        assert!(ScanConfig::with_cooldown(0.5).validate().is_ok());
        assert!(ScanConfig::with_cooldown(10.0).validate().is_ok());
        assert!(matches!(
            ScanConfig::with_cooldown(0.0).validate(),
            Err(ConfigError::InvalidCooldown(_))
        ));
        assert!(matches!(
            ScanConfig::with_cooldown(30.0).validate(),
            Err(ConfigError::InvalidCooldown(_))
        ));
    }

    #[test]
    fn test_tick_interval_from_fps() {
        let mut config = CaptureConfig::default();
        config.fps = 20;
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            width = 640
            height = 480
            facing = "front"

            [scan]
            cooldown_secs = 1.5
            cooldown_mode = "decode-only"
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.width, 640);
        assert_eq!(config.capture.fps, 30);
        assert_eq!(config.capture.facing, Facing::Front);
        assert_eq!(config.scan.cooldown_mode, CooldownMode::DecodeOnly);
        assert_eq!(config.scan.startup_timeout_ms, 5000);
        assert_eq!(config.output.max_log_entries, 100);
    }

    #[test]
    fn test_parse_rejects_out_of_range_cooldown() {
        let result = FileConfig::from_toml("[scan]\ncooldown_secs = 60.0\n");
        assert!(matches!(result, Err(ConfigError::InvalidCooldown(_))));
    }

    #[test]
    fn test_example_config_parses() {
        let config = FileConfig::from_toml(include_str!("../../config/qrscan.example.toml")).unwrap();
        assert_eq!(config.scan.cooldown_mode, CooldownMode::PauseCamera);
        assert_eq!(config.capture.facing, Facing::Back);
    }

    #[test]
    fn test_parse_error_reported() {
        let result = FileConfig::from_toml("[capture\nwidth = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
