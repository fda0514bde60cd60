//! Metrics collection and registry.

use crate::scan::{ScanState, ScanStats};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric creation, registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of scan loop state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Current loop state.
    pub state: ScanState,
    /// Lifetime loop counters.
    pub stats: ScanStats,
    /// Decode attempts since the log was last cleared.
    pub session_attempts: u64,
    /// Whether the camera was capturing.
    pub camera_playing: bool,
}

impl MetricsSnapshot {
    /// True if the loop is running and sampling from a live camera.
    ///
    /// A cooldown counts as healthy even with the camera paused.
    pub fn is_healthy(&self) -> bool {
        match self.state {
            ScanState::Idle => false,
            ScanState::Sampling => self.camera_playing,
            ScanState::Cooldown => true,
        }
    }
}

/// Prometheus metrics registry for the scan loop.
pub struct MetricsRegistry {
    registry: Registry,

    state: IntGauge,
    session_attempts: IntGauge,
    camera_playing: IntGauge,

    idle_ticks_total: IntCounter,
    decode_attempts_total: IntCounter,
    scans_total: IntCounter,
    decode_errors_total: IntCounter,
    frame_errors_total: IntCounter,
    buffer_resizes_total: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, MetricsError> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Raises `counter` to `target`. Counters never go down.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let state = gauge(
            &registry,
            "qrscan_state",
            "Scan loop state (0=idle, 1=sampling, 2=cooldown)",
        )?;
        let session_attempts = gauge(
            &registry,
            "qrscan_session_attempts",
            "Decode attempts since the scan log was last cleared",
        )?;
        let camera_playing = gauge(
            &registry,
            "qrscan_camera_playing",
            "Whether the camera is capturing (0 or 1)",
        )?;
        let idle_ticks_total = counter(
            &registry,
            "qrscan_idle_ticks_total",
            "Ticks with no new camera frame",
        )?;
        let decode_attempts_total = counter(
            &registry,
            "qrscan_decode_attempts_total",
            "Frames submitted to the decoder",
        )?;
        let scans_total = counter(&registry, "qrscan_scans_total", "Successful QR scans")?;
        let decode_errors_total = counter(
            &registry,
            "qrscan_decode_errors_total",
            "Decoder failures",
        )?;
        let frame_errors_total = counter(
            &registry,
            "qrscan_frame_errors_total",
            "Frames that could not be read from the camera",
        )?;
        let buffer_resizes_total = counter(
            &registry,
            "qrscan_buffer_resizes_total",
            "Frame buffer reallocations after resolution changes",
        )?;

        Ok(Self {
            registry,
            state,
            session_attempts,
            camera_playing,
            idle_ticks_total,
            decode_attempts_total,
            scans_total,
            decode_errors_total,
            frame_errors_total,
            buffer_resizes_total,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.state.set(snapshot.state.as_gauge());
        self.session_attempts.set(snapshot.session_attempts as i64);
        self.camera_playing.set(i64::from(snapshot.camera_playing));

        let stats = &snapshot.stats;
        advance(&self.idle_ticks_total, stats.idle_ticks);
        advance(&self.decode_attempts_total, stats.decode_attempts);
        advance(&self.scans_total, stats.scans);
        advance(&self.decode_errors_total, stats.decode_errors);
        advance(&self.frame_errors_total, stats.frame_errors);
        advance(&self.buffer_resizes_total, stats.buffer_resizes);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Captures the current state of a scan loop.
    pub fn from_loop<C, D, L>(scanner: &crate::scan::ScanLoop<C, D, L>) -> Self
    where
        C: crate::capture::CameraSource,
        D: crate::decode::Decoder,
        L: crate::scan::LogSink,
    {
        Self {
            state: scanner.state(),
            stats: *scanner.stats(),
            session_attempts: scanner.session_attempts(),
            camera_playing: scanner.camera().is_playing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            state: ScanState::Cooldown,
            stats: ScanStats {
                idle_ticks: 12,
                decode_attempts: 40,
                scans: 2,
                decode_errors: 1,
                frame_errors: 0,
                buffer_resizes: 1,
            },
            session_attempts: 40,
            camera_playing: false,
        };
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("qrscan_state 2"));
        assert!(output.contains("qrscan_decode_attempts_total 40"));
        assert!(output.contains("qrscan_scans_total 2"));
        assert!(output.contains("qrscan_camera_playing 0"));
    }

    #[test]
    fn test_health_follows_state_and_camera() {
        let mut snapshot = MetricsSnapshot::default();
        assert!(!snapshot.is_healthy());

        snapshot.state = ScanState::Sampling;
        assert!(!snapshot.is_healthy());
        snapshot.camera_playing = true;
        assert!(snapshot.is_healthy());

        snapshot.state = ScanState::Cooldown;
        snapshot.camera_playing = false;
        assert!(snapshot.is_healthy());
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();
        let mut snapshot = MetricsSnapshot::default();
        snapshot.stats.scans = 5;
        registry.update(&snapshot);

        snapshot.stats.scans = 3;
        snapshot.session_attempts = 0;
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("qrscan_scans_total 5"));
        assert!(output.contains("qrscan_session_attempts 0"));
    }

    #[test]
    fn test_snapshot_from_loop() {
        use crate::capture::{CameraSource, MockCamera, ScanConfig};
        use crate::decode::RqrrDecoder;
        use crate::scan::{ScanLog, ScanLoop};

        let mut scanner = ScanLoop::new(
            MockCamera::new(),
            RqrrDecoder::new(),
            ScanLog::default(),
            ScanConfig::default(),
        )
        .unwrap();
        scanner.start().unwrap();
        scanner.tick();

        let snapshot = MetricsSnapshot::from_loop(&scanner);
        assert_eq!(snapshot.state, ScanState::Sampling);
        assert_eq!(snapshot.stats.idle_ticks, 1);
        assert!(snapshot.camera_playing);
        assert!(snapshot.is_healthy());

        scanner.camera_mut().stop();
        assert!(!MetricsSnapshot::from_loop(&scanner).is_healthy());
    }
}
