//! Scan loop states and per-tick outcomes.

use super::ScanResult;
use std::fmt;

/// Lifecycle state of the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Not running.
    #[default]
    Idle,
    /// Polling the camera and decoding new frames.
    Sampling,
    /// A code was just decoded; decoding is suspended.
    Cooldown,
}

impl ScanState {
    /// Numeric code used by the metrics gauge.
    pub fn as_gauge(self) -> i64 {
        match self {
            ScanState::Idle => 0,
            ScanState::Sampling => 1,
            ScanState::Cooldown => 2,
        }
    }

    /// True in Sampling and Cooldown.
    #[inline]
    pub fn is_running(self) -> bool {
        self != ScanState::Idle
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Sampling => "sampling",
            ScanState::Cooldown => "cooldown",
        };
        f.write_str(name)
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is not running.
    Idle,
    /// No new frame since the previous tick.
    NoFrame,
    /// A frame was sampled but nothing was decoded.
    NoResult,
    /// A code was decoded and cooldown began.
    Decoded(ScanResult),
    /// Cooldown still in progress.
    CoolingDown,
    /// Cooldown ended; sampling resumes on the next tick.
    Resumed,
    /// Cooldown ended but the camera could not be resumed; retried next tick.
    ResumeFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_values_distinct() {
        assert_eq!(ScanState::Idle.as_gauge(), 0);
        assert_eq!(ScanState::Sampling.as_gauge(), 1);
        assert_eq!(ScanState::Cooldown.as_gauge(), 2);
        assert!(!ScanState::default().is_running());
    }
}
