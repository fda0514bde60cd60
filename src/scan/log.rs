//! Scan results and the log they are appended to.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// A decoded payload and when it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Decoded payload.
    pub text: String,
    /// Local time the frame was decoded.
    pub captured_at: DateTime<Local>,
}

impl ScanResult {
    /// Creates a result stamped with the current local time.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            captured_at: Local::now(),
        }
    }

    /// Formats the result as a single log line.
    pub fn log_line(&self) -> String {
        format!("[{}] {}", self.captured_at.format("%H:%M:%S"), self.text)
    }
}

/// Receives every successful scan.
pub trait LogSink {
    /// Records one scan.
    fn append(&mut self, result: &ScanResult);

    /// Removes all entries.
    fn clear(&mut self);
}

/// Bounded in-memory scan log, newest entry last.
#[derive(Debug, Clone)]
pub struct ScanLog {
    entries: VecDeque<ScanResult>,
    max_entries: usize,
}

impl ScanLog {
    /// Creates a log holding at most `max_entries` results (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no scans are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &ScanResult> {
        self.entries.iter()
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&ScanResult> {
        self.entries.back()
    }

    /// Renders the log as newline-separated `[HH:MM:SS] text` lines.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ScanResult::log_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ScanLog {
    fn default() -> Self {
        Self::new(100)
    }
}

impl LogSink for ScanLog {
    fn append(&mut self, result: &ScanResult) {
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(result.clone());
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result_at(text: &str, h: u32, m: u32, s: u32) -> ScanResult {
        ScanResult {
            text: text.to_string(),
            captured_at: Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap(),
        }
    }

    #[test]
    fn test_log_line_format() {
        assert_eq!(result_at("ABC123", 9, 5, 7).log_line(), "[09:05:07] ABC123");
    }

    #[test]
    fn test_render_newest_last() {
        let mut log = ScanLog::new(10);
        log.append(&result_at("first", 10, 0, 0));
        log.append(&result_at("second", 10, 0, 1));
        assert_eq!(log.render(), "[10:00:00] first\n[10:00:01] second");
        assert_eq!(log.latest().unwrap().text, "second");
    }

    #[test]
    fn test_oldest_evicted() {
        let mut log = ScanLog::new(2);
        for text in ["a", "b", "c"] {
            log.append(&ScanResult::now(text));
        }
        let texts: Vec<_> = log.entries().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_clear() {
        let mut log = ScanLog::default();
        log.append(&ScanResult::now("x"));
        log.clear();
        assert!(log.is_empty());
    }
}
