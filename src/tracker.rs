//! Run Tracker Module
//!
//! Counts successful handshakes and times the whole run. The start and end
//! timestamps are each captured once; every derived figure comes from them.

use serde::Serialize;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Counter and timing sample for one run
#[derive(Debug)]
pub struct RunTracker {
    total: usize,
    succeeded: u64,
    failed: u64,
    started_at: Option<Instant>,
}

impl RunTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
            started_at: None,
        }
    }

    /// Capture the start timestamp. Later calls keep the first one.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Record a completed handshake and return the new success count
    pub fn record_success(&mut self) -> u64 {
        debug_assert!(
            self.succeeded + self.failed < self.total as u64,
            "more outcomes than configured attempts"
        );
        self.succeeded += 1;
        self.succeeded
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Capture the end timestamp and derive the run summary
    pub fn finish(&self) -> RunSummary {
        let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        RunSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            elapsed,
        }
    }
}

/// Final figures of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    succeeded: u64,
    failed: u64,
    cost_ms: u64,
    per_ms: f64,
    throughput: f64,
    succeeded_per_sec: f64,
}

impl RunSummary {
    /// Elapsed time in whole milliseconds
    pub fn cost_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Mean milliseconds per configured connection
    pub fn per_ms(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.elapsed_ms() / self.total as f64
    }

    /// Configured connections per second over the whole run.
    ///
    /// Divides the configured total, so failed attempts still count.
    pub fn throughput(&self) -> f64 {
        self.rate(self.total as f64)
    }

    /// Successful handshakes per second over the whole run
    pub fn succeeded_per_sec(&self) -> f64 {
        self.rate(self.succeeded as f64)
    }

    fn rate(&self, count: f64) -> f64 {
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms <= 0.0 {
            return 0.0;
        }
        count * 1000.0 / elapsed_ms
    }

    /// Write the three summary lines: `cost:`, `per:` and `throughput:`
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "cost:{}", self.cost_ms())?;
        writeln!(out, "per:{}", self.per_ms())?;
        writeln!(out, "throughput:{}", self.throughput())?;
        Ok(())
    }

    /// Write the summary as a single JSON object
    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let json = JsonSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            cost_ms: self.cost_ms(),
            per_ms: self.per_ms(),
            throughput: self.throughput(),
            succeeded_per_sec: self.succeeded_per_sec(),
        };
        serde_json::to_writer_pretty(&mut *out, &json)?;
        writeln!(out)
    }

    pub fn log_summary(&self) {
        log::info!(
            "Run complete: {}/{} handshakes succeeded, {} failed, cost={}ms per={:.3}ms throughput={:.1}/s succeeded={:.1}/s",
            self.succeeded,
            self.total,
            self.failed,
            self.cost_ms(),
            self.per_ms(),
            self.throughput(),
            self.succeeded_per_sec()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_tracker() {
        let tracker = RunTracker::new(6000);
        assert_eq!(tracker.succeeded(), 0);
        assert_eq!(tracker.failed(), 0);
        assert_eq!(tracker.total(), 6000);
    }

    #[test]
    fn test_record_success_increments_by_one() {
        let mut tracker = RunTracker::new(3);
        assert_eq!(tracker.record_success(), 1);
        assert_eq!(tracker.record_success(), 2);
        tracker.record_failure();
        assert_eq!(tracker.succeeded(), 2);
        assert_eq!(tracker.failed(), 1);
    }

    #[test]
    fn test_finish_without_start_is_zero() {
        let summary = RunTracker::new(10).finish();
        assert_eq!(summary.elapsed, Duration::ZERO);
        assert_eq!(summary.throughput(), 0.0);
    }

    #[test]
    fn test_start_is_captured_once() {
        let mut tracker = RunTracker::new(1);
        tracker.start();
        thread::sleep(Duration::from_millis(5));
        tracker.start();
        assert!(tracker.finish().elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_summary_figures() {
        let summary = RunSummary {
            total: 4,
            succeeded: 4,
            failed: 0,
            elapsed: Duration::from_millis(200),
        };
        assert_eq!(summary.cost_ms(), 200);
        assert!((summary.per_ms() - 50.0).abs() < 1e-9);
        assert!((summary.throughput() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_succeeded_rate_ignores_failures() {
        let summary = RunSummary {
            total: 4,
            succeeded: 1,
            failed: 3,
            elapsed: Duration::from_millis(200),
        };
        assert!((summary.throughput() - 20.0).abs() < 1e-9);
        assert!((summary.succeeded_per_sec() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total() {
        let summary = RunSummary {
            total: 0,
            succeeded: 0,
            failed: 0,
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(summary.per_ms(), 0.0);
        assert_eq!(summary.throughput(), 0.0);
    }
}
