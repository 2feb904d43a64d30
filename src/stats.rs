//! Rolling run statistics.
//!
//! Owned and mutated exclusively by the pipeline loop thread; one update per
//! tick, no sharing across ticks. A concurrent-upload extension would need
//! to put these behind explicit synchronization.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RollingStats {
    pub ticks: u64,
    pub frames_captured: u64,
    pub frames_uploaded: u64,
    pub capture_failures: u64,
    pub encode_failures: u64,
    pub upload_failures: u64,
    /// Failed ticks since the last fully successful one.
    pub consecutive_failures: u64,
    started: Instant,
}

impl RollingStats {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            frames_captured: 0,
            frames_uploaded: 0,
            capture_failures: 0,
            encode_failures: 0,
            upload_failures: 0,
            consecutive_failures: 0,
            started: Instant::now(),
        }
    }

    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn record_capture(&mut self) {
        self.frames_captured += 1;
    }

    pub fn record_capture_failure(&mut self) {
        self.capture_failures += 1;
        self.consecutive_failures += 1;
    }

    pub fn record_encode_failure(&mut self) {
        self.encode_failures += 1;
        self.consecutive_failures += 1;
    }

    pub fn record_upload_failure(&mut self) {
        self.upload_failures += 1;
        self.consecutive_failures += 1;
    }

    pub fn record_upload_success(&mut self) {
        self.frames_uploaded += 1;
        self.consecutive_failures = 0;
    }

    /// Wall time since the loop started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One-line summary for the periodic health log and the shutdown report.
    pub fn summary(&self) -> String {
        format!(
            "ticks={} captured={} uploaded={} capture_failures={} encode_failures={} upload_failures={} consecutive_failures={} uptime={}s",
            self.ticks,
            self.frames_captured,
            self.frames_uploaded,
            self.capture_failures,
            self.encode_failures,
            self.upload_failures,
            self.consecutive_failures,
            self.elapsed().as_secs()
        )
    }
}

impl Default for RollingStats {
    fn default() -> Self {
        Self::new()
    }
}
