//! Edge camera uplink.
//!
//! Long-running client for unattended single-board devices: captures frames
//! from a local camera, encodes them to PNG, and delivers them to a remote
//! ingestion server over HTTP at a fixed cadence, tolerating transient
//! camera and network failures indefinitely. An external supervisor starts
//! the `uplinkd` binary and restarts it on non-zero exit.
//!
//! # Module Structure
//!
//! - `capture`: camera sources (V4L2 device, synthetic stub)
//! - `encode`: PNG encoding
//! - `upload`: HTTP delivery with bounded retry/backoff
//! - `store`: optional local copies with bounded retention
//! - `pipeline`: the capture-encode-upload loop
//! - `config`, `stats`, `error`: run configuration, rolling counters,
//!   per-tick error taxonomy

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub mod capture;
pub mod config;
pub mod encode;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod upload;

pub use capture::{CameraSource, CaptureConfig, CaptureStats};
pub use config::{Args, UplinkConfig};
pub use encode::{artifact_name, encode_png, EncodedImage};
pub use error::{CaptureError, EncodeError, SaveError, UploadError};
pub use frame::Frame;
pub use pipeline::{Pipeline, TickOutcome};
pub use stats::RollingStats;
pub use store::LocalStore;
pub use upload::{RetryPolicy, UploadReceipt, Uploader};

/// Clean shutdown after a termination request.
pub const EXIT_CLEAN: i32 = 0;
/// Forced shutdown or unexpected failure; the supervisor should restart.
pub const EXIT_CRASH: i32 = 1;
/// Fatal startup error (bad configuration, camera unavailable at boot);
/// restarting without intervention will fail the same way.
pub const EXIT_STARTUP: i32 = 2;

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Sleep for `duration`, waking early if the shutdown flag is set. Sleeps
/// are sliced so cancellation is observed within one poll interval; this is
/// what bounds shutdown latency during cadence and backoff waits.
pub fn sleep_observing_shutdown(shutdown: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while !shutdown.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        std::thread::sleep(remaining.min(SHUTDOWN_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn sleep_runs_to_the_deadline_when_not_interrupted() {
        let shutdown = AtomicBool::new(false);
        let start = Instant::now();
        sleep_observing_shutdown(&shutdown, Duration::from_millis(120));
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn sleep_wakes_early_on_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            flag.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        sleep_observing_shutdown(&shutdown, Duration::from_secs(10));
        let woke_after = start.elapsed();
        setter.join().expect("setter thread");

        assert!(woke_after < Duration::from_secs(1), "woke after {:?}", woke_after);
    }
}
