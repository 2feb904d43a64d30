//! The delivery pipeline: the capture-encode-upload loop.
//!
//! One logical thread of control. Each tick runs its phases to completion
//! (capture, encode, optional local save, upload with bounded retries)
//! before the cadence sleep begins, so at most one upload is ever
//! outstanding and frames leave the device in strict capture order. Ticks
//! share nothing but the camera handle and `RollingStats`, both touched only
//! by the loop thread.
//!
//! Nothing below the tick boundary terminates the process: every per-tick
//! failure is classified, logged, counted, and the loop moves on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::CameraSource;
use crate::config::UplinkConfig;
use crate::encode::encode_png;
use crate::sleep_observing_shutdown;
use crate::stats::RollingStats;
use crate::store::LocalStore;
use crate::upload::{UploadReceipt, Uploader};

const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

/// What one tick ended as. Failures are already logged and counted by the
/// time the outcome is returned.
#[derive(Debug)]
pub enum TickOutcome {
    Uploaded(UploadReceipt),
    CaptureFailed,
    EncodeFailed,
    UploadFailed,
}

pub struct Pipeline {
    config: UplinkConfig,
    source: CameraSource,
    uploader: Uploader,
    store: Option<LocalStore>,
    stats: RollingStats,
    shutdown: Arc<AtomicBool>,
    last_summary: Instant,
}

impl Pipeline {
    pub fn new(
        config: UplinkConfig,
        source: CameraSource,
        uploader: Uploader,
        store: Option<LocalStore>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            source,
            uploader,
            store,
            stats: RollingStats::new(),
            shutdown,
            last_summary: Instant::now(),
        }
    }

    pub fn stats(&self) -> &RollingStats {
        &self.stats
    }

    /// Run ticks at the target cadence until the shutdown flag is set.
    ///
    /// The cadence sleep is `period - elapsed`, floored at zero: a tick that
    /// overruns its period (slow camera, slow network) is followed
    /// immediately by the next one, with no catch-up burst. Sleeps are
    /// sliced so a shutdown request is observed within tens of milliseconds.
    pub fn run(&mut self) {
        let period = self.config.frame_period();
        log::info!(
            "capture loop running at {} fps, uploading to {}",
            self.config.fps,
            self.uploader.upload_url()
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            let outcome = self.tick();
            let elapsed = tick_start.elapsed();
            log::debug!(
                "tick {}: {:?} in {}ms",
                self.stats.ticks,
                outcome,
                elapsed.as_millis()
            );
            self.maybe_log_summary();

            if elapsed < period {
                sleep_observing_shutdown(&self.shutdown, period - elapsed);
            } else {
                log::warn!(
                    "tick {} took {}ms, longer than the {}ms period; starting next tick immediately",
                    self.stats.ticks,
                    elapsed.as_millis(),
                    period.as_millis()
                );
            }
        }

        log::info!("capture loop stopped; {}", self.stats.summary());
    }

    /// Run one tick: capture, encode, optional local save, upload.
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.record_tick();
        let tick = self.stats.ticks;

        let frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("tick {}: capture failed: {}", tick, err);
                self.stats.record_capture_failure();
                return TickOutcome::CaptureFailed;
            }
        };
        self.stats.record_capture();

        let image = match encode_png(&frame) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("tick {}: encode failed: {}", tick, err);
                self.stats.record_encode_failure();
                return TickOutcome::EncodeFailed;
            }
        };

        // Local copies are best-effort; the upload happens regardless.
        if let Some(store) = self.store.as_mut() {
            match store.save(&image) {
                Ok(path) => log::debug!("tick {}: saved local copy {}", tick, path.display()),
                Err(err) => log::warn!("tick {}: local save failed: {}", tick, err),
            }
        }

        match self.uploader.upload(&image, &self.shutdown) {
            Ok(receipt) => {
                self.stats.record_upload_success();
                match receipt.total_images {
                    Some(total) => log::debug!(
                        "tick {}: uploaded {} ({} bytes, server total {})",
                        tick,
                        image.name,
                        image.len(),
                        total
                    ),
                    None => log::debug!(
                        "tick {}: uploaded {} ({} bytes)",
                        tick,
                        image.name,
                        image.len()
                    ),
                }
                TickOutcome::Uploaded(receipt)
            }
            Err(err) => {
                log::warn!("tick {}: upload abandoned: {}", tick, err);
                self.stats.record_upload_failure();
                TickOutcome::UploadFailed
            }
        }
    }

    fn maybe_log_summary(&mut self) {
        if self.last_summary.elapsed() >= SUMMARY_INTERVAL {
            log::info!(
                "{} (camera {}, healthy={})",
                self.stats.summary(),
                self.source.stats().device,
                self.source.is_healthy()
            );
            self.last_summary = Instant::now();
        }
    }
}
