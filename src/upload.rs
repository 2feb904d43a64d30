//! HTTP delivery.
//!
//! Each upload is a fresh POST; there is no persistent session to maintain,
//! so "reconnecting" after an outage is nothing more than the retry policy
//! applied again on the next tick. Every request carries a bounded timeout;
//! response bodies are read to completion on success and on error so the
//! connection is never left half-drained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::encode::EncodedImage;
use crate::error::UploadError;
use crate::sleep_observing_shutdown;

pub const UPLOAD_PATH: &str = "/upload";
const STATUS_PATH: &str = "/status";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded retry with exponential backoff, applied to transient upload
/// failures within a single tick.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts per frame before the tick is abandoned.
    pub max_attempts: u32,
    /// Backoff after the first failed attempt; doubles per failure.
    pub base_delay: Duration,
    /// Backoff ceiling, so one stalled tick cannot block indefinitely.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after `failed_attempts` consecutive failures
    /// (1-based). Doubles from the base and saturates at the ceiling.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1).min(20);
        let base_ms = self.base_delay.as_millis() as u64;
        let delay = Duration::from_millis(base_ms.saturating_mul(1u64 << exp));
        delay.min(self.max_delay)
    }
}

/// Acknowledgement body the ingestion server sends on success.
#[derive(Debug, Deserialize)]
struct ServerAck {
    total_images: Option<u64>,
}

/// Outcome of a successful delivery.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub status: u16,
    /// Running image total the server reports, when it sends one.
    pub total_images: Option<u64>,
}

/// HTTP uploader for encoded frames.
pub struct Uploader {
    agent: ureq::Agent,
    upload_url: Url,
    status_url: Url,
    policy: RetryPolicy,
}

impl Uploader {
    pub fn new(base: &Url, policy: RetryPolicy, timeout: Duration) -> anyhow::Result<Self> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build();
        Ok(Self {
            agent,
            upload_url: base.join(UPLOAD_PATH)?,
            status_url: base.join(STATUS_PATH)?,
            policy,
        })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    /// One GET against the server's status endpoint, logged either way.
    /// Never fatal: the loop starts whether or not the server is up yet.
    pub fn probe(&self) {
        match self.agent.get(self.status_url.as_str()).timeout(PROBE_TIMEOUT).call() {
            Ok(response) => {
                let status = response.status();
                let body = response.into_string().unwrap_or_default();
                log::info!(
                    "ingestion server reachable at {} (status {}: {})",
                    self.status_url,
                    status,
                    body.trim()
                );
            }
            Err(ureq::Error::Status(status, response)) => {
                let _ = response.into_string();
                log::warn!(
                    "ingestion server at {} answered status {}",
                    self.status_url,
                    status
                );
            }
            Err(err) => {
                log::warn!(
                    "ingestion server not reachable at {}: {}; uploads will retry",
                    self.status_url,
                    err
                );
            }
        }
    }

    /// Single POST attempt, classified for the retry policy.
    pub fn upload_once(&self, image: &EncodedImage) -> Result<UploadReceipt, UploadError> {
        match self
            .agent
            .post(self.upload_url.as_str())
            .set("Content-Type", "image/png")
            .send_bytes(&image.bytes)
        {
            Ok(response) => {
                let status = response.status();
                let body = response.into_string().unwrap_or_default();
                let total_images = serde_json::from_str::<ServerAck>(&body)
                    .ok()
                    .and_then(|ack| ack.total_images);
                Ok(UploadReceipt {
                    status,
                    total_images,
                })
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                if (500..=599).contains(&status) {
                    Err(UploadError::Server { status, body })
                } else {
                    Err(UploadError::Client { status, body })
                }
            }
            // Everything that never reached a status line (refused, DNS,
            // timeout) is transport-level and worth retrying.
            Err(err) => Err(UploadError::Network(err.to_string())),
        }
    }

    /// Deliver one frame with bounded retries. Transient failures back off
    /// and retry up to the policy ceiling; client errors abort the tick at
    /// once, since resending the same payload cannot succeed. Backoff sleeps
    /// observe the shutdown flag.
    pub fn upload(
        &self,
        image: &EncodedImage,
        shutdown: &AtomicBool,
    ) -> Result<UploadReceipt, UploadError> {
        let mut attempt = 1u32;
        loop {
            match self.upload_once(image) {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    log::warn!(
                        "upload attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.policy.max_attempts,
                        err,
                        delay
                    );
                    sleep_observing_shutdown(shutdown, delay);
                    if shutdown.load(Ordering::SeqCst) {
                        return Err(err);
                    }
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        log::warn!(
                            "upload attempt {}/{} failed: {}; retries exhausted",
                            attempt,
                            self.policy.max_attempts,
                            err
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
