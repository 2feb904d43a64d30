//! Startup configuration.
//!
//! Resolved once from command-line flags and environment variables, validated
//! before the loop starts, and immutable for the life of the process. An
//! invalid combination (fps <= 0, zero geometry, a retry ceiling of zero)
//! fails fast with a diagnostic instead of entering the loop.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use url::Url;

use crate::capture::CaptureConfig;
use crate::upload::RetryPolicy;

const DEFAULT_HOST: &str = "ingest-host";
const DEFAULT_PORT: u16 = 5050;
const DEFAULT_FPS: f64 = 1.0;
const DEFAULT_DEVICE: &str = "stub://camera";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_SAVE_DIR: &str = "captured_frames";
const DEFAULT_RETENTION_CAP: usize = 1000;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WARMUP_SECS: u64 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Edge camera uplink daemon")]
pub struct Args {
    /// Hostname or IP of the ingestion server.
    #[arg(long, env = "UPLINK_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// TCP port of the ingestion server.
    #[arg(long, env = "UPLINK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Frames per second to capture.
    #[arg(long, env = "UPLINK_FPS", default_value_t = DEFAULT_FPS)]
    pub fps: f64,

    /// Keep a local copy of every encoded frame.
    #[arg(long, env = "UPLINK_SAVE_LOCAL")]
    pub save_local: bool,

    /// Directory for local copies.
    #[arg(long, env = "UPLINK_SAVE_DIR", default_value = DEFAULT_SAVE_DIR)]
    pub save_dir: PathBuf,

    /// Most local copies to keep; oldest are pruned first.
    #[arg(long, env = "UPLINK_RETENTION_CAP", default_value_t = DEFAULT_RETENTION_CAP)]
    pub retention_cap: usize,

    /// Camera device path (stub:// for a synthetic source).
    #[arg(long, env = "UPLINK_DEVICE", default_value = DEFAULT_DEVICE)]
    pub device: String,

    /// Preferred capture width.
    #[arg(long, env = "UPLINK_WIDTH", default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Preferred capture height.
    #[arg(long, env = "UPLINK_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Upload attempts per frame before the tick is abandoned.
    #[arg(long, env = "UPLINK_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Log every tick's timing and outcome.
    #[arg(long, env = "UPLINK_VERBOSE")]
    pub verbose: bool,
}

/// Resolved run configuration.
#[derive(Clone, Debug)]
pub struct UplinkConfig {
    pub host: String,
    pub port: u16,
    pub fps: f64,
    pub save_local: bool,
    pub save_dir: PathBuf,
    pub retention_cap: usize,
    pub verbose: bool,
    pub capture: CaptureConfig,
    pub retry: RetryPolicy,
    pub upload_timeout: Duration,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            fps: DEFAULT_FPS,
            save_local: false,
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            retention_cap: DEFAULT_RETENTION_CAP,
            verbose: false,
            capture: CaptureConfig::default(),
            retry: RetryPolicy::default(),
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        }
    }
}

impl UplinkConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let cfg = Self {
            host: args.host,
            port: args.port,
            fps: args.fps,
            save_local: args.save_local,
            save_dir: args.save_dir,
            retention_cap: args.retention_cap,
            verbose: args.verbose,
            capture: CaptureConfig {
                device: args.device,
                width: args.width,
                height: args.height,
                warmup: Duration::from_secs(DEFAULT_WARMUP_SECS),
            },
            retry: RetryPolicy {
                max_attempts: args.max_retries,
                ..RetryPolicy::default()
            },
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(anyhow!(
                "fps must be a positive number (got {})",
                self.fps
            ));
        }
        if self.port == 0 {
            return Err(anyhow!("port must be nonzero"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!(
                "capture geometry must be nonzero (got {}x{})",
                self.capture.width,
                self.capture.height
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("max retries must be at least 1"));
        }
        if self.save_local && self.retention_cap == 0 {
            return Err(anyhow!("retention cap must be at least 1"));
        }
        self.base_url()?;
        Ok(())
    }

    /// Base URL of the ingestion server; endpoint paths are joined onto it.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&format!("http://{}:{}/", self.host, self.port))
            .with_context(|| format!("invalid server address {}:{}", self.host, self.port))
    }

    /// Target time between tick starts.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }
}
