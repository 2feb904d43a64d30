//! uplinkd - edge camera uplink daemon
//!
//! This daemon:
//! 1. Resolves configuration from flags and environment
//! 2. Opens the camera once and holds it for the process lifetime
//! 3. Probes the ingestion server (informational only)
//! 4. Runs the capture-encode-upload loop at the target cadence
//! 5. Exits 0 on clean shutdown, 2 on startup failure, 1 when forced

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cam_uplink::{
    Args, CameraSource, LocalStore, Pipeline, UplinkConfig, Uploader, EXIT_CLEAN, EXIT_CRASH,
    EXIT_STARTUP,
};

fn main() {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match startup(args) {
        Ok(mut pipeline) => {
            pipeline.run();
            std::process::exit(EXIT_CLEAN);
        }
        Err(err) => {
            log::error!("startup failed: {:#}", err);
            std::process::exit(EXIT_STARTUP);
        }
    }
}

fn startup(args: Args) -> Result<Pipeline> {
    let config = UplinkConfig::from_args(args)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            // Second signal: the operator insists. Abandon the in-flight tick.
            log::warn!("forced shutdown");
            std::process::exit(EXIT_CRASH);
        }
        log::info!("shutdown requested; finishing the current tick");
    })
    .context("install shutdown handler")?;

    let mut source = CameraSource::open(config.capture.clone())?;
    source
        .connect()
        .with_context(|| format!("camera {} unavailable", config.capture.device))?;

    let uploader = Uploader::new(&config.base_url()?, config.retry.clone(), config.upload_timeout)?;
    uploader.probe();

    let store = if config.save_local {
        let store = LocalStore::create(config.save_dir.clone(), config.retention_cap)?;
        log::info!(
            "saving local copies under {} (cap {})",
            store.dir().display(),
            config.retention_cap
        );
        Some(store)
    } else {
        None
    };

    Ok(Pipeline::new(config, source, uploader, store, shutdown))
}
