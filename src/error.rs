//! Per-tick error taxonomy.
//!
//! Nothing in this module is fatal. Every variant is caught at the tick
//! boundary, logged with the tick number and elapsed time, and the loop
//! continues. Startup-path failures use `anyhow` instead and terminate the
//! process before the loop begins.

use thiserror::Error;

/// Camera capture failure. The tick is skipped and the camera handle stays
/// open for the next tick.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera not connected; call connect() first")]
    NotConnected,

    #[error("capture on {device} failed: {message}")]
    Device { device: String, message: String },
}

/// Frame-to-PNG encoding failure. Only malformed frame geometry can trigger
/// this; it is never retried.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame has zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error(
        "pixel buffer of {actual} bytes does not match {width}x{height} rgb frame ({expected} bytes)"
    )]
    BufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("png encoder: {0}")]
    Encoder(String),
}

/// Upload failure, classified so the retry policy can tell a dead network
/// from a payload the server will never accept.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Connection refused, DNS failure, or timeout. Transient.
    #[error("network error: {0}")]
    Network(String),

    /// Remote returned 5xx. Transient.
    #[error("server error: status {status}")]
    Server { status: u16, body: String },

    /// Remote returned 4xx. Retrying the same payload cannot succeed.
    #[error("client error: status {status}")]
    Client { status: u16, body: String },
}

impl UploadError {
    /// Whether the retry policy may re-attempt this failure within the tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, UploadError::Network(_) | UploadError::Server { .. })
    }
}

/// Local save failure. Logged by the caller and ignored; a full disk must
/// not take the upload path down with it.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
