//! Synthetic camera backend.
//!
//! `stub://` device paths produce frames without hardware. Pixel content is
//! a pure function of sequence number and geometry, so repeated runs and
//! repeated encodes are reproducible. The special path `stub://flaky` fails
//! every second capture attempt, for exercising skip-tick recovery.

use crate::error::CaptureError;
use crate::frame::Frame;

use super::{CaptureConfig, CaptureStats};

const FLAKY_DEVICE: &str = "stub://flaky";

pub(super) struct StubCamera {
    config: CaptureConfig,
    connected: bool,
    attempts: u64,
    frame_count: u64,
    flaky: bool,
    last_error: Option<String>,
}

impl StubCamera {
    pub(super) fn new(config: CaptureConfig) -> Self {
        let flaky = config.device == FLAKY_DEVICE;
        Self {
            config,
            connected: false,
            attempts: 0,
            frame_count: 0,
            flaky,
            last_error: None,
        }
    }

    pub(super) fn connect(&mut self) -> anyhow::Result<()> {
        self.connected = true;
        log::info!(
            "CameraSource: connected to {} ({}x{}, synthetic)",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub(super) fn capture(&mut self) -> Result<Frame, CaptureError> {
        if !self.connected {
            return Err(CaptureError::NotConnected);
        }

        self.attempts += 1;
        if self.flaky && self.attempts % 2 == 0 {
            let message = "synthetic capture fault".to_string();
            self.last_error = Some(message.clone());
            return Err(CaptureError::Device {
                device: self.config.device.clone(),
                message,
            });
        }

        self.last_error = None;
        self.frame_count += 1;
        let sequence = self.frame_count;
        let pixels = synthetic_pixels(self.config.width, self.config.height, sequence);

        Ok(Frame::new(
            self.config.width,
            self.config.height,
            pixels,
            sequence,
        ))
    }

    pub(super) fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub(super) fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

/// Deterministic test pattern: position and sequence mixed into each channel.
fn synthetic_pixels(width: u32, height: u32, sequence: u64) -> Vec<u8> {
    let len = Frame::expected_len(width, height);
    let mut pixels = vec![0u8; len];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = ((i as u64 + sequence * 7) % 256) as u8;
    }
    pixels
}
