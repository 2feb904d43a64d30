//! V4L2 camera backend.
//!
//! Real hardware path for Linux single-board devices. The device handle and
//! its mmap buffer stream are held for the process lifetime and released on
//! drop, so every exit path gives the camera back to the kernel.

use std::time::Duration;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use crate::error::CaptureError;
use crate::frame::Frame;

use super::{CaptureConfig, CaptureStats};

pub(super) struct V4l2Camera {
    config: CaptureConfig,
    state: Option<V4l2State>,
    frame_count: u64,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub(super) fn new(config: CaptureConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            last_error: None,
        })
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera device {}", self.config.device))?;
        let mut format = device.format().context("read camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read camera format after set failure")?
            }
        };

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 2)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );

        // Let the sensor auto-exposure settle before the first real frame.
        if self.config.warmup > Duration::ZERO {
            std::thread::sleep(self.config.warmup);
        }
        Ok(())
    }

    pub(super) fn capture(&mut self) -> Result<Frame, CaptureError> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().ok_or(CaptureError::NotConnected)?;
        let device = self.config.device.clone();
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                CaptureError::Device {
                    device,
                    message: err.to_string(),
                }
            })?;

        self.last_error = None;
        self.frame_count += 1;

        Ok(Frame::new(
            self.active_width,
            self.active_height,
            buf.to_vec(),
            self.frame_count,
        ))
    }

    pub(super) fn is_healthy(&self) -> bool {
        self.last_error.is_none() && self.state.is_some()
    }

    pub(super) fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}
