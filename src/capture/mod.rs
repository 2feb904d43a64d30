//! Camera sources.
//!
//! One adapter type, `CameraSource`, in front of the concrete backends:
//! - V4L2 devices (feature: capture-v4l2)
//! - Synthetic stub sources (`stub://` paths, for tests and camera-less hosts)
//!
//! The source owns the camera handle for the process lifetime: opened once at
//! startup, released when the source is dropped. A failed capture must leave
//! the handle usable on the next tick; backends clear their error state on
//! the next successful read rather than tearing the device down.

mod stub;
#[cfg(feature = "capture-v4l2")]
mod v4l2;

use std::time::Duration;

use anyhow::Result;
#[cfg(not(feature = "capture-v4l2"))]
use anyhow::anyhow;

use crate::error::CaptureError;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Device path (e.g., "/dev/video0"), or "stub://..." for a synthetic
    /// source.
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Settle time after opening the hardware before the first frame is
    /// trusted. Ignored by stub sources.
    pub warmup: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            width: 640,
            height: 480,
            warmup: Duration::from_secs(2),
        }
    }
}

/// Camera source.
///
/// Backend is selected from the device path: `stub://` paths get a synthetic
/// source, anything else a V4L2 device.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Stub(stub::StubCamera),
    #[cfg(feature = "capture-v4l2")]
    Device(v4l2::V4l2Camera),
}

impl CameraSource {
    pub fn open(config: CaptureConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Stub(stub::StubCamera::new(config)),
            })
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(v4l2::V4l2Camera::new(config)?),
                })
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                Err(anyhow!(
                    "device {} requires the capture-v4l2 feature",
                    config.device
                ))
            }
        }
    }

    /// Acquire the hardware and let it settle.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Stub(source) => source.connect(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Capture one frame.
    pub fn capture(&mut self) -> Result<Frame, CaptureError> {
        match &mut self.backend {
            CameraBackend::Stub(source) => source.capture(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.capture(),
        }
    }

    /// Check if the source is healthy (the last capture did not error out).
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Stub(source) => source.is_healthy(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CaptureStats {
        match &self.backend {
            CameraBackend::Stub(source) => source.stats(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub device: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CaptureConfig {
        CaptureConfig {
            device: "stub://test".to_string(),
            width: 640,
            height: 480,
            warmup: Duration::ZERO,
        }
    }

    #[test]
    fn stub_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::open(stub_config())?;
        source.connect()?;

        let frame = source.capture()?;
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(
            frame.pixels.len(),
            Frame::expected_len(frame.width, frame.height)
        );
        assert_eq!(frame.sequence, 1);

        Ok(())
    }

    #[test]
    fn stub_source_sequences_are_monotonic() -> Result<()> {
        let mut source = CameraSource::open(stub_config())?;
        source.connect()?;

        let first = source.capture()?;
        let second = source.capture()?;
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(source.stats().frames_captured, 2);

        Ok(())
    }

    #[test]
    fn stub_source_frames_are_deterministic_per_sequence() -> Result<()> {
        let mut a = CameraSource::open(stub_config())?;
        a.connect()?;
        let mut b = CameraSource::open(stub_config())?;
        b.connect()?;

        assert_eq!(a.capture()?, b.capture()?);
        assert_eq!(a.capture()?, b.capture()?);

        Ok(())
    }

    #[test]
    fn capture_before_connect_is_rejected() -> Result<()> {
        let mut source = CameraSource::open(stub_config())?;
        assert!(matches!(
            source.capture(),
            Err(CaptureError::NotConnected)
        ));
        Ok(())
    }

    #[test]
    fn flaky_stub_recovers_after_a_failed_capture() -> Result<()> {
        let mut source = CameraSource::open(CaptureConfig {
            device: "stub://flaky".to_string(),
            ..stub_config()
        })?;
        source.connect()?;

        assert!(source.capture().is_ok());
        assert!(source.capture().is_err());
        assert!(!source.is_healthy());
        // The failure must not poison the handle.
        assert!(source.capture().is_ok());
        assert!(source.is_healthy());

        Ok(())
    }
}
