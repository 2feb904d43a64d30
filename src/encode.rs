//! PNG encoding.
//!
//! Encoding is pure: identical pixel data yields byte-identical output, so
//! the server can deduplicate and tests can compare buffers directly. A
//! malformed frame is a skip-this-tick event, never retried and never fatal.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::EncodeError;
use crate::frame::Frame;

/// An encoded frame: PNG bytes plus the artifact name derived from the
/// capture sequence number. Lives for one tick.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub name: String,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Artifact name for a capture sequence number, used for local copies and
/// upload log lines.
pub fn artifact_name(sequence: u64) -> String {
    format!("frame_{:06}.png", sequence)
}

/// Encode an RGB8 frame as PNG.
pub fn encode_png(frame: &Frame) -> Result<EncodedImage, EncodeError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(EncodeError::ZeroDimension {
            width: frame.width,
            height: frame.height,
        });
    }
    let expected = Frame::expected_len(frame.width, frame.height);
    if frame.pixels.len() != expected {
        return Err(EncodeError::BufferMismatch {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.pixels.len(),
        });
    }

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| EncodeError::Encoder(err.to_string()))?;

    Ok(EncodedImage {
        bytes,
        name: artifact_name(frame.sequence),
    })
}
