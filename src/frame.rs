//! In-memory frames handed from the capture source to the pipeline.

/// A single captured raster image. RGB8, row-major, no padding.
///
/// Produced by the capture source, owned by the pipeline for the duration of
/// one tick, and discarded after encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes.
    pub pixels: Vec<u8>,
    /// Capture sequence number, starting at 1. Monotonic per source; drives
    /// artifact naming.
    pub sequence: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, sequence: u64) -> Self {
        Self {
            width,
            height,
            pixels,
            sequence,
        }
    }

    /// Byte length an RGB8 buffer of the given geometry must have.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}
