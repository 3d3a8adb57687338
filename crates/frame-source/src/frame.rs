//! Frame and monitor data structures

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{SourceError, SourceResult};

/// Pixel format of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// BGRA 8-bit per channel (what desktop duplication produces)
    Bgra8,
    /// RGBA 8-bit per channel
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
        }
    }
}

/// One capturable display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    /// Position in the enumeration that produced this entry; valid only
    /// until the next enumeration
    pub index: usize,
    /// Device name as reported by the platform
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl MonitorInfo {
    pub fn new(
        index: usize,
        name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> SourceResult<Self> {
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidDimensions { width, height });
        }
        Ok(Self {
            index,
            name: name.into(),
            width,
            height,
        })
    }
}

/// One captured frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data, exactly `width * height * bytes_per_pixel` long
    pub data: Bytes,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Epoch milliseconds, stamped at emission by the session
    pub timestamp_ms: u64,
    /// Frame sequence number, assigned by the session
    pub sequence: u64,
    /// Monitor this frame was captured from
    pub monitor_index: usize,
}

impl Frame {
    /// Build a frame, validating the buffer against the stated dimensions.
    ///
    /// Timestamp and sequence start at zero; the session assigns both when
    /// the frame is emitted.
    pub fn new(
        data: Bytes,
        width: u32,
        height: u32,
        format: PixelFormat,
        monitor_index: usize,
    ) -> SourceResult<Self> {
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(SourceError::BufferMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            timestamp_ms: 0,
            sequence: 0,
            monitor_index,
        })
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
