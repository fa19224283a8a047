use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Pixel layout of a raw camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// 8-bit grayscale, one byte per pixel
    Gray8,
    /// Packed RGB, three bytes per pixel
    Rgb24,
    /// YUV 4:2:2, two bytes per pixel
    Yuyv,
    /// Motion JPEG, compressed
    Mjpeg,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Gray8 => 1,
            FrameFormat::Rgb24 => 3,
            FrameFormat::Yuyv => 2,
            FrameFormat::Mjpeg => 0, // Variable size, compressed
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFormat::Gray8 => "gray8",
            FrameFormat::Rgb24 => "rgb24",
            FrameFormat::Yuyv => "yuyv",
            FrameFormat::Mjpeg => "mjpeg",
        }
    }
}

/// Camera image delivered alongside a landmark frame for integrity checks
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame identifier assigned by the source
    pub id: u64,
    /// Capture time
    pub timestamp: SystemTime,
    /// Pixel data (shared so the frame can fan out without copying)
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    /// Device identifier reported by the capture stack, if any
    pub device_id: Option<String>,
}

impl RawFrame {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
            device_id: None,
        }
    }

    pub fn with_device_id<S: Into<String>>(mut self, device_id: S) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }

    /// No pixels, no dimensions, or a buffer that does not match them
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0 || !self.validate_size()
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Check if frame is older than specified duration
    pub fn is_older_than(&self, duration: Duration) -> bool {
        SystemTime::now()
            .duration_since(self.timestamp)
            .map(|age| age > duration)
            .unwrap_or(false)
    }
}
