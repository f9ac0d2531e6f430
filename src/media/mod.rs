mod ffmpeg;

pub use ffmpeg::{FfmpegVideoReader, FfmpegVideoWriter};

use crate::error::{LaneError, Result};
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// Trait for decoded video inputs
pub trait VideoSource {
    /// Next frame in stream order, `None` once exhausted
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Frame (width, height) declared by the container
    fn resolution(&self) -> (u32, u32);

    fn fps(&self) -> f64;
}

/// Trait for encoded video outputs
pub trait VideoSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close the output. Must be safe to call more than once.
    fn finish(&mut self) -> Result<()>;

    /// Stop without finalizing and remove anything already written
    fn discard(&mut self) -> Result<()>;
}

/// Four-character codec tag, e.g. `mp4v`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fourcc([u8; 4]);

impl Fourcc {
    pub const MP4V: Fourcc = Fourcc(*b"mp4v");

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII alphanumerics
        std::str::from_utf8(&self.0).unwrap_or("mp4v")
    }

    /// ffmpeg encoder used for this tag
    pub fn encoder(&self) -> &'static str {
        match self.as_str().to_ascii_lowercase().as_str() {
            "avc1" | "h264" | "x264" => "libx264",
            "hvc1" | "hev1" | "h265" => "libx265",
            "mjpg" => "mjpeg",
            "vp80" => "libvpx",
            "vp09" => "libvpx-vp9",
            _ => "mpeg4",
        }
    }

    /// Whether the tag can be written into the container as-is
    pub(crate) fn is_container_tag(&self) -> bool {
        matches!(
            self.as_str().to_ascii_lowercase().as_str(),
            "mp4v" | "xvid" | "divx" | "avc1" | "hvc1" | "hev1" | "mjpg"
        )
    }
}

impl Default for Fourcc {
    fn default() -> Self {
        Self::MP4V
    }
}

impl FromStr for Fourcc {
    type Err = LaneError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(LaneError::InvalidInput(format!(
                "codec tag must be four ASCII letters or digits, got '{s}'"
            )));
        }
        Ok(Fourcc([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
