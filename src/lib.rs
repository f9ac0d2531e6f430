//! Yellow lane-marking detection for still images and video.
//!
//! Frames are thresholded in HSV space, candidate pixels are tinted and
//! blended back onto the source, and a binary mask is produced alongside.

pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod media;
pub mod pipeline;

pub use config::{BlendParams, ColorRange, DetectorConfig};
pub use detection::{create_default_detector, DetectionOutcome, LaneDetection, LaneDetector};
pub use error::{ErrorKind, LaneError, Result};
