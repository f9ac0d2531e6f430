use crate::error::Result;
use image::{DynamicImage, GrayImage, RgbImage};

/// Binary lane-candidate mask: 0 = background, 255 = candidate.
/// Dimensions always match the source frame.
pub type Mask = GrayImage;

pub const MASK_ON: u8 = 255;

/// Output of a preprocessing pass
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Copy of the input with candidate pixels tinted
    pub visualization: RgbImage,
    pub mask: Mask,
}

/// Trait for the mask-producing stage
/// Allows swapping the color heuristic for other candidate extractors
pub trait Preprocess {
    /// Turn a color frame into a visualization and a candidate mask
    ///
    /// # Errors
    /// * `LaneError::InvalidInput` for empty frames or layouts without
    ///   exactly three channels
    fn preprocess(&self, frame: &DynamicImage) -> Result<Preprocessed>;
}

/// How a detection call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// The pipeline ran; `lane_pixels` may be zero
    Detected { lane_pixels: u64 },
    /// Something failed and the original frame was passed through
    Degraded { reason: String },
}

impl DetectionOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, DetectionOutcome::Degraded { .. })
    }
}

/// Result of `LaneDetector::detect_lane`
#[derive(Debug, Clone)]
pub struct LaneDetection {
    pub annotated: DynamicImage,
    pub mask: Mask,
    pub outcome: DetectionOutcome,
}

/// Fraction of mask pixels marked as lane candidates
pub fn mask_coverage(mask: &Mask) -> f32 {
    let total = mask.width() as u64 * mask.height() as u64;
    if total == 0 {
        return 0.0;
    }
    count_lane_pixels(mask) as f32 / total as f32
}

pub(crate) fn count_lane_pixels(mask: &Mask) -> u64 {
    mask.as_raw().iter().filter(|&&v| v == MASK_ON).count() as u64
}
