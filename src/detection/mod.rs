mod compositor;
pub mod hsv;
mod preprocess;
pub mod types;

pub use compositor::{blend_weighted, draw_lane_lines, LaneDetector};
pub use hsv::{rgb_to_hsv, Hsv};
pub use preprocess::{validate_frame, HsvPreprocessor};
pub use types::{mask_coverage, DetectionOutcome, LaneDetection, Mask, Preprocess, Preprocessed};

use crate::config::DetectorConfig;

/// Create the default detector (HSV threshold + weighted overlay)
pub fn create_default_detector(config: DetectorConfig) -> LaneDetector {
    tracing::info!(
        "Lane detector: HSV {} to {}, blend {} / {} / {}",
        config.color_range.lower,
        config.color_range.upper,
        config.blend.source_weight,
        config.blend.overlay_weight,
        config.blend.gamma
    );
    LaneDetector::new(config)
}
