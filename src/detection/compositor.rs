use super::preprocess::HsvPreprocessor;
use super::types::{
    count_lane_pixels, mask_coverage, DetectionOutcome, LaneDetection, Mask, Preprocess,
};
use crate::config::{BlendParams, DetectorConfig};
use crate::error::{LaneError, Result};
use image::{DynamicImage, GrayImage, RgbImage};

/// Overlays lane candidates found by a [`Preprocess`] stage onto the frame
pub struct LaneDetector {
    preprocessor: Box<dyn Preprocess>,
    blend: BlendParams,
}

impl LaneDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_preprocessor(
            Box::new(HsvPreprocessor::new(config.color_range, config.highlight)),
            config.blend,
        )
    }

    pub fn with_preprocessor(preprocessor: Box<dyn Preprocess>, blend: BlendParams) -> Self {
        Self {
            preprocessor,
            blend,
        }
    }

    /// Detect lanes in a frame
    ///
    /// Never fails. If any stage errors the original frame comes back
    /// untouched together with an all-zero mask and a `Degraded` outcome.
    pub fn detect_lane(&self, frame: &DynamicImage) -> LaneDetection {
        let _span = tracing::debug_span!("detect_lane").entered();

        match self.run(frame) {
            Ok((annotated, mask)) => {
                let lane_pixels = count_lane_pixels(&mask);
                tracing::debug!(
                    "Lane candidates: {} px ({:.2}%)",
                    lane_pixels,
                    mask_coverage(&mask) * 100.0
                );
                LaneDetection {
                    annotated: DynamicImage::ImageRgb8(annotated),
                    mask,
                    outcome: DetectionOutcome::Detected { lane_pixels },
                }
            }
            Err(e) => {
                tracing::warn!("Lane detection failed, passing frame through: {}", e);
                LaneDetection {
                    annotated: frame.clone(),
                    mask: GrayImage::new(frame.width(), frame.height()),
                    outcome: DetectionOutcome::Degraded {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    /// Detect lanes in a decoded video frame
    ///
    /// Returns the annotated frame as RGB so it can go straight to a video sink.
    pub fn detect_frame(&self, frame: RgbImage) -> (RgbImage, Mask, DetectionOutcome) {
        let detection = self.detect_lane(&DynamicImage::ImageRgb8(frame));
        let annotated = match detection.annotated {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        (annotated, detection.mask, detection.outcome)
    }

    fn run(&self, frame: &DynamicImage) -> Result<(RgbImage, Mask)> {
        let processed = self.preprocessor.preprocess(frame)?;

        let _span = tracing::debug_span!("composite").entered();

        let source = frame.to_rgb8();
        let canvas = RgbImage::new(source.width(), source.height());
        let lane_layer = draw_lane_lines(processed.visualization, &canvas)?;

        let annotated = blend_weighted(
            &source,
            self.blend.source_weight,
            &lane_layer,
            self.blend.overlay_weight,
            self.blend.gamma,
        )?;

        Ok((annotated, processed.mask))
    }
}

impl Default for LaneDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

/// Render the lane-line layer
///
/// No line fitting happens yet: the tinted visualization is the layer.
/// The blank canvas fixes the geometry a fitted overlay would be drawn into.
pub fn draw_lane_lines(visualization: RgbImage, canvas: &RgbImage) -> Result<RgbImage> {
    if visualization.dimensions() != canvas.dimensions() {
        return Err(LaneError::Detection(format!(
            "lane layer is {:?} but canvas is {:?}",
            visualization.dimensions(),
            canvas.dimensions()
        )));
    }
    Ok(visualization)
}

/// Saturating per-channel `src * alpha + overlay * beta + gamma`
pub fn blend_weighted(
    src: &RgbImage,
    alpha: f32,
    overlay: &RgbImage,
    beta: f32,
    gamma: f32,
) -> Result<RgbImage> {
    if src.dimensions() != overlay.dimensions() {
        return Err(LaneError::Detection(format!(
            "cannot blend {:?} with {:?}",
            src.dimensions(),
            overlay.dimensions()
        )));
    }

    let data: Vec<u8> = src
        .as_raw()
        .iter()
        .zip(overlay.as_raw())
        .map(|(&a, &b)| {
            let value = a as f32 * alpha + b as f32 * beta + gamma;
            value.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    RgbImage::from_raw(src.width(), src.height(), data)
        .ok_or_else(|| LaneError::Detection("blend produced a short buffer".into()))
}
