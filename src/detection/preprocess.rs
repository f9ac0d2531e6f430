use super::hsv::{self, Hsv};
use super::types::{Mask, Preprocess, Preprocessed, MASK_ON};
use crate::config::ColorRange;
use crate::error::{LaneError, Result};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Color-threshold preprocessor for painted lane markings
pub struct HsvPreprocessor {
    range: ColorRange,
    highlight: Rgb<u8>,
}

impl HsvPreprocessor {
    pub fn new(range: ColorRange, highlight: Rgb<u8>) -> Self {
        Self { range, highlight }
    }

    /// Threshold an already validated RGB frame
    ///
    /// Steps:
    /// 1. Convert to HSV
    /// 2. Mark pixels inside the color range with 255
    /// 3. Copy the frame and paint marked pixels with the highlight color
    pub fn threshold(&self, frame: &RgbImage) -> Preprocessed {
        let hsv = hsv::convert_frame(frame);

        let mask: Mask = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let Rgb([h, s, v]) = *hsv.get_pixel(x, y);
            if self.range.contains(Hsv::new(h, s, v)) {
                Luma([MASK_ON])
            } else {
                Luma([0])
            }
        });

        let mut visualization = frame.clone();
        for (pixel, marked) in visualization.pixels_mut().zip(mask.pixels()) {
            if marked[0] == MASK_ON {
                *pixel = self.highlight;
            }
        }

        Preprocessed {
            visualization,
            mask,
        }
    }
}

impl Default for HsvPreprocessor {
    fn default() -> Self {
        Self::new(ColorRange::YELLOW, Rgb([0, 255, 0]))
    }
}

impl Preprocess for HsvPreprocessor {
    fn preprocess(&self, frame: &DynamicImage) -> Result<Preprocessed> {
        let _span = tracing::debug_span!("preprocess").entered();

        let rgb = validate_frame(frame)?;
        Ok(self.threshold(&rgb))
    }
}

/// Accept only non-empty frames with exactly three color channels
pub fn validate_frame(frame: &DynamicImage) -> Result<RgbImage> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(LaneError::InvalidInput(format!(
            "empty frame ({}x{})",
            frame.width(),
            frame.height()
        )));
    }

    let channels = frame.color().channel_count();
    if channels != 3 {
        return Err(LaneError::InvalidInput(format!(
            "frame must have 3 color channels, got {channels}"
        )));
    }

    // 16-bit and float RGB are narrowed to 8 bits per channel
    Ok(frame.to_rgb8())
}
