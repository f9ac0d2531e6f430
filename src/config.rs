use crate::detection::Hsv;
use crate::error::{LaneError, Result};
use image::Rgb;

/// Inclusive HSV window, hue in 0..=179
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    /// Yellow road paint
    pub const YELLOW: ColorRange = ColorRange {
        lower: Hsv::new(10, 90, 100),
        upper: Hsv::new(30, 255, 255),
    };

    pub fn new(lower: Hsv, upper: Hsv) -> Result<Self> {
        if lower.h > upper.h || lower.s > upper.s || lower.v > upper.v {
            return Err(LaneError::InvalidInput(format!(
                "HSV lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        if upper.h > Hsv::MAX_HUE {
            return Err(LaneError::InvalidInput(format!(
                "hue {} is outside 0..={}",
                upper.h,
                Hsv::MAX_HUE
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        hsv.h >= self.lower.h
            && hsv.h <= self.upper.h
            && hsv.s >= self.lower.s
            && hsv.s <= self.upper.s
            && hsv.v >= self.lower.v
            && hsv.v <= self.upper.v
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::YELLOW
    }
}

/// Weights for `src * source_weight + overlay * overlay_weight + gamma`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    pub source_weight: f32,
    pub overlay_weight: f32,
    pub gamma: f32,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            source_weight: 0.8,
            overlay_weight: 1.0,
            gamma: 0.0,
        }
    }
}

/// Everything the detector needs, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub color_range: ColorRange,
    pub blend: BlendParams,
    /// Tint applied to candidate pixels in the visualization
    pub highlight: Rgb<u8>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            color_range: ColorRange::YELLOW,
            blend: BlendParams::default(),
            highlight: Rgb([0, 255, 0]),
        }
    }
}

/// Parse `"h,s,v"` into an [`Hsv`] triple. Used as a clap value parser.
pub fn parse_hsv(value: &str) -> std::result::Result<Hsv, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected h,s,v but got '{value}'"));
    }

    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|e| format!("'{part}' is not a value in 0..=255: {e}"))?;
    }

    if channels[0] > Hsv::MAX_HUE {
        return Err(format!("hue {} is outside 0..={}", channels[0], Hsv::MAX_HUE));
    }

    Ok(Hsv::new(channels[0], channels[1], channels[2]))
}
