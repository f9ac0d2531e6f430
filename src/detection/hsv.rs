use image::{ImageBuffer, Rgb, RgbImage};
use std::fmt;

/// 8-bit HSV triple. Hue is half-degrees (0..=179), saturation and value
/// span the full byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const MAX_HUE: u8 = 179;

    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

impl fmt::Display for Hsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.h, self.s, self.v)
    }
}

/// Fixed-point precision of the division tables
const HSV_SHIFT: u32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// `round((255 << HSV_SHIFT) / v)`, zero for `v == 0`
const SDIV_TABLE: [i32; 256] = division_table(255 << HSV_SHIFT, 1);

/// `round((180 << HSV_SHIFT) / (6 * delta))`, zero for `delta == 0`
const HDIV_TABLE: [i32; 256] = division_table(180 << HSV_SHIFT, 6);

const fn division_table(numerator: i32, scale: i32) -> [i32; 256] {
    let mut table = [0i32; 256];
    let mut i = 1;
    while i < 256 {
        let denominator = scale * i as i32;
        // Integer round-to-nearest; no entry lands exactly on .5
        table[i] = (2 * numerator + denominator) / (2 * denominator);
        i += 1;
    }
    table
}

/// Convert one RGB sample to HSV
///
/// V is the largest channel, S is `255 * (max - min) / max` and H is the
/// hexcone angle halved so it fits a byte. Both divisions go through
/// 12-bit fixed-point reciprocal tables, so results agree bit for bit with
/// the common 8-bit HSV conversion. Red wins ties for the maximum, then green.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> Hsv {
    let [r, g, b] = pixel.0.map(i32::from);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = (delta * SDIV_TABLE[max as usize] + HSV_ROUND) >> HSV_SHIFT;

    let sector = if max == r {
        g - b
    } else if max == g {
        b - r + 2 * delta
    } else {
        r - g + 4 * delta
    };
    // Arithmetic shift floors negative sectors before the wrap
    let h = (sector * HDIV_TABLE[delta as usize] + HSV_ROUND) >> HSV_SHIFT;
    let h = if h < 0 { h + 180 } else { h };

    Hsv {
        h: h.clamp(0, Hsv::MAX_HUE as i32) as u8,
        s: s.clamp(0, 255) as u8,
        v: max as u8,
    }
}

/// Per-pixel HSV view of an RGB frame, stored as a 3-channel buffer
pub fn convert_frame(frame: &RgbImage) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let _span = tracing::debug_span!("rgb_to_hsv").entered();

    let mut hsv = RgbImage::new(frame.width(), frame.height());
    for (src, dst) in frame.pixels().zip(hsv.pixels_mut()) {
        let Hsv { h, s, v } = rgb_to_hsv(*src);
        *dst = Rgb([h, s, v]);
    }
    hsv
}
