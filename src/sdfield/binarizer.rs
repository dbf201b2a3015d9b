//! Subpixel binarization of a partially covered pixel.
//!
//! A gencov pixel's scalar coverage is turned into an exact count of "on"
//! subpixels in a 5x5 grid, placed where the bilinear interpolation of the
//! surrounding coverage is highest. The resulting bit set is exposed as
//! maximal horizontal runs so the grid seeding can treat each run as one
//! rectangle.

use glam::Vec2;

use super::bilinear::Bilinear;
use super::image::{CovImage, MAX_PIXEL};

/// Subpixel grid divisions per pixel axis.
pub const SUB_PIXEL_DIVS: u32 = 5;

/// Subpixels per pixel.
pub const NUM_SUB_PIXELS: u32 = SUB_PIXEL_DIVS * SUB_PIXEL_DIVS;

/// Bit set over the 5x5 subpixels of one pixel, x fastest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubPixelSet(u32);

impl SubPixelSet {
    #[inline]
    fn mask(sx: u32, sy: u32) -> u32 {
        1 << (sx + sy * SUB_PIXEL_DIVS)
    }

    pub fn bit(self, sx: u32, sy: u32) -> bool {
        self.0 & Self::mask(sx, sy) != 0
    }

    #[must_use]
    pub fn with(self, sx: u32, sy: u32) -> Self {
        Self(self.0 | Self::mask(sx, sy))
    }

    /// Complement; only the valid 25 bits are ever read back.
    #[must_use]
    pub fn complement(self) -> Self {
        Self(!self.0)
    }

    pub fn count(self) -> u32 {
        (self.0 & ((1 << NUM_SUB_PIXELS) - 1)).count_ones()
    }
}

/// Sub-rectangle of a pixel in pixel-centered coordinates: the pixel spans
/// `[-1/2, +1/2]` on both axes.
#[derive(Debug, Clone, Copy)]
pub struct PixelPart {
    pub lower: Vec2,
    pub upper: Vec2,
}

/// Number of "on" subpixels for a coverage value. The endpoints are
/// reserved for the fully-covered / fully-empty classifications, so a
/// gencov pixel always yields between 1 and 24 subpixels.
pub fn coverage_ratio_count(pixel: u8) -> u32 {
    let scaled = (NUM_SUB_PIXELS as f32 * pixel as f32 / MAX_PIXEL as f32).round() as u32;
    scaled.clamp(1, NUM_SUB_PIXELS - 1)
}

/// Binarized subpixel state of one coverage pixel.
pub struct Binarizer {
    sub_pixels: SubPixelSet,
}

impl Binarizer {
    pub fn new(image: &CovImage, x: i32, y: i32) -> Self {
        let interp = Bilinear::new(image, x, y);

        let mut buffer: [(f32, u32, u32); NUM_SUB_PIXELS as usize] =
            [(0.0, 0, 0); NUM_SUB_PIXELS as usize];
        let mut index = 0;
        for sy in 0..SUB_PIXEL_DIVS {
            for sx in 0..SUB_PIXEL_DIVS {
                buffer[index] = (interp.sample(sx, sy), sx, sy);
                index += 1;
            }
        }

        let count = coverage_ratio_count(image.get(x, y)) as usize;

        // Partition the top `count` subpixels by interpolated value.
        buffer.select_nth_unstable_by(count - 1, |a, b| {
            b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut sub_pixels = SubPixelSet::default();
        for &(_, sx, sy) in &buffer[..count] {
            sub_pixels = sub_pixels.with(sx, sy);
        }

        Self { sub_pixels }
    }

    pub fn sub_pixels(&self) -> SubPixelSet {
        self.sub_pixels
    }

    /// Maximal horizontal runs of the set (`back == false`) or of its
    /// complement (`back == true`), as pixel-centered rectangles.
    pub fn pixel_parts(&self, back: bool) -> Vec<PixelPart> {
        let set = if back {
            self.sub_pixels.complement()
        } else {
            self.sub_pixels
        };

        let scale = 1.0 / SUB_PIXEL_DIVS as f32;
        let mut parts = Vec::new();

        for sy in 0..SUB_PIXEL_DIVS {
            let mut run_start = None;
            for sx in 0..=SUB_PIXEL_DIVS {
                let on = sx < SUB_PIXEL_DIVS && set.bit(sx, sy);
                match (run_start, on) {
                    (None, true) => run_start = Some(sx),
                    (Some(start), false) => {
                        parts.push(PixelPart {
                            lower: Vec2::new(
                                start as f32 * scale - 0.5,
                                sy as f32 * scale - 0.5,
                            ),
                            upper: Vec2::new(
                                sx as f32 * scale - 0.5,
                                (sy + 1) as f32 * scale - 0.5,
                            ),
                        });
                        run_start = None;
                    }
                    _ => {}
                }
            }
        }

        parts
    }
}
