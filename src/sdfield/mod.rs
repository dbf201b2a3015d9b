//! Signed distance field generator for symbol rendering.
//!
//! Converts a grayscale coverage image into an SDF texture: exact
//! nearest-sample seeding around solid and partially covered pixels
//! (subpixel binarization), then a two-pass 8SSEDT propagation.

mod bilinear;
mod binarizer;
mod converter;
mod grid;
mod image;

pub use binarizer::{Binarizer, PixelPart, SubPixelSet, SUB_PIXEL_DIVS};
pub use converter::Converter;
pub use grid::{convert_dist_to_pixel, DIST_FACTOR, DIST_LOWER};
pub use image::{CovImage, SdfImage, MAX_SDF_HEIGHT, MAX_SDF_WIDTH};
