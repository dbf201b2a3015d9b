//! Coverage-to-SDF converter owning the image buffers.

use super::grid::Grid;
use super::image::{CovImage, SdfImage, MAX_SDF_HEIGHT, MAX_SDF_WIDTH};

/// Converts a grayscale coverage image into a signed-distance-field
/// texture. Owns both buffers for its whole lifetime: the host fills the
/// coverage buffer, runs the build, and reads the SDF buffer back.
pub struct Converter {
    cov: CovImage,
    sdf: SdfImage,
    sdf_ext: i32,
}

impl Converter {
    /// Create a converter for a `width` x `height` coverage image with the
    /// output extended by `sdf_ext` pixels on every side.
    ///
    /// # Panics
    /// When the dimensions are not positive, `sdf_ext` is negative, or the
    /// output would exceed 4096 x 512.
    pub fn new(width: i32, height: i32, sdf_ext: i32) -> Self {
        assert!(width >= 1 && height >= 1 && sdf_ext >= 0);
        assert!(width + 2 * sdf_ext <= MAX_SDF_WIDTH);
        assert!(height + 2 * sdf_ext <= MAX_SDF_HEIGHT);

        Self {
            cov: CovImage::new(width, height),
            sdf: SdfImage::new(width, height, sdf_ext),
            sdf_ext,
        }
    }

    /// Coverage buffer for the host to fill: `width * height` bytes,
    /// row-major, top-down.
    pub fn coverage_mut(&mut self) -> &mut [u8] {
        self.cov.data_mut()
    }

    /// Run the SDF build and return the output bytes. Rows are
    /// `sdf_pitch()` bytes apart and row 0 is the bottom of the image.
    /// Valid until the converter is dropped or rebuilt.
    pub fn build_sdf(&mut self) -> &[u8] {
        log::debug!(
            "sdfield: building {}x{} -> {}x{} (ext {})",
            self.cov.width(),
            self.cov.height(),
            self.sdf.width(),
            self.sdf.height(),
            self.sdf_ext
        );
        Grid::build(&self.cov, &mut self.sdf, self.sdf_ext);
        self.sdf.data()
    }

    /// Byte distance between output rows (4-byte aligned).
    pub fn sdf_pitch(&self) -> usize {
        self.sdf.pitch()
    }

    /// Output dimensions in pixels.
    pub fn sdf_size(&self) -> (i32, i32) {
        (self.sdf.width(), self.sdf.height())
    }

    /// Read back an output pixel addressed top-down.
    pub fn sdf_pixel(&self, x: i32, y: i32) -> u8 {
        self.sdf.get(x, y)
    }
}
