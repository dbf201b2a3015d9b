//! Two-sided distance grid and the 8SSEDT raster sweep.
//!
//! Every cell tracks two vectors: `v0` to the nearest foreground sample and
//! `v1` to the nearest background sample, both in pixel units from the cell
//! center. Seeding plants exact vectors around fully covered, fully empty
//! and partially covered pixels; the two-pass 8-neighborhood sweep
//! (Danielsson 1980 / Ragnemalm 1993, known approximate) propagates them
//! across the grid, and the final scan converts `|v0| - |v1|` into the
//! output pixel scale.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::binarizer::{Binarizer, PixelPart, SUB_PIXEL_DIVS};
use super::image::{CovImage, SdfImage, MAX_PIXEL, MAX_SDF_HEIGHT, MAX_SDF_WIDTH};

/// Output scale: one pixel step of the SDF texture covers 1/20 of the
/// distance range.
pub const DIST_FACTOR: f32 = 1.0 / 20.0;

/// Distance mapped to output zero.
pub const DIST_LOWER: f32 = -std::f32::consts::SQRT_2;

/// Coverage ratio at or above which a pixel counts as fully covered.
const FULCOV_VALUE_THRESH: f64 = 1.0 - 0.5 / (SUB_PIXEL_DIVS * SUB_PIXEL_DIVS) as f64;

/// Pixel-value form of the fulcov threshold.
const FULCOV_PIXEL_THRESH: u8 = (MAX_PIXEL as f64 * FULCOV_VALUE_THRESH + 0.5) as u8;

/// Any in-grid vector to this point is longer than any legitimate
/// nearest-sample vector.
const INF_POINT: Vec2 = Vec2::new(-(MAX_SDF_WIDTH as f32), -(MAX_SDF_HEIGHT as f32));

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Node {
    /// Vector to the nearest foreground sample.
    v0: Vec2,
    /// Vector to the nearest background sample.
    v1: Vec2,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Front,
    Back,
}

/// Distance grid scoped to a single build. The grid has the SDF's
/// dimensions plus a one-pixel dummy halo addressable at `-1` and `size`,
/// which the sweep reads instead of bounds-checking every access.
pub struct Grid {
    size: [i32; 2],
    actual_width: i32,
    sdf_ext: i32,
    data: Vec<Node>,
}

impl Grid {
    /// Run the whole pipeline: seed from `cov`, sweep, and write the SDF
    /// pixels into `sdf_image`.
    pub fn build(cov: &CovImage, sdf_image: &mut SdfImage, sdf_ext: i32) {
        let size = [sdf_image.width(), sdf_image.height()];
        let actual_width = size[0] + 2;
        let actual_height = size[1] + 2;

        let mut grid = Grid {
            size,
            actual_width,
            sdf_ext,
            data: vec![Node::zeroed(); (actual_width * actual_height) as usize],
        };

        grid.seed_outer();
        let gencov = grid.seed_mapped(cov);
        for &(x, y) in &gencov {
            grid.update_around_gencov(cov, x, y);
        }
        grid.scan_8ssedt(sdf_image);
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(x >= -1 && x <= self.size[0] && y >= -1 && y <= self.size[1]);
        ((x + 1) + (y + 1) * self.actual_width) as usize
    }

    #[inline]
    fn node(&self, x: i32, y: i32) -> Node {
        self.data[self.index(x, y)]
    }

    #[inline]
    fn node_mut(&mut self, x: i32, y: i32) -> &mut Node {
        let index = self.index(x, y);
        &mut self.data[index]
    }

    fn vec_mut(&mut self, x: i32, y: i32, side: Side) -> &mut Vec2 {
        let node = self.node_mut(x, y);
        match side {
            Side::Front => &mut node.v0,
            Side::Back => &mut node.v1,
        }
    }

    /// Stage A: everything outside the mapped coverage region, including
    /// the dummy halo, is seeded as solid background infinitely far from
    /// any foreground.
    fn seed_outer(&mut self) {
        let ext = self.sdf_ext;
        let [w, h] = self.size;

        let put_ext_node = |grid: &mut Grid, x: i32, y: i32| {
            let node = Node {
                v0: Vec2::new(
                    INF_POINT.x - 0.5 - x as f32,
                    INF_POINT.y - 0.5 - y as f32,
                ),
                v1: Vec2::ZERO,
            };
            *grid.node_mut(x, y) = node;
        };

        // Top and bottom bands, full width including the halo.
        let y_offset = h + 1 - ext;
        for y in -1..ext {
            for x in -1..w + 1 {
                put_ext_node(self, x, y);
                put_ext_node(self, x, y + y_offset);
            }
        }

        // Left and right bands between them.
        let x_offset = w + 1 - ext;
        for y in ext..h - ext {
            for x in -1..ext {
                put_ext_node(self, x, y);
                put_ext_node(self, x + x_offset, y);
            }
        }
    }

    /// Stages B-D over the mapped region: seed each coverage pixel by its
    /// fulcov/empty/gencov state, plant the half-pixel background vectors
    /// along the region's perimeter, then run the exact 3x3 neighborhood
    /// updates for solid pixels. Gencov coordinates are collected and
    /// returned for the subpixel stage; they are few compared to solid
    /// pixels.
    fn seed_mapped(&mut self, cov: &CovImage) -> Vec<(i32, i32)> {
        let ext = self.sdf_ext;
        let thresh = FULCOV_PIXEL_THRESH;

        // Stage B: per-pixel seeds.
        for cy in 0..cov.height() {
            for cx in 0..cov.width() {
                let cov0 = cov.get(cx, cy);
                let cov1 = MAX_PIXEL - cov0;

                let inf_vec = Vec2::new(
                    INF_POINT.x - 0.5 - cx as f32,
                    INF_POINT.y - 0.5 - cy as f32,
                );

                let node = Node {
                    v0: if cov0 >= thresh { Vec2::ZERO } else { inf_vec },
                    v1: if cov1 >= thresh { Vec2::ZERO } else { inf_vec },
                };
                *self.node_mut(cx + ext, cy + ext) = node;
            }
        }

        // Stage C: the exterior is solid background, so non-background
        // cells on the mapped region's perimeter are half a pixel from it.
        let x_lower = ext;
        let y_lower = ext;
        let x_upper = self.size[0] - ext;
        let y_upper = self.size[1] - ext;

        for x in x_lower..x_upper {
            let top = self.vec_mut(x, y_lower, Side::Back);
            if *top != Vec2::ZERO {
                *top = Vec2::new(0.0, -0.5);
            }
            let bottom = self.vec_mut(x, y_upper - 1, Side::Back);
            if *bottom != Vec2::ZERO {
                *bottom = Vec2::new(0.0, 0.5);
            }
        }
        for y in y_lower + 1..y_upper - 1 {
            let cand = Vec2::new(-0.5, 0.0);
            let left = self.vec_mut(x_lower, y, Side::Back);
            if cand.length_squared() < left.length_squared() {
                *left = cand;
            }
            let cand = Vec2::new(0.5, 0.0);
            let right = self.vec_mut(x_upper - 1, y, Side::Back);
            if cand.length_squared() < right.length_squared() {
                *right = cand;
            }
        }

        // Stage D: exact neighborhood vectors around solid pixels.
        let mut gencov = Vec::new();

        for cy in 0..cov.height() {
            for cx in 0..cov.width() {
                let cov0 = cov.get(cx, cy);
                let cov1 = MAX_PIXEL - cov0;

                let gx = cx + ext;
                let gy = cy + ext;

                if cov0 >= thresh {
                    self.update_adjacent_nodes(gx, gy, Side::Front);
                } else if cov1 >= thresh {
                    self.update_adjacent_nodes(gx, gy, Side::Back);
                } else {
                    gencov.push((gx, gy));
                }
            }
        }

        gencov
    }

    /// Shortest vectors from the eight neighbors' centers to the boundary
    /// square of a solid pixel at `(x, y)`.
    fn update_adjacent_nodes(&mut self, x: i32, y: i32, side: Side) {
        for ox in -1..=1i32 {
            let cand = Vec2::new(-0.5 * ox as f32, 0.5);
            self.relax_vec(x + ox, y - 1, side, cand);
        }
        for ox in [-1, 1i32] {
            let cand = Vec2::new(-0.5 * ox as f32, 0.0);
            self.relax_vec(x + ox, y, side, cand);
        }
        for ox in -1..=1i32 {
            let cand = Vec2::new(-0.5 * ox as f32, -0.5);
            self.relax_vec(x + ox, y + 1, side, cand);
        }
    }

    /// Stage E: exact vectors from the 3x3 neighborhood (the pixel itself
    /// included) to each binarized sub-rectangle of a gencov pixel.
    fn update_around_gencov(&mut self, cov: &CovImage, gx: i32, gy: i32) {
        let ext = self.sdf_ext;
        let binarizer = Binarizer::new(cov, gx - ext, gy - ext);

        for part in binarizer.pixel_parts(false) {
            self.update_around_gencov_part(gx, gy, &part, Side::Front);
        }
        for part in binarizer.pixel_parts(true) {
            self.update_around_gencov_part(gx, gy, &part, Side::Back);
        }
    }

    fn update_around_gencov_part(&mut self, x: i32, y: i32, part: &PixelPart, side: Side) {
        for oy in -1..=1i32 {
            for ox in -1..=1i32 {
                // Neighbor center in the part's pixel-centered coordinates.
                let center = Vec2::new(ox as f32, oy as f32);
                let cand = center.clamp(part.lower, part.upper) - center;
                self.relax_vec(x + ox, y + oy, side, cand);
            }
        }
    }

    #[inline]
    fn relax_vec(&mut self, x: i32, y: i32, side: Side, cand: Vec2) {
        let vec = self.vec_mut(x, y, side);
        if cand.length_squared() < vec.length_squared() {
            *vec = cand;
        }
    }

    /// Relax cell `(x, y)` against its neighbor at `(x + ox, y + oy)` on
    /// both sides.
    #[inline]
    fn relax_node(&mut self, x: i32, y: i32, ox: i32, oy: i32) {
        let other = self.node(x + ox, y + oy);
        let offset = Vec2::new(ox as f32, oy as f32);
        let node = self.node_mut(x, y);

        let v0_cand = other.v0 + offset;
        if v0_cand.length_squared() < node.v0.length_squared() {
            node.v0 = v0_cand;
        }
        let v1_cand = other.v1 + offset;
        if v1_cand.length_squared() < node.v1.length_squared() {
            node.v1 = v1_cand;
        }
    }

    /// Stage F: the two-pass 8SSEDT sweep, finalizing each cell into
    /// `sdf_image` during the very last scan over it.
    fn scan_8ssedt(&mut self, sdf_image: &mut SdfImage) {
        debug_assert_eq!(sdf_image.width(), self.size[0]);
        debug_assert_eq!(sdf_image.height(), self.size[1]);

        let [xsize, ysize] = self.size;

        // Top-down pass.
        for y in 0..ysize {
            for x in 0..xsize {
                self.relax_node(x, y, -1, 0);
                for ox in -1..=1 {
                    self.relax_node(x, y, ox, -1);
                }
            }
            for x in (0..xsize).rev() {
                self.relax_node(x, y, 1, 0);
            }
        }

        // Bottom-up pass.
        for y in (0..ysize).rev() {
            for x in (0..xsize).rev() {
                self.relax_node(x, y, 1, 0);
                for ox in -1..=1 {
                    self.relax_node(x, y, ox, 1);
                }
            }
            for x in 0..xsize {
                self.relax_node(x, y, -1, 0);

                let node = self.node(x, y);
                debug_assert!(node.v0 == Vec2::ZERO || node.v1 == Vec2::ZERO);

                let d = node.v0.length() - node.v1.length();
                let sample = ((d - DIST_LOWER) * DIST_FACTOR * MAX_PIXEL as f32)
                    .clamp(0.0, MAX_PIXEL as f32);
                sdf_image.set(x, y, sample.round() as u8);
            }
        }
    }
}

/// Distance-to-pixel mapping of the finalization step, without clamping.
/// Exposed for tests and for hosts that want to invert output values.
pub fn convert_dist_to_pixel(dist: f32) -> u8 {
    ((dist - DIST_LOWER) * DIST_FACTOR * MAX_PIXEL as f32).round() as u8
}
