//! Axis-aligned box used by the tile queries.
//!
//! The box is half-open: points on an `upper` face are outside. That
//! convention matches the tile's local coordinate cube `[0,1)^3` and the
//! normalized position range `[0, 65535)`.

/// Axis-aligned box with exclusive upper faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub lower: [f32; 3],
    pub upper: [f32; 3],
}

impl Rect {
    /// The whole tile in its local coordinate system.
    pub const TILE: Rect = Rect::create_cube([0.0, 0.0, 0.0], 1.0);

    pub const fn new(lower: [f32; 3], upper: [f32; 3]) -> Self {
        Self { lower, upper }
    }

    /// Cube with the given origin and edge length.
    pub const fn create_cube(origin: [f32; 3], size: f32) -> Self {
        Self {
            lower: origin,
            upper: [origin[0] + size, origin[1] + size, origin[2] + size],
        }
    }

    /// True when every axis has positive extent.
    pub fn is_valid_size(&self) -> bool {
        (0..3).all(|i| self.lower[i] < self.upper[i])
    }

    /// Open-interval overlap test.
    pub fn intersects(&self, other: &Rect) -> bool {
        for i in 0..3 {
            if self.lower[i] >= other.upper[i] || self.upper[i] <= other.lower[i] {
                return false;
            }
        }
        true
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        for i in 0..3 {
            if other.lower[i] < self.lower[i] || other.upper[i] > self.upper[i] {
                return false;
            }
        }
        true
    }

    /// Octant of this box selected by a 3-bit child index (x is bit 0).
    pub fn child_octant(&self, child_index: usize) -> Rect {
        let mut rect = *self;
        for i in 0..3 {
            let hsize = (self.upper[i] - self.lower[i]) / 2.0;
            let which = ((child_index >> i) & 1) as f32;
            rect.lower[i] = self.lower[i] + which * hsize;
            rect.upper[i] = rect.lower[i] + hsize;
        }
        rect
    }
}
