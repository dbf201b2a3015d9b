//! Tile: buffer ownership and the public query surface.

use std::borrow::Cow;

use super::clip::{clip_mesh, ClipOutput};
use super::desc;
use super::error::TileResult;
use super::header::TileHeader;
use super::ray;
use super::rect::Rect;

/// A binary tile. Owns its byte buffer for its whole lifetime; every query
/// borrows it.
pub struct Tile {
    data: Vec<u8>,
    header: TileHeader,
}

impl Tile {
    /// Take ownership of a tile buffer, parsing and validating its layout.
    pub fn new(data: Vec<u8>) -> TileResult<Self> {
        let header = TileHeader::parse(&data)?;
        log::debug!(
            "tile: {} vertices, {} triangles, {} blocks, contents {:#x}",
            header.num_vertices,
            header.num_triangles,
            header.num_tblocks,
            header.contents
        );
        Ok(Self { data, header })
    }

    pub fn header(&self) -> &TileHeader {
        &self.header
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Depth of the deepest known descendant containing `(x, y, z)`, capped
    /// at `limit`. The coordinates are in the tile's local unit cube.
    ///
    /// # Panics
    /// When `limit < 1`.
    pub fn descendant_depth(&self, x: f64, y: f64, z: f64, limit: i32) -> i32 {
        assert!(limit >= 1, "descendant depth limit must be at least 1");
        desc::descendant_depth(&self.data, [x, y, z], limit)
    }

    /// Clip the mesh by the cube at `(x, y, z)` with edge `size`, in the
    /// tile's local coordinates. When the cube contains the whole tile the
    /// original mesh section is returned borrowed, byte for byte.
    ///
    /// # Panics
    /// When `size <= 0`.
    pub fn clip(&self, x: f32, y: f32, z: f32, size: f32) -> ClipOutput<'_> {
        assert!(size > 0.0, "clip cube must have positive size");

        let clip_rect = Rect::create_cube([x, y, z], size);

        if clip_rect.contains(&Rect::TILE) {
            return ClipOutput {
                num_vertices: self.header.num_vertices,
                num_triangles: self.header.num_triangles,
                data: Cow::Borrowed(&self.data[self.header.positions..self.header.mesh_end]),
            };
        }

        clip_mesh(&self.data, &self.header, &clip_rect)
    }

    /// Nearest ray/triangle intersection parameter in `(0, limit)`, or
    /// `limit` when nothing is hit. Ray and limit box are in the tile's
    /// local coordinates; the direction need not be normalized (its length
    /// sets the parameter scale).
    pub fn find_ray_distance(
        &self,
        ray_pos: [f64; 3],
        ray_dir: [f64; 3],
        limit: f64,
        lrect: &Rect,
    ) -> f64 {
        ray::find_ray_distance(&self.data, &self.header, ray_pos, ray_dir, limit, lrect)
    }
}
