//! Tile preamble parsing and mesh array layout.
//!
//! A tile buffer opens with the descendants subtree, then the mesh preamble
//! (CONTENTS, vertex and triangle counts), the positions and triangles
//! arrays, optional normals and colors, and an optional triangle-block tree.
//! Every array is padded to a 4-byte boundary. `TileHeader::parse` walks the
//! layout once, validates that each declared extent fits in the buffer and
//! caches counts, index widths and array offsets.

use super::error::{TileError, TileResult};
use super::view::{align4, read_u16, read_u32, read_i8, IndexSize, IndexWidth};

/// Spatial dimensions of a tile.
pub const DIM: usize = 3;

/// Corners per triangle.
pub const NUM_TRI_CORNERS: usize = 3;

/// Components per vertex color.
pub const NUM_COLOR_COMPOS: usize = 3;

/// Byte size of one `TREE_SIZE` unit.
pub const WORD_SIZE: usize = 4;

/// Scale from the tile's local unit cube to stored u16 positions.
pub const ALCS_TO_U16: f32 = u16::MAX as f32;

/// CONTENTS bit: normals array present.
pub const FLAG_N_ARRAY: u32 = 1 << 0;

/// CONTENTS bit: colors array present.
pub const FLAG_C_ARRAY: u32 = 1 << 1;

/// CONTENTS bit: triangle-block tree present.
pub const FLAG_TRI_TREE: u32 = 1 << 8;

/// Parsed layout of a tile buffer. Offsets are byte positions into the
/// buffer the header was parsed from.
#[derive(Debug, Clone)]
pub struct TileHeader {
    pub contents: u32,
    pub num_vertices: u32,
    pub num_triangles: u32,
    pub num_tblocks: u32,

    pub vindex: IndexSize,
    pub tindex: IndexSize,
    pub bindex: IndexSize,

    pub positions: usize,
    pub triangles: usize,
    pub normals: Option<usize>,
    pub colors: Option<usize>,

    pub tblock_table: Option<usize>,
    pub root_node: Option<usize>,

    /// End of the mesh section (positions through the last attribute array).
    pub mesh_end: usize,
}

impl TileHeader {
    pub fn parse(data: &[u8]) -> TileResult<Self> {
        let len = data.len();

        let need = |section: &'static str, needed: usize| -> TileResult<()> {
            if needed > len {
                Err(TileError::Truncated {
                    section,
                    needed,
                    len,
                })
            } else {
                Ok(())
            }
        };

        // Descendants subtree: TREE_SIZE counts words including its own
        // header, so the mesh preamble starts right after it.
        need("descendants header", WORD_SIZE)?;
        let desc_tree_size = read_u16(data, 0) as usize;
        let mut offset = WORD_SIZE * desc_tree_size;
        need("descendants subtree", offset)?;

        need("mesh preamble", offset + 12)?;
        let contents = read_u32(data, offset);
        let num_vertices = read_u32(data, offset + 4);
        let num_triangles = read_u32(data, offset + 8);
        offset += 12;

        let vindex = IndexSize::for_count(num_vertices);
        let tindex = IndexSize::for_count(num_triangles);

        let positions = offset;
        offset += align4(DIM * 2 * num_vertices as usize);
        need("positions", offset)?;

        let triangles = offset;
        offset += align4(NUM_TRI_CORNERS * vindex.bytes() * num_triangles as usize);
        need("triangles", offset)?;

        let normals = if contents & FLAG_N_ARRAY != 0 {
            let at = offset;
            offset += align4(DIM * num_vertices as usize);
            need("normals", offset)?;
            Some(at)
        } else {
            None
        };

        let colors = if contents & FLAG_C_ARRAY != 0 {
            let at = offset;
            offset += align4(NUM_COLOR_COMPOS * num_vertices as usize);
            need("colors", offset)?;
            Some(at)
        } else {
            None
        };

        let mesh_end = offset;

        let mut num_tblocks = 0;
        let mut bindex = IndexSize::U16;
        let mut tblock_table = None;
        let mut root_node = None;

        if contents & FLAG_TRI_TREE != 0 {
            need("triangle tree preamble", offset + 4)?;
            num_tblocks = read_u32(data, offset);
            offset += 4;

            bindex = IndexSize::for_count(num_tblocks);

            tblock_table = Some(offset);
            offset += align4(tindex.bytes() * num_tblocks as usize);
            need("tblock table", offset)?;

            // Validate the root node's declared extent.
            need("triangle tree root", offset + WORD_SIZE)?;
            let mut tree_size = read_u16(data, offset) as usize;
            if tree_size == 0 {
                need("triangle tree root", offset + 2 * WORD_SIZE)?;
                tree_size = read_u32(data, offset + 4) as usize;
            }
            need("triangle tree", offset + WORD_SIZE * tree_size)?;

            root_node = Some(offset);
        }

        Ok(Self {
            contents,
            num_vertices,
            num_triangles,
            num_tblocks,
            vindex,
            tindex,
            bindex,
            positions,
            triangles,
            normals,
            colors,
            tblock_table,
            root_node,
            mesh_end,
        })
    }

    /// Stored position of a vertex, in normalized u16 coordinates.
    #[inline]
    pub fn position(&self, data: &[u8], vid: u32) -> [u16; DIM] {
        let base = self.positions + DIM * 2 * vid as usize;
        [
            read_u16(data, base),
            read_u16(data, base + 2),
            read_u16(data, base + 4),
        ]
    }

    /// Stored normal of a vertex.
    #[inline]
    pub fn normal(&self, data: &[u8], vid: u32) -> Option<[i8; DIM]> {
        self.normals.map(|at| {
            let base = at + DIM * vid as usize;
            [
                read_i8(data, base),
                read_i8(data, base + 1),
                read_i8(data, base + 2),
            ]
        })
    }

    /// Vertex indices of a triangle; `W` must match `self.vindex`.
    #[inline]
    pub fn triangle<W: IndexWidth>(&self, data: &[u8], tid: u32) -> [u32; NUM_TRI_CORNERS] {
        debug_assert_eq!(W::BYTES, self.vindex.bytes());
        let base = self.triangles + NUM_TRI_CORNERS * W::BYTES * tid as usize;
        [
            W::read(data, base),
            W::read(data, base + W::BYTES),
            W::read(data, base + 2 * W::BYTES),
        ]
    }

    /// First triangle of block `bindex` in the tile's own block table.
    #[inline]
    pub fn tblock_start(&self, data: &[u8], bindex: u32) -> u32 {
        let table = self.tblock_table.expect("tile has no triangle tree");
        self.tindex
            .read(data, table + self.tindex.bytes() * bindex as usize)
    }

    /// Triangle range `[start, end)` of block `bindex`. The last block
    /// extends to the end of the triangle array.
    pub fn tblock_range(&self, data: &[u8], bindex: u32) -> (u32, u32) {
        let start = self.tblock_start(data, bindex);
        let end = if bindex == self.num_tblocks - 1 {
            self.num_triangles
        } else {
            self.tblock_start(data, bindex + 1)
        };
        (start, end)
    }
}
