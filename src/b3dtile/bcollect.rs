//! Triangle-block collection for the clipper.
//!
//! Walks the triangle octree depth-first in x,y,z-increasing child order,
//! carrying each node's box in the tile's local coordinates, and gathers the
//! block indices of every leaf whose subtree box intersects the clip box.
//! Indices are deduplicated in first-visit order. Tiles without a tree are
//! given a single virtual block spanning all triangles.

use crate::hashset::IntHashSet;

use super::header::{TileHeader, WORD_SIZE};
use super::rect::Rect;
use super::tri_node::{TriNode, TriNodeKind};
use super::view::{align4, read_u32, Cursor, IndexSize};

/// Block table in effect for one clip, either the tile's own or a
/// synthesized single-block table.
pub enum BlockTable<'a> {
    /// The tile's table, read at its stored index width.
    Stored {
        data: &'a [u8],
        offset: usize,
        width: IndexSize,
        num_tblocks: u32,
        num_triangles: u32,
    },
    /// Virtual block 0 covering every triangle of a tree-less tile.
    Single { num_triangles: u32 },
    /// Triangle-less tile.
    Empty,
}

impl BlockTable<'_> {
    pub fn num_tblocks(&self) -> u32 {
        match self {
            BlockTable::Stored { num_tblocks, .. } => *num_tblocks,
            BlockTable::Single { .. } => 1,
            BlockTable::Empty => 0,
        }
    }

    /// Triangle range `[start, end)` of block `bindex`; the last block runs
    /// to the end of the triangle array.
    pub fn range(&self, bindex: u32) -> (u32, u32) {
        match self {
            BlockTable::Stored {
                data,
                offset,
                width,
                num_tblocks,
                num_triangles,
            } => {
                let at = |i: u32| width.read(data, offset + width.bytes() * i as usize);
                let start = at(bindex);
                let end = if bindex == num_tblocks - 1 {
                    *num_triangles
                } else {
                    at(bindex + 1)
                };
                (start, end)
            }
            BlockTable::Single { num_triangles } => {
                debug_assert_eq!(bindex, 0);
                (0, *num_triangles)
            }
            BlockTable::Empty => unreachable!("empty table has no blocks"),
        }
    }
}

struct BlockCollector<'a> {
    data: &'a [u8],
    clip_rect: Rect,
    bindex: IndexSize,
    seen: IntHashSet,
    collected: Vec<u32>,
}

/// Collect the blocks whose leaf subtrees intersect `clip_rect` (in the
/// tile's local coordinates), plus the block table to resolve them with.
pub fn collect<'a>(
    data: &'a [u8],
    header: &TileHeader,
    clip_rect: &Rect,
) -> (Vec<u32>, BlockTable<'a>) {
    debug_assert!(clip_rect.is_valid_size());

    if header.num_triangles == 0 {
        return (Vec::new(), BlockTable::Empty);
    }

    let Some(root) = header.root_node else {
        return (vec![0], BlockTable::Single {
            num_triangles: header.num_triangles,
        });
    };

    let mut collector = BlockCollector {
        data,
        clip_rect: *clip_rect,
        bindex: header.bindex,
        seen: IntHashSet::new(),
        collected: Vec::new(),
    };
    collector.traverse_branch(root, &Rect::TILE);

    let table = BlockTable::Stored {
        data,
        offset: header.tblock_table.expect("tree implies a block table"),
        width: header.tindex,
        num_tblocks: header.num_tblocks,
        num_triangles: header.num_triangles,
    };
    (collector.collected, table)
}

impl BlockCollector<'_> {
    /// Returns the offset just past the branch's subtree.
    fn traverse_branch(&mut self, node_offset: usize, node_rect: &Rect) -> usize {
        let node = TriNode::root(self.data, node_offset);
        let header = node.branch_header();
        let mut cursor = header.body;

        for w in 0..2 {
            for v in 0..2 {
                for u in 0..2 {
                    let child_index = u + 2 * v + 4 * w;
                    let kind = match (header.children >> (2 * child_index)) & 0b11 {
                        0 => TriNodeKind::None,
                        1 => TriNodeKind::Branch,
                        _ => TriNodeKind::Leaf,
                    };

                    match kind {
                        TriNodeKind::Branch => {
                            let child_rect = node_rect.child_octant(child_index);
                            if child_rect.intersects(&self.clip_rect) {
                                cursor = self.traverse_branch(cursor, &child_rect);
                            } else {
                                cursor = TriNode::root(self.data, cursor).branch_end();
                            }
                        }
                        TriNodeKind::Leaf => {
                            let child_rect = node_rect.child_octant(child_index);
                            if child_rect.intersects(&self.clip_rect) {
                                cursor = self.traverse_leaf(cursor);
                            } else {
                                cursor = self.skip_leaf(cursor);
                            }
                        }
                        TriNodeKind::None => {}
                    }
                }
            }
        }

        debug_assert_eq!(cursor, node_offset + WORD_SIZE * header.tree_size);
        cursor
    }

    fn traverse_leaf(&mut self, node_offset: usize) -> usize {
        let mut cursor = Cursor::new(self.data, node_offset);
        let num_blocks = cursor.u32();

        for i in 0..num_blocks {
            let bindex = self
                .bindex
                .read(self.data, cursor.pos() + self.bindex.bytes() * i as usize);
            if self.seen.insert(bindex) {
                self.collected.push(bindex);
            }
        }

        node_offset + 4 + align4(self.bindex.bytes() * num_blocks as usize)
    }

    fn skip_leaf(&self, node_offset: usize) -> usize {
        let num_blocks = read_u32(self.data, node_offset) as usize;
        node_offset + 4 + align4(self.bindex.bytes() * num_blocks)
    }
}
