//! Triangle-octree node decoding.
//!
//! A branch node opens with `TREE_SIZE:u16` and `CHILDREN:u16` (eight 2-bit
//! codes); a `TREE_SIZE` of zero means the real word count follows as
//! `TREE_SIZE_EX:u32`. `TREE_SIZE` covers the whole subtree including the
//! header, so any subtree can be skipped in constant time. A leaf holds
//! `NUM_BLOCKS:u32` followed by a 4-byte-padded block-index array.

use super::header::WORD_SIZE;
use super::view::{align4, read_u16, read_u32, IndexSize};

/// Node kind encoded in a parent's `CHILDREN` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriNodeKind {
    None,
    Branch,
    Leaf,
}

fn child_kind(children: u16, cindex: usize) -> TriNodeKind {
    match (children >> (2 * cindex)) & 0b11 {
        0 => TriNodeKind::None,
        1 => TriNodeKind::Branch,
        _ => TriNodeKind::Leaf,
    }
}

/// A node of the triangle octree, addressed by byte offset into the tile.
#[derive(Debug, Clone, Copy)]
pub struct TriNode<'a> {
    kind: TriNodeKind,
    data: &'a [u8],
    offset: usize,
}

/// Decoded branch header.
pub struct BranchHeader {
    /// Subtree size in words, including this header.
    pub tree_size: usize,
    /// Eight 2-bit child codes, x fastest.
    pub children: u16,
    /// Offset of the first child node.
    pub body: usize,
}

impl<'a> TriNode<'a> {
    /// The root node is always a branch.
    pub fn root(data: &'a [u8], offset: usize) -> Self {
        Self {
            kind: TriNodeKind::Branch,
            data,
            offset,
        }
    }

    pub fn kind(&self) -> TriNodeKind {
        self.kind
    }

    /// Parse this node's branch header.
    pub fn branch_header(&self) -> BranchHeader {
        debug_assert_eq!(self.kind, TriNodeKind::Branch);
        let mut tree_size = read_u16(self.data, self.offset) as usize;
        let children = read_u16(self.data, self.offset + 2);
        let body = if tree_size == 0 {
            tree_size = read_u32(self.data, self.offset + 4) as usize;
            self.offset + 8
        } else {
            self.offset + 4
        };
        BranchHeader {
            tree_size,
            children,
            body,
        }
    }

    /// Offset just past this branch's whole subtree.
    pub fn branch_end(&self) -> usize {
        let header = self.branch_header();
        self.offset + WORD_SIZE * header.tree_size
    }

    /// Number of block indices stored in this leaf.
    pub fn num_blocks(&self) -> u32 {
        debug_assert_eq!(self.kind, TriNodeKind::Leaf);
        read_u32(self.data, self.offset)
    }

    /// The `i`-th block index of this leaf.
    pub fn block_index(&self, i: u32, bindex: IndexSize) -> u32 {
        debug_assert_eq!(self.kind, TriNodeKind::Leaf);
        bindex.read(self.data, self.offset + 4 + bindex.bytes() * i as usize)
    }

    /// Offset just past this leaf's payload.
    pub fn leaf_end(&self, bindex: IndexSize) -> usize {
        let num_blocks = self.num_blocks() as usize;
        self.offset + 4 + align4(bindex.bytes() * num_blocks)
    }

    /// Child node `cindex`, skipping the earlier children in constant time
    /// per sibling. `bindex` is needed to size leaf payloads.
    pub fn child(&self, cindex: usize, bindex: IndexSize) -> TriNode<'a> {
        let header = self.branch_header();
        let mut cursor = header.body;

        for i in 0..cindex {
            match child_kind(header.children, i) {
                TriNodeKind::Branch => {
                    cursor = TriNode::root(self.data, cursor).branch_end();
                }
                TriNodeKind::Leaf => {
                    let leaf = TriNode {
                        kind: TriNodeKind::Leaf,
                        data: self.data,
                        offset: cursor,
                    };
                    cursor = leaf.leaf_end(bindex);
                }
                TriNodeKind::None => {}
            }
        }

        TriNode {
            kind: child_kind(header.children, cindex),
            data: self.data,
            offset: cursor,
        }
    }
}
