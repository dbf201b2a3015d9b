//! Synthetic tile construction for the integration tests.
//!
//! Builds byte buffers in the tile binary layout: descendants subtree, mesh
//! preamble, 4-byte-padded arrays, and an optional triangle-block tree.

#![allow(dead_code)]

/// Node of the descendants subtree.
pub enum DescNode {
    EmptyVoid,
    EmptyGeom,
    Leaf,
    Branch(Box<[Option<DescNode>; 8]>),
}

impl DescNode {
    fn code(&self) -> u16 {
        match self {
            DescNode::EmptyVoid => 0,
            DescNode::EmptyGeom => 1,
            DescNode::Branch(_) => 2,
            DescNode::Leaf => 3,
        }
    }
}

/// Encode a descendants subtree; only branch children occupy bytes.
pub fn encode_desc_tree(node: &DescNode) -> Vec<u8> {
    let DescNode::Branch(children) = node else {
        panic!("descendants root must be a branch");
    };

    let mut codes = 0u16;
    let mut body = Vec::new();
    for (i, child) in children.iter().enumerate() {
        if let Some(child) = child {
            codes |= child.code() << (2 * i);
            if matches!(child, DescNode::Branch(_)) {
                body.extend_from_slice(&encode_desc_tree(child));
            }
        }
    }

    let tree_size = (4 + body.len()) / 4;
    let mut out = Vec::new();
    out.extend_from_slice(&(tree_size as u16).to_le_bytes());
    out.extend_from_slice(&codes.to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Empty descendants root: every child octant void.
pub fn empty_desc_tree() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Descendants branch with the given children.
pub fn desc_branch(children: [Option<DescNode>; 8]) -> DescNode {
    DescNode::Branch(Box::new(children))
}

/// Node of the triangle-block octree.
pub enum TriTreeNode {
    Branch(Box<[Option<TriTreeNode>; 8]>),
    /// Block indices, encoded at u16 width.
    Leaf(Vec<u16>),
}

/// Triangle-tree branch with the given children.
pub fn tri_branch(children: [Option<TriTreeNode>; 8]) -> TriTreeNode {
    TriTreeNode::Branch(Box::new(children))
}

/// Encode a triangle-octree subtree. `TREE_SIZE` covers branch subtrees
/// including their headers and leaf payloads.
pub fn encode_tri_tree(node: &TriTreeNode) -> Vec<u8> {
    match node {
        TriTreeNode::Leaf(blocks) => {
            let mut out = Vec::new();
            out.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
            for &block in blocks {
                out.extend_from_slice(&block.to_le_bytes());
            }
            pad4(&mut out);
            out
        }
        TriTreeNode::Branch(children) => {
            let mut codes = 0u16;
            let mut body = Vec::new();
            for (i, child) in children.iter().enumerate() {
                if let Some(child) = child {
                    let code = match child {
                        TriTreeNode::Branch(_) => 1u16,
                        TriTreeNode::Leaf(_) => 2,
                    };
                    codes |= code << (2 * i);
                    body.extend_from_slice(&encode_tri_tree(child));
                }
            }

            let tree_size = (4 + body.len()) / 4;
            let mut out = Vec::new();
            out.extend_from_slice(&(tree_size as u16).to_le_bytes());
            out.extend_from_slice(&codes.to_le_bytes());
            out.extend_from_slice(&body);
            out
        }
    }
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Tile byte-buffer builder. Index widths follow the format's count
/// thresholds; all test meshes stay in the 2-byte range.
pub struct TileBuilder {
    desc_tree: Vec<u8>,
    positions: Vec<[u16; 3]>,
    triangles: Vec<[u16; 3]>,
    normals: Option<Vec<[i8; 3]>>,
    colors: Option<Vec<[u8; 3]>>,
    tblock_table: Option<Vec<u16>>,
    tri_tree: Option<Vec<u8>>,
}

impl TileBuilder {
    pub fn new() -> Self {
        Self {
            desc_tree: empty_desc_tree(),
            positions: Vec::new(),
            triangles: Vec::new(),
            normals: None,
            colors: None,
            tblock_table: None,
            tri_tree: None,
        }
    }

    pub fn desc_tree(mut self, tree: Vec<u8>) -> Self {
        self.desc_tree = tree;
        self
    }

    /// Add a vertex by its position in the tile's unit cube.
    pub fn vertex(mut self, pos: [f32; 3]) -> Self {
        self.positions
            .push(pos.map(|c| (c * 65535.0).round() as u16));
        self
    }

    pub fn triangle(mut self, corners: [u16; 3]) -> Self {
        self.triangles.push(corners);
        self
    }

    pub fn normals(mut self, normals: Vec<[i8; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn colors(mut self, colors: Vec<[u8; 3]>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Attach a triangle-block tree: the table maps block index to first
    /// triangle, the tree references blocks.
    pub fn tri_tree(mut self, table: Vec<u16>, tree: &TriTreeNode) -> Self {
        self.tblock_table = Some(table);
        self.tri_tree = Some(encode_tri_tree(tree));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut contents = 0u32;
        if self.normals.is_some() {
            contents |= 1;
        }
        if self.colors.is_some() {
            contents |= 1 << 1;
        }
        if self.tri_tree.is_some() {
            contents |= 1 << 8;
        }

        let mut out = self.desc_tree.clone();
        out.extend_from_slice(&contents.to_le_bytes());
        out.extend_from_slice(&(self.positions.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.triangles.len() as u32).to_le_bytes());

        for pos in &self.positions {
            for &c in pos {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        pad4(&mut out);

        for tri in &self.triangles {
            for &vi in tri {
                out.extend_from_slice(&vi.to_le_bytes());
            }
        }
        pad4(&mut out);

        if let Some(normals) = &self.normals {
            assert_eq!(normals.len(), self.positions.len());
            for n in normals {
                for &c in n {
                    out.push(c as u8);
                }
            }
            pad4(&mut out);
        }

        if let Some(colors) = &self.colors {
            assert_eq!(colors.len(), self.positions.len());
            for c in colors {
                out.extend_from_slice(c);
            }
            pad4(&mut out);
        }

        if let (Some(table), Some(tree)) = (&self.tblock_table, &self.tri_tree) {
            out.extend_from_slice(&(table.len() as u32).to_le_bytes());
            for &start in table {
                out.extend_from_slice(&start.to_le_bytes());
            }
            pad4(&mut out);
            out.extend_from_slice(tree);
        }

        out
    }
}

/// The mesh section of a built tile (positions through the last attribute
/// array), for byte-identity checks against clip output.
pub fn mesh_section(tile_bytes: &[u8]) -> &[u8] {
    let desc_words = u16::from_le_bytes([tile_bytes[0], tile_bytes[1]]) as usize;
    let preamble = 4 * desc_words;
    let contents = u32::from_le_bytes(tile_bytes[preamble..preamble + 4].try_into().unwrap());
    let num_vertices = u32::from_le_bytes(tile_bytes[preamble + 4..preamble + 8].try_into().unwrap())
        as usize;
    let num_triangles =
        u32::from_le_bytes(tile_bytes[preamble + 8..preamble + 12].try_into().unwrap()) as usize;

    let align4 = |n: usize| (n + 3) & !3;
    let start = preamble + 12;
    let mut end = start;
    end += align4(6 * num_vertices);
    end += align4(6 * num_triangles); // u16 vertex indices in all test tiles
    if contents & 1 != 0 {
        end += align4(3 * num_vertices);
    }
    if contents & 2 != 0 {
        end += align4(3 * num_vertices);
    }
    &tile_bytes[start..end]
}
