//! Axis-aligned box clipping of the tile mesh.
//!
//! Candidate triangles come from the block collector. Each candidate is
//! classified by per-corner out-flags: fully-inside triangles keep their
//! original vertices (remapped to a compact index space in first-seen
//! order), fully-outside triangles are dropped, and straddling triangles are
//! clipped against the six box half-spaces in the barycentric space of the
//! original triangle, so attribute interpolation at the new vertices is
//! exact. The result buffer reproduces the input mesh section's layout with
//! a recomputed vertex-index width.

use std::borrow::Cow;

use glam::{Vec2, Vec3};

use crate::hashset::IntHashMap;

use super::bcollect::{self, BlockTable};
use super::header::{TileHeader, ALCS_TO_U16, DIM, NUM_COLOR_COMPOS, NUM_TRI_CORNERS};
use super::rect::Rect;
use super::view::{align4, read_u16, IndexSize, IndexWidth, W16, W32};

/// One clip result: a mesh section in the tile's own layout.
pub struct ClipOutput<'a> {
    pub num_vertices: u32,
    pub num_triangles: u32,
    pub data: Cow<'a, [u8]>,
}

/// Clip the mesh against a box given in the tile's local coordinates.
pub(crate) fn clip_mesh(data: &[u8], header: &TileHeader, clip_alcs: &Rect) -> ClipOutput<'static> {
    let (collected, table) = bcollect::collect(data, header, clip_alcs);

    let mut clipper = Clipper {
        data,
        header,
        clip_rect: scale_clip_rect(clip_alcs),
        index_map_a: IntHashMap::new(),
        tri_indices_a: Vec::new(),
        polygons_b: Vec::new(),
    };

    match header.vindex {
        IndexSize::U16 => clipper.collect_polygons::<W16>(&collected, &table),
        IndexSize::U32 => clipper.collect_polygons::<W32>(&collected, &table),
    }

    log::debug!(
        "clip: {} blocks, {} kept corners, {} clipped polygons",
        collected.len(),
        clipper.tri_indices_a.len(),
        clipper.polygons_b.len()
    );

    clipper.assemble()
}

/// Clip box in stored-position space. A face that coincides with the tile's
/// upper bound is nudged up by one ulp so positions rounded onto 65535 stay
/// inside.
fn scale_clip_rect(alcs: &Rect) -> Rect {
    let mut rect = Rect::new([0.0; 3], [0.0; 3]);
    for i in 0..DIM {
        rect.lower[i] = ALCS_TO_U16 * alcs.lower[i];
        let mut upper = ALCS_TO_U16 * alcs.upper[i];
        if alcs.upper[i] >= 1.0 {
            upper = upper.next_up();
        }
        rect.upper[i] = upper;
    }
    rect
}

/// Convex polygon in the barycentric space of its source triangle. A point
/// `(mu1, mu2)` maps to `(1 - mu1 - mu2) * A + mu1 * B + mu2 * C`.
struct Polygon {
    // Invariants: at least 3 vertices, counter-clockwise seen from the
    // front, every edge longer than zero.
    vertices: Vec<Vec2>,
    tid: u32,
}

impl Polygon {
    fn new(tid: u32) -> Self {
        Self {
            vertices: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            tid,
        }
    }

    fn num_triangles(&self) -> usize {
        self.vertices.len() - 2
    }

    /// Trim to the half-space `dot(n, v) + d >= 0`. Returns false when the
    /// polygon became empty or the entering/leaving edges could not be
    /// identified (a numeric anomaly; the caller drops the triangle).
    fn trim_by_plane(&mut self, n: Vec2, d: f32) -> bool {
        let count = self.vertices.len();
        debug_assert!(count >= 3);

        let dist: Vec<f32> = self.vertices.iter().map(|&v| n.dot(v) + d).collect();
        let dist_min = dist.iter().fold(f32::INFINITY, |m, &v| m.min(v));
        let dist_max = dist.iter().fold(f32::NEG_INFINITY, |m, &v| m.max(v));

        if dist_min >= 0.0 {
            return true;
        }
        if dist_max <= 0.0 {
            return false;
        }

        let next = |i: usize| if i == count - 1 { 0 } else { i + 1 };

        // Edge S: starts outside, ends inside or on the boundary.
        let Some(s_edge) = (0..count).find(|&e| dist[e] < 0.0 && dist[next(e)] >= 0.0) else {
            return false;
        };
        // Edge E: starts inside, ends outside or on the boundary.
        let Some(e_edge) = (0..count).find(|&e| dist[e] > 0.0 && dist[next(e)] <= 0.0) else {
            return false;
        };

        let mut new_vertices = Vec::with_capacity(count + 1);

        if dist[next(s_edge)] != 0.0 {
            new_vertices.push(self.cross_point(n, d, s_edge));
        }

        let mut vi = next(s_edge);
        loop {
            new_vertices.push(self.vertices[vi]);
            if vi == e_edge {
                break;
            }
            vi = next(vi);
        }

        new_vertices.push(self.cross_point(n, d, e_edge));

        debug_assert!(new_vertices.len() >= 3 && new_vertices.len() <= count + 1);
        self.vertices = new_vertices;
        true
    }

    /// Intersection of edge `eid` with the boundary `dot(n, v) + d == 0`.
    fn cross_point(&self, n: Vec2, d: f32, eid: usize) -> Vec2 {
        let end = if eid == self.vertices.len() - 1 { 0 } else { eid + 1 };
        let q = self.vertices[eid];
        let v = self.vertices[end] - q;
        debug_assert!(v.length_squared() > 0.0);
        let t = -(n.dot(q) + d) / n.dot(v);
        q + t * v
    }
}

struct Clipper<'a> {
    data: &'a [u8],
    header: &'a TileHeader,

    /// Clip box in stored-position space, upper faces ulp-extended.
    clip_rect: Rect,

    /// Old vertex index -> compact new index, first-seen order.
    index_map_a: IntHashMap<u32>,
    /// Triangles fully inside, as new vertex indices.
    tri_indices_a: Vec<u32>,
    /// Clipped polygons in barycentric space.
    polygons_b: Vec<Polygon>,
}

impl Clipper<'_> {
    fn collect_polygons<W: IndexWidth>(&mut self, collected: &[u32], table: &BlockTable) {
        for &bindex in collected {
            let (b_tid, e_tid) = table.range(bindex);
            debug_assert!(b_tid < e_tid);
            for tid in b_tid..e_tid {
                self.add_triangle::<W>(tid);
            }
        }
    }

    fn add_triangle<W: IndexWidth>(&mut self, tid: u32) {
        let corners = self.header.triangle::<W>(self.data, tid);
        let flags = corners.map(|vi| self.corner_flags(vi));

        if flags[0] | flags[1] | flags[2] == 0 {
            // Every corner inside: keep with remapped indices.
            for vi in corners {
                let next = self.index_map_a.len() as u32;
                let (new_index, _) = self.index_map_a.get_or_insert(vi, next);
                self.tri_indices_a.push(new_index);
            }
        } else if flags[0] & flags[1] & flags[2] != 0 {
            // Every corner violates a common half-space: certainly outside.
        } else {
            self.add_clipped_polygon(corners, tid);
        }
    }

    /// 6-bit out-code of a corner: bits 2i / 2i+1 flag lower / upper
    /// violation on axis i.
    fn corner_flags(&self, vid: u32) -> u32 {
        let pos = self.header.position(self.data, vid);
        let mut flag = 0;
        for ai in 0..DIM {
            let p = pos[ai] as f32;
            let lout = (p < self.clip_rect.lower[ai]) as u32;
            let uout = if p >= self.clip_rect.upper[ai] { 2 } else { 0 };
            flag |= (lout + uout) << (2 * ai);
        }
        flag
    }

    fn add_clipped_polygon(&mut self, corners: [u32; NUM_TRI_CORNERS], tid: u32) {
        let a: [Vec3; NUM_TRI_CORNERS] = corners.map(|vi| {
            let p = self.header.position(self.data, vi);
            Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32)
        });

        let mut polygon = Polygon::new(tid);

        for ai in 0..DIM {
            // Half-space projected into barycentric space: with the world
            // normal n, n_bary = (dot(B - A, n), dot(C - A, n)) and
            // d_bary = dot(n, A) + d. A zero n_bary means the triangle is
            // parallel to the plane; the out-flag test already rejected the
            // all-out case, so it is skipped.
            let edge = Vec2::new(a[1][ai] - a[0][ai], a[2][ai] - a[0][ai]);

            // Lower face, half-space toward +axis.
            if edge != Vec2::ZERO {
                let d_bary = a[0][ai] - self.clip_rect.lower[ai];
                if !polygon.trim_by_plane(edge, d_bary) {
                    return;
                }
            }

            // Upper face, half-space toward -axis.
            if edge != Vec2::ZERO {
                let d_bary = self.clip_rect.upper[ai] - a[0][ai];
                if !polygon.trim_by_plane(-edge, d_bary) {
                    return;
                }
            }
        }

        self.polygons_b.push(polygon);
    }

    fn assemble(self) -> ClipOutput<'static> {
        let a_vertices = self.index_map_a.len() as u32;

        let mut num_vertices = a_vertices;
        let mut num_triangles = (self.tri_indices_a.len() / NUM_TRI_CORNERS) as u32;
        for polygon in &self.polygons_b {
            num_vertices += polygon.vertices.len() as u32;
            num_triangles += polygon.num_triangles() as u32;
        }

        let vindex_out = IndexSize::for_count(num_vertices);

        let mut size = 0;
        let off_positions = size;
        size += align4(DIM * 2 * num_vertices as usize);
        let off_triangles = size;
        size += align4(NUM_TRI_CORNERS * vindex_out.bytes() * num_triangles as usize);
        let off_normals = self.header.normals.map(|_| {
            let at = size;
            size += align4(DIM * num_vertices as usize);
            at
        });
        let off_colors = self.header.colors.map(|_| {
            let at = size;
            size += align4(NUM_COLOR_COMPOS * num_vertices as usize);
            at
        });

        let mut buffer = vec![0u8; size];

        self.write_vertices_a(&mut buffer, off_positions, off_normals, off_colors);
        match self.header.vindex {
            IndexSize::U16 => {
                self.write_vertices_b::<W16>(&mut buffer, off_positions, off_normals, off_colors)
            }
            IndexSize::U32 => {
                self.write_vertices_b::<W32>(&mut buffer, off_positions, off_normals, off_colors)
            }
        }
        self.write_indices(&mut buffer, off_triangles, vindex_out);

        ClipOutput {
            num_vertices,
            num_triangles,
            data: Cow::Owned(buffer),
        }
    }

    /// Copy the attributes of every kept vertex to its new slot. Elements
    /// are 1- or 2-byte little-endian, so a raw byte copy preserves them.
    fn write_vertices_a(
        &self,
        buffer: &mut [u8],
        off_positions: usize,
        off_normals: Option<usize>,
        off_colors: Option<usize>,
    ) {
        for (old_index, new_index) in self.index_map_a.iter() {
            let old = old_index as usize;
            let new = new_index as usize;

            let src = self.header.positions + DIM * 2 * old;
            let dst = off_positions + DIM * 2 * new;
            buffer[dst..dst + DIM * 2].copy_from_slice(&self.data[src..src + DIM * 2]);

            if let (Some(n_src), Some(n_dst)) = (self.header.normals, off_normals) {
                let src = n_src + DIM * old;
                let dst = n_dst + DIM * new;
                buffer[dst..dst + DIM].copy_from_slice(&self.data[src..src + DIM]);
            }

            if let (Some(c_src), Some(c_dst)) = (self.header.colors, off_colors) {
                let src = c_src + NUM_COLOR_COMPOS * old;
                let dst = c_dst + NUM_COLOR_COMPOS * new;
                buffer[dst..dst + NUM_COLOR_COMPOS]
                    .copy_from_slice(&self.data[src..src + NUM_COLOR_COMPOS]);
            }
        }
    }

    /// Emit the clipped polygons' vertices by barycentric interpolation of
    /// the source triangle's attributes, rounding to each destination
    /// integer type. Normal lengths are left as interpolated.
    fn write_vertices_b<W: IndexWidth>(
        &self,
        buffer: &mut [u8],
        off_positions: usize,
        off_normals: Option<usize>,
        off_colors: Option<usize>,
    ) {
        let mut dst_vindex = self.index_map_a.len();

        for polygon in &self.polygons_b {
            let triangle = self.header.triangle::<W>(self.data, polygon.tid);

            for coord in &polygon.vertices {
                let mu = [1.0 - coord.x - coord.y, coord.x, coord.y];

                for e in 0..DIM {
                    let mut value = 0.0f32;
                    for ci in 0..NUM_TRI_CORNERS {
                        let src = self.header.positions + DIM * 2 * triangle[ci] as usize;
                        value += mu[ci] * read_u16(self.data, src + 2 * e) as f32;
                    }
                    let dst = off_positions + DIM * 2 * dst_vindex + 2 * e;
                    buffer[dst..dst + 2].copy_from_slice(&(value.round() as u16).to_le_bytes());
                }

                if let (Some(n_src), Some(n_dst)) = (self.header.normals, off_normals) {
                    for e in 0..DIM {
                        let mut value = 0.0f32;
                        for ci in 0..NUM_TRI_CORNERS {
                            let src = n_src + DIM * triangle[ci] as usize;
                            value += mu[ci] * (self.data[src + e] as i8) as f32;
                        }
                        buffer[n_dst + DIM * dst_vindex + e] = (value.round() as i8) as u8;
                    }
                }

                if let (Some(c_src), Some(c_dst)) = (self.header.colors, off_colors) {
                    for e in 0..NUM_COLOR_COMPOS {
                        let mut value = 0.0f32;
                        for ci in 0..NUM_TRI_CORNERS {
                            let src = c_src + NUM_COLOR_COMPOS * triangle[ci] as usize;
                            value += mu[ci] * self.data[src + e] as f32;
                        }
                        buffer[c_dst + NUM_COLOR_COMPOS * dst_vindex + e] = value.round() as u8;
                    }
                }

                dst_vindex += 1;
            }
        }
    }

    fn write_indices(&self, buffer: &mut [u8], off_triangles: usize, vindex_out: IndexSize) {
        let w = vindex_out.bytes();

        for (i, &index) in self.tri_indices_a.iter().enumerate() {
            vindex_out.write(buffer, off_triangles + w * i, index);
        }

        // Clipped polygons become triangle fans over fresh vertices.
        let mut dst = off_triangles + w * self.tri_indices_a.len();
        let mut vindex = self.index_map_a.len() as u32;

        for polygon in &self.polygons_b {
            let num_corners = polygon.vertices.len() as u32;
            for ci in 2..num_corners {
                vindex_out.write(buffer, dst, vindex);
                vindex_out.write(buffer, dst + w, vindex + ci - 1);
                vindex_out.write(buffer, dst + 2 * w, vindex + ci);
                dst += 3 * w;
            }
            vindex += num_corners;
        }
    }
}
