//! Nearest ray/triangle intersection over the tile mesh.
//!
//! The solver works in stored-position space: ray origin and direction are
//! scaled by 65535 so triangle vertices can be used as read. The parameter
//! `t` is invariant under that uniform scaling, so results are in the
//! caller's parameter scale. `limit` doubles as the no-hit sentinel and the
//! upper bound of the valid interval.
//!
//! Branch children are visited in ascending order of their slab-method
//! entry parameter; the first child subtree that reports a hit wins, since
//! the entry parameter lower-bounds everything inside the child's box.

use glam::DVec3;

use crate::hashset::IntHashSet;

use super::bcollect::BlockTable;
use super::header::{TileHeader, ALCS_TO_U16, NUM_TRI_CORNERS};
use super::rect::Rect;
use super::tri_node::{TriNode, TriNodeKind};
use super::view::{IndexSize, IndexWidth, W16, W32};

pub(crate) fn find_ray_distance(
    data: &[u8],
    header: &TileHeader,
    ray_pos: [f64; 3],
    ray_dir: [f64; 3],
    limit: f64,
    lrect: &Rect,
) -> f64 {
    let scale = ALCS_TO_U16 as f64;

    let mut solver = RaySolver {
        data,
        header,
        ray_pos: scale * DVec3::from_array(ray_pos),
        ray_dir: scale * DVec3::from_array(ray_dir),
        limit,
        lrect: *lrect,
        lrect_lower_dist: f64::MIN,
        lrect_upper_dist: f64::MAX,
        visited_blocks: IntHashSet::new(),
    };
    solver.setup_lrect_distance_bounds();

    if let Some(root) = header.root_node {
        solver.solve_branch(TriNode::root(data, root), &Rect::TILE)
    } else {
        let table = BlockTable::Single {
            num_triangles: header.num_triangles,
        };
        solver.solve_blocks(&[0], &table)
    }
}

struct RaySolver<'a> {
    data: &'a [u8],
    header: &'a TileHeader,

    /// Ray in stored-position space.
    ray_pos: DVec3,
    ray_dir: DVec3,

    /// No-hit sentinel and upper parameter bound.
    limit: f64,
    /// Limit box in the tile's local coordinates.
    lrect: Rect,

    /// Parameter interval in which the infinite ray is inside `lrect`.
    lrect_lower_dist: f64,
    lrect_upper_dist: f64,

    /// Blocks already scanned; a block reachable through several leaves is
    /// processed once per query.
    visited_blocks: IntHashSet,
}

impl RaySolver<'_> {
    fn setup_lrect_distance_bounds(&mut self) {
        let scale = ALCS_TO_U16 as f64;

        for i in 0..3 {
            let rect_lower = scale * self.lrect.lower[i] as f64;
            let rect_upper = scale * self.lrect.upper[i] as f64;
            let rni = self.ray_dir[i];

            if rni != 0.0 {
                let ta = (rect_lower - self.ray_pos[i]) / rni;
                let tb = (rect_upper - self.ray_pos[i]) / rni;
                let (t0, t1) = if rni > 0.0 { (ta, tb) } else { (tb, ta) };
                debug_assert!(t0 < t1);

                self.lrect_lower_dist = self.lrect_lower_dist.max(t0);
                self.lrect_upper_dist = self.lrect_upper_dist.min(t1);
                debug_assert!(self.lrect_lower_dist < self.lrect_upper_dist);
            } else {
                // Degenerate axis: the origin must lie within the slab.
                debug_assert!(
                    self.ray_pos[i] >= rect_lower && self.ray_pos[i] < rect_upper,
                    "ray parallel to axis {i} outside the limit box"
                );
            }
        }
    }

    fn solve_branch(&mut self, node: TriNode, node_rect: &Rect) -> f64 {
        debug_assert_eq!(node.kind(), TriNodeKind::Branch);

        for (cindex, child) in self.children_in_crossing_order(&node, node_rect) {
            let distance = match child.kind() {
                TriNodeKind::Branch => {
                    let child_rect = node_rect.child_octant(cindex);
                    self.solve_branch(child, &child_rect)
                }
                TriNodeKind::Leaf => self.solve_leaf(&child),
                TriNodeKind::None => unreachable!(),
            };

            if distance != self.limit {
                // Nearest-first order makes the first hit the answer.
                return distance;
            }
        }

        self.limit
    }

    /// Child nodes crossed by the ray within the limit box, nearest entry
    /// parameter first.
    fn children_in_crossing_order<'n>(
        &self,
        node: &TriNode<'n>,
        node_rect: &Rect,
    ) -> Vec<(usize, TriNode<'n>)> {
        let mut items: Vec<(f64, usize, TriNode)> = Vec::new();

        for cindex in 0..8 {
            let child = node.child(cindex, self.header.bindex);
            if child.kind() == TriNodeKind::None {
                continue;
            }

            let child_rect = node_rect.child_octant(cindex);
            if !child_rect.intersects(&self.lrect) {
                continue;
            }

            let distance = self.ray_distance_for_rect(&child_rect);
            if distance != self.limit {
                items.push((distance, cindex, child));
            }
        }

        items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        items
            .into_iter()
            .map(|(_, cindex, child)| (cindex, child))
            .collect()
    }

    /// Entry parameter of the ray into `rect` within `[0, limit]`, or
    /// `limit` when there is no crossing.
    fn ray_distance_for_rect(&self, rect: &Rect) -> f64 {
        let scale = ALCS_TO_U16 as f64;

        let mut tmin = 0.0f64;
        let mut tmax = self.limit;

        for i in 0..3 {
            let rect_lower = scale * rect.lower[i] as f64;
            let rect_upper = scale * rect.upper[i] as f64;
            let rni = self.ray_dir[i];

            if rni != 0.0 {
                let ta = (rect_lower - self.ray_pos[i]) / rni;
                let tb = (rect_upper - self.ray_pos[i]) / rni;
                let (t0, t1) = if rni > 0.0 { (ta, tb) } else { (tb, ta) };

                tmin = tmin.max(t0);
                tmax = tmax.min(t1);

                if tmin >= tmax {
                    return self.limit;
                }
            } else if self.ray_pos[i] < rect_lower || self.ray_pos[i] >= rect_upper {
                return self.limit;
            }
        }

        tmin
    }

    fn solve_leaf(&mut self, node: &TriNode) -> f64 {
        debug_assert_eq!(node.kind(), TriNodeKind::Leaf);

        let num_blocks = node.num_blocks();
        let mut fresh_blocks = Vec::with_capacity(num_blocks as usize);

        for i in 0..num_blocks {
            let bindex = node.block_index(i, self.header.bindex);
            if self.visited_blocks.insert(bindex) {
                fresh_blocks.push(bindex);
            }
        }

        let table = BlockTable::Stored {
            data: self.data,
            offset: self.header.tblock_table.expect("leaf implies a block table"),
            width: self.header.tindex,
            num_tblocks: self.header.num_tblocks,
            num_triangles: self.header.num_triangles,
        };
        self.solve_blocks(&fresh_blocks, &table)
    }

    fn solve_blocks(&self, blocks: &[u32], table: &BlockTable) -> f64 {
        let mut min_limit = self.limit;

        for &bindex in blocks {
            let (b_tid, e_tid) = table.range(bindex);
            min_limit = match self.header.vindex {
                IndexSize::U16 => self.solve_triangles::<W16>(b_tid, e_tid, min_limit),
                IndexSize::U32 => self.solve_triangles::<W32>(b_tid, e_tid, min_limit),
            };
        }

        min_limit
    }

    /// Scan a contiguous triangle range, returning the nearest accepted
    /// parameter (or `limit_in` unchanged).
    fn solve_triangles<W: IndexWidth>(&self, begin_tid: u32, end_tid: u32, limit_in: f64) -> f64 {
        let mut ldist = limit_in;

        for tid in begin_tid..end_tid {
            let a = self.triangle_points::<W>(tid);
            let r = self.ray_dir;
            let a1 = a[1] - a[0];
            let a2 = a[2] - a[0];
            let q = self.ray_pos - a[0];

            let n = a1.cross(a2);

            // Back-facing or parallel.
            if r.dot(n) >= 0.0 {
                continue;
            }

            let t = -q.dot(n) / r.dot(n);

            if t < self.lrect_lower_dist || t > self.lrect_upper_dist {
                continue;
            }
            if t <= 0.0 || t >= ldist {
                continue;
            }

            // Barycentric rejection via the Gram system of (a1, a2), with
            // the origin-to-plane projection of q.
            let a1_a1 = a1.dot(a1);
            let a1_a2 = a1.dot(a2);
            let a2_a2 = a2.dot(a2);

            let ka = 1.0 / (a1_a1 * a2_a2 - a1_a2 * a1_a2);
            let kq = q - n.dot(q) / n.dot(r) * r;

            let kc1 = a1.dot(kq);
            let kc2 = a2.dot(kq);

            let mu1 = ka * (a2_a2 * kc1 - a1_a2 * kc2);
            let mu2 = ka * (-a1_a2 * kc1 + a1_a1 * kc2);

            if mu1 < 0.0 || mu2 < 0.0 || 1.0 - mu1 - mu2 < 0.0 {
                continue;
            }

            ldist = t;
        }

        ldist
    }

    fn triangle_points<W: IndexWidth>(&self, tid: u32) -> [DVec3; NUM_TRI_CORNERS] {
        let triangle = self.header.triangle::<W>(self.data, tid);
        triangle.map(|vid| {
            let p = self.header.position(self.data, vid);
            DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64)
        })
    }
}
