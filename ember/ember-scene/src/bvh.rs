//! Scene bounding volume hierarchy: binned-SAH build over the triangle soup,
//! plus the cache-line-friendly GPU node layout consumed by the ray kernels.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::{Aabb, TriNormals, Triangle};

const BINS: usize = 8;

/// CPU BVH node. Leaves have `prim_count > 0` and treat `left_first` as the
/// start of their primitive range; internal nodes store the left child index
/// (right child is always `left_first + 1`).
#[derive(Clone, Copy, Debug, Default)]
pub struct BvhNode {
    pub min: Vec3,
    pub left_first: u32,
    pub max: Vec3,
    pub prim_count: u32,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        self.prim_count > 0
    }
}

/// BVH node optimized for GPU ray tracing: both children's bounds live inline
/// so traversal never chases an extra indirection.
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct GpuNode {
    pub lmin: Vec3,
    pub left: u32,
    pub lmax: Vec3,
    pub right: u32,
    pub rmin: Vec3,
    pub prim_index: u32,
    pub rmax: Vec3,
    pub prim_count: u32,
}

/// Bounding volume hierarchy over the scene triangles. The primitive and
/// normal arrays are reordered in place during the build so every leaf owns a
/// contiguous range.
#[derive(Default)]
pub struct Bvh {
    pub nodes: Vec<BvhNode>,
    /// Node 1 is intentionally skipped so every child pair shares a cache line.
    pub nodes_used: u32,
    pub prims: Vec<Triangle>,
    pub norms: Vec<TriNormals>,
    pub gpu_nodes: Vec<GpuNode>,
}

impl Bvh {
    pub fn prim_count(&self) -> u32 {
        self.prims.len() as u32
    }

    /// Build the BVH over a copy of the given primitives.
    pub fn build(&mut self, prims: &[Triangle], norms: &[TriNormals]) {
        debug_assert_eq!(prims.len(), norms.len());
        self.prims = prims.to_vec();
        self.norms = norms.to_vec();
        self.nodes.clear();
        self.gpu_nodes.clear();
        self.nodes_used = 0;

        let n = self.prims.len() as u32;
        if n == 0 {
            return;
        }

        self.nodes = vec![BvhNode::default(); (n as usize * 2).max(2)];
        let root = &mut self.nodes[0];
        root.left_first = 0;
        root.prim_count = n;
        // Skip the second slot, for better child node cache alignment.
        self.nodes_used = 2;

        self.refit(0);
        self.subdivide(0);
        self.flatten();
    }

    /// Recompute a node's bounds to snugly include its primitives.
    fn refit(&mut self, node_idx: usize) {
        let (first, count) = {
            let node = &self.nodes[node_idx];
            (node.left_first as usize, node.prim_count as usize)
        };
        let mut aabb = Aabb::default();
        for prim in &self.prims[first..first + count] {
            aabb.grow(prim.v0);
            aabb.grow(prim.v1);
            aabb.grow(prim.v2);
        }
        self.nodes[node_idx].min = aabb.min;
        self.nodes[node_idx].max = aabb.max;
    }

    fn subdivide(&mut self, node_idx: usize) {
        let node = self.nodes[node_idx];
        if node.prim_count <= 2 {
            return;
        }

        let (split_cost, axis, t) = self.find_best_split(&node);

        let e = node.max - node.min;
        let parent_area = e.x * e.x + e.y * e.y + e.z * e.z;
        let parent_cost = node.prim_count as f32 * parent_area;
        if split_cost >= parent_cost {
            return;
        }

        // Partition the primitive range in place, keeping normals aligned.
        let mut i = node.left_first as usize;
        let mut j = i + node.prim_count as usize - 1;
        while i <= j {
            if self.prims[i].centroid()[axis] < t {
                i += 1;
            } else {
                self.prims.swap(i, j);
                self.norms.swap(i, j);
                if j == 0 {
                    break;
                }
                j -= 1;
            }
        }

        let left_count = i as u32 - node.left_first;
        if left_count == 0 || left_count == node.prim_count {
            return;
        }

        let left_child = self.nodes_used as usize;
        let right_child = left_child + 1;
        self.nodes_used += 2;
        self.nodes[left_child].left_first = node.left_first;
        self.nodes[left_child].prim_count = left_count;
        self.nodes[right_child].left_first = i as u32;
        self.nodes[right_child].prim_count = node.prim_count - left_count;
        self.nodes[node_idx].left_first = left_child as u32;
        self.nodes[node_idx].prim_count = 0;

        self.refit(left_child);
        self.refit(right_child);

        self.subdivide(left_child);
        self.subdivide(right_child);
    }

    /// Binned SAH split search: 8 bins per axis, 7 candidate planes, prefix
    /// and suffix scans for the per-plane bounds and counts.
    fn find_best_split(&self, node: &BvhNode) -> (f32, usize, f32) {
        let first = node.left_first as usize;
        let count = node.prim_count as usize;

        let mut lowest_cost = f32::MAX;
        let mut best_axis = 0;
        let mut best_t = 0.0;

        for axis in 0..3 {
            let mut bmin = f32::MAX;
            let mut bmax = f32::MIN;
            for prim in &self.prims[first..first + count] {
                let c = prim.centroid()[axis];
                bmin = bmin.min(c);
                bmax = bmax.max(c);
            }
            if bmin == bmax {
                continue;
            }

            let mut bin_bounds = [Aabb::default(); BINS];
            let mut bin_counts = [0u32; BINS];
            let scale = BINS as f32 / (bmax - bmin);
            for prim in &self.prims[first..first + count] {
                let bin = (((prim.centroid()[axis] - bmin) * scale) as usize).min(BINS - 1);
                bin_counts[bin] += 1;
                bin_bounds[bin].grow_aabb(&prim.aabb());
            }

            let mut l_areas = [0.0f32; BINS - 1];
            let mut r_areas = [0.0f32; BINS - 1];
            let mut l_counts = [0u32; BINS - 1];
            let mut r_counts = [0u32; BINS - 1];
            let mut l_aabb = Aabb::default();
            let mut r_aabb = Aabb::default();
            let mut l_sum = 0;
            let mut r_sum = 0;
            for i in 0..BINS - 1 {
                l_sum += bin_counts[i];
                l_counts[i] = l_sum;
                l_aabb.grow_aabb(&bin_bounds[i]);
                l_areas[i] = l_aabb.area();

                r_sum += bin_counts[BINS - 1 - i];
                r_counts[BINS - 2 - i] = r_sum;
                r_aabb.grow_aabb(&bin_bounds[BINS - 1 - i]);
                r_areas[BINS - 2 - i] = r_aabb.area();
            }

            let scale = (bmax - bmin) / BINS as f32;
            for i in 0..BINS - 1 {
                let cost = l_counts[i] as f32 * l_areas[i] + r_counts[i] as f32 * r_areas[i];
                if cost < lowest_cost {
                    lowest_cost = cost;
                    best_axis = axis;
                    best_t = bmin + scale * (i + 1) as f32;
                }
            }
        }

        (lowest_cost, best_axis, best_t)
    }

    /// Emit GPU nodes contiguously. Internal nodes carry both children's
    /// bounds; the right child offset is patched when its parent is popped.
    fn flatten(&mut self) {
        self.gpu_nodes = vec![GpuNode::default(); self.nodes_used as usize];

        let mut alt_node = 0u32;
        let mut node_ptr = 0usize;
        let mut stack = [0u32; 128];
        let mut stack_ptr = 0usize;
        loop {
            let node = self.nodes[node_ptr];
            let idx = alt_node as usize;
            alt_node += 1;
            if node.is_leaf() {
                self.gpu_nodes[idx].prim_count = node.prim_count;
                self.gpu_nodes[idx].prim_index = node.left_first;
                if stack_ptr == 0 {
                    break;
                }
                stack_ptr -= 1;
                node_ptr = stack[stack_ptr] as usize;
                stack_ptr -= 1;
                let parent = stack[stack_ptr] as usize;
                self.gpu_nodes[parent].right = alt_node;
                continue;
            }
            let left = self.nodes[node.left_first as usize];
            let right = self.nodes[node.left_first as usize + 1];
            self.gpu_nodes[idx].lmin = left.min;
            self.gpu_nodes[idx].lmax = left.max;
            self.gpu_nodes[idx].rmin = right.min;
            self.gpu_nodes[idx].rmax = right.max;
            self.gpu_nodes[idx].left = alt_node;
            stack[stack_ptr] = idx as u32;
            stack[stack_ptr + 1] = node.left_first + 1;
            stack_ptr += 2;
            node_ptr = node.left_first as usize;
        }

        self.gpu_nodes.truncate(alt_node as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn quad(center: Vec3, size: f32, color: Vec3) -> [Triangle; 2] {
        let h = size * 0.5;
        let a = center + Vec3::new(-h, -h, 0.0);
        let b = center + Vec3::new(h, -h, 0.0);
        let c = center + Vec3::new(h, h, 0.0);
        let d = center + Vec3::new(-h, h, 0.0);
        [Triangle::new(a, b, c, color), Triangle::new(a, c, d, color)]
    }

    fn random_scene(rng: &mut StdRng, count: usize) -> (Vec<Triangle>, Vec<TriNormals>) {
        let mut prims = Vec::with_capacity(count);
        for _ in 0..count {
            let p = Vec3::new(
                rng.gen::<f32>() * 40.0 - 20.0,
                rng.gen::<f32>() * 40.0 - 20.0,
                rng.gen::<f32>() * 40.0 - 20.0,
            );
            prims.push(Triangle::new(
                p,
                p + Vec3::new(0.4, 0.1, 0.0),
                p + Vec3::new(0.0, 0.4, 0.2),
                Vec3::ONE,
            ));
        }
        let norms = vec![TriNormals::default(); count];
        (prims, norms)
    }

    fn check_invariants(bvh: &Bvh) {
        assert!(bvh.nodes_used <= 2 * bvh.prim_count().max(1));

        // Every internal node tightly contains both children; every leaf
        // contains all triangles it references.
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &bvh.nodes[idx];
            let aabb = Aabb::new(node.min, node.max);
            if node.is_leaf() {
                let first = node.left_first as usize;
                for prim in &bvh.prims[first..first + node.prim_count as usize] {
                    assert!(aabb.contains(prim.v0));
                    assert!(aabb.contains(prim.v1));
                    assert!(aabb.contains(prim.v2));
                }
            } else {
                let left = &bvh.nodes[node.left_first as usize];
                let right = &bvh.nodes[node.left_first as usize + 1];
                // Child pairs are consecutive and start on an even index.
                assert_eq!(node.left_first % 2, 0);
                assert!(aabb.contains_aabb(&Aabb::new(left.min, left.max)));
                assert!(aabb.contains_aabb(&Aabb::new(right.min, right.max)));
                stack.push(node.left_first as usize);
                stack.push(node.left_first as usize + 1);
            }
        }
    }

    fn triangle_key(tri: &Triangle) -> [u32; 9] {
        [
            tri.v0.x.to_bits(),
            tri.v0.y.to_bits(),
            tri.v0.z.to_bits(),
            tri.v1.x.to_bits(),
            tri.v1.y.to_bits(),
            tri.v1.z.to_bits(),
            tri.v2.x.to_bits(),
            tri.v2.y.to_bits(),
            tri.v2.z.to_bits(),
        ]
    }

    #[test]
    fn empty_scene_builds_nothing() {
        let mut bvh = Bvh::default();
        bvh.build(&[], &[]);
        assert_eq!(bvh.nodes_used, 0);
        assert!(bvh.gpu_nodes.is_empty());
        assert!(bvh.prims.is_empty());
    }

    #[test]
    fn two_triangles_stay_one_leaf() {
        let tris = quad(Vec3::new(0.0, 0.0, -3.0), 1.0, Vec3::ONE);
        let norms = [TriNormals::default(); 2];
        let mut bvh = Bvh::default();
        bvh.build(&tris, &norms);
        assert_eq!(bvh.nodes_used, 2);
        assert!(bvh.nodes[0].is_leaf());
        assert_eq!(bvh.nodes[0].prim_count, 2);
        assert_eq!(bvh.gpu_nodes.len(), 1);
        assert_eq!(bvh.gpu_nodes[0].prim_count, 2);
    }

    #[test]
    fn build_reorders_but_preserves_the_primitive_multiset() {
        let mut rng = StdRng::seed_from_u64(7);
        let (prims, norms) = random_scene(&mut rng, 256);
        let mut bvh = Bvh::default();
        bvh.build(&prims, &norms);

        let mut before: Vec<_> = prims.iter().map(triangle_key).collect();
        let mut after: Vec<_> = bvh.prims.iter().map(triangle_key).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);

        check_invariants(&bvh);
    }

    #[test]
    fn leaf_ranges_partition_the_primitive_array() {
        let mut rng = StdRng::seed_from_u64(3);
        let (prims, norms) = random_scene(&mut rng, 300);
        let mut bvh = Bvh::default();
        bvh.build(&prims, &norms);

        let mut covered = vec![0u32; prims.len()];
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &bvh.nodes[idx];
            if node.is_leaf() {
                for i in node.left_first..node.left_first + node.prim_count {
                    covered[i as usize] += 1;
                }
            } else {
                stack.push(node.left_first as usize);
                stack.push(node.left_first as usize + 1);
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    // Reference traversal over the packed GPU nodes, counting visited nodes.
    fn ray_aabb(origin: Vec3, inv_dir: Vec3, min: Vec3, max: Vec3) -> bool {
        let t1 = (min - origin) * inv_dir;
        let t2 = (max - origin) * inv_dir;
        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();
        tmax >= tmin.max(0.0)
    }

    fn ray_triangle(origin: Vec3, dir: Vec3, tri: &Triangle) -> Option<f32> {
        let e1 = tri.v1 - tri.v0;
        let e2 = tri.v2 - tri.v0;
        let h = dir.cross(e2);
        let a = e1.dot(h);
        if a.abs() < 1e-8 {
            return None;
        }
        let f = 1.0 / a;
        let s = origin - tri.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = f * dir.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = f * e2.dot(q);
        (t > 1e-5).then_some(t)
    }

    fn traverse(bvh: &Bvh, origin: Vec3, dir: Vec3) -> (Option<f32>, u32) {
        if bvh.gpu_nodes.is_empty() {
            return (None, 0);
        }
        let inv_dir = dir.recip();
        let mut visited = 0;
        let mut best: Option<f32> = None;
        let mut stack = vec![0u32];
        while let Some(idx) = stack.pop() {
            visited += 1;
            let node = &bvh.gpu_nodes[idx as usize];
            if node.prim_count > 0 {
                let first = node.prim_index as usize;
                for prim in &bvh.prims[first..first + node.prim_count as usize] {
                    if let Some(t) = ray_triangle(origin, dir, prim) {
                        best = Some(best.map_or(t, |b: f32| b.min(t)));
                    }
                }
                continue;
            }
            if ray_aabb(origin, inv_dir, node.lmin, node.lmax) {
                stack.push(node.left);
            }
            if ray_aabb(origin, inv_dir, node.rmin, node.rmax) {
                stack.push(node.right);
            }
        }
        (best, visited)
    }

    #[test]
    fn packed_nodes_trace_like_the_source_triangles() {
        let tris = quad(Vec3::new(0.0, 0.0, -3.0), 2.0, Vec3::new(1.0, 0.0, 0.0));
        let norms = [TriNormals::default(); 2];
        let mut bvh = Bvh::default();
        bvh.build(&tris, &norms);

        let (hit, _) = traverse(&bvh, Vec3::ZERO, Vec3::NEG_Z);
        let t = hit.expect("center ray must hit the quad");
        assert!((t - 3.0).abs() < 1e-4);

        let (miss, _) = traverse(&bvh, Vec3::ZERO, Vec3::Z);
        assert!(miss.is_none());
    }

    #[test]
    fn traversal_cost_is_stable_under_input_permutation() {
        let mut rng = StdRng::seed_from_u64(11);
        let (prims, norms) = random_scene(&mut rng, 400);

        let rays: Vec<(Vec3, Vec3)> = (0..64)
            .map(|_| {
                let origin = Vec3::new(
                    rng.gen::<f32>() * 10.0 - 5.0,
                    rng.gen::<f32>() * 10.0 - 5.0,
                    30.0,
                );
                (origin, Vec3::new(0.0, 0.0, -1.0))
            })
            .collect();

        let cost = |prims: &[Triangle], norms: &[TriNormals]| -> u64 {
            let mut bvh = Bvh::default();
            bvh.build(prims, norms);
            check_invariants(&bvh);
            rays.iter().map(|&(o, d)| traverse(&bvh, o, d).1 as u64).sum()
        };

        let base = cost(&prims, &norms);
        for seed in 0..3 {
            let mut indices: Vec<usize> = (0..prims.len()).collect();
            indices.shuffle(&mut StdRng::seed_from_u64(seed));
            let p: Vec<_> = indices.iter().map(|&i| prims[i]).collect();
            let n: Vec<_> = indices.iter().map(|&i| norms[i]).collect();
            let permuted = cost(&p, &n);
            let ratio = permuted.max(base) as f64 / permuted.min(base).max(1) as f64;
            assert!(ratio < 3.0, "traversal cost diverged: {base} vs {permuted}");
        }
    }
}
