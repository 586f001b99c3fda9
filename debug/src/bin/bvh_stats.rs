//! Headless check: builds the scene BVH over a procedural field of boxes and
//! prints its shape. Useful when bisecting build regressions without a GPU.

use ember_scene::{Bvh, TriNormals, Triangle};
use glam::Vec3;

fn boxes(count: u32) -> (Vec<Triangle>, Vec<TriNormals>) {
    let mut prims = Vec::new();
    let mut norms = Vec::new();
    for i in 0..count {
        // Deterministic pseudo-random placement.
        let h = (i.wrapping_mul(2654435761)) as f32 / u32::MAX as f32;
        let v = (i.wrapping_mul(40503).wrapping_add(9)) as f32 / u32::MAX as f32;
        let base = Vec3::new(h * 40.0 - 20.0, v * 8.0, (h * v) * 40.0 - 20.0);
        prims.push(Triangle::new(
            base,
            base + Vec3::new(0.5, 0.0, 0.0),
            base + Vec3::new(0.0, 0.5, 0.1),
            Vec3::ONE,
        ));
        norms.push(TriNormals::new(Vec3::Z, Vec3::Z, Vec3::Z));
    }
    (prims, norms)
}

fn main() {
    ember_bridge::init_logging("log.txt", log::LevelFilter::Info);

    for count in [2u32, 64, 1024, 16384] {
        let (prims, norms) = boxes(count);
        let mut bvh = Bvh::default();
        bvh.build(&prims, &norms);

        let leaves = bvh
            .gpu_nodes
            .iter()
            .filter(|n| n.prim_count > 0)
            .count();
        let max_leaf = bvh
            .gpu_nodes
            .iter()
            .map(|n| n.prim_count)
            .max()
            .unwrap_or(0);
        log::info!(
            target: "program",
            "{count} tris: {} nodes ({} used), {leaves} leaves, widest leaf {max_leaf}",
            bvh.gpu_nodes.len(),
            bvh.nodes_used,
        );
        assert!(bvh.nodes_used <= 2 * count.max(1));
    }
}
