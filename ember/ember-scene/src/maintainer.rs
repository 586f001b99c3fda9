//! Keeps the scene BVH in sync with the world's drawable meshes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::{Mat4, Vec3};
use render_api::World;

use crate::{Bvh, TriNormals, Triangle};

/// Scene BVH maintainer. The triangle soup is rebuilt whenever the drawable
/// set changes, identified by a hash over (entity, triangle count, transform).
/// Moving or re-meshing an entity therefore triggers a full rebuild; a static
/// scene builds exactly once.
#[derive(Default)]
pub struct BvhMaintainer {
    pub bvh: Bvh,
    mesh_set_hash: Option<u64>,
}

fn mesh_set_hash(world: &World) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (entity, mesh, transform) in world.meshes() {
        entity.hash(&mut hasher);
        mesh.tri_count.hash(&mut hasher);
        for v in transform.model().to_cols_array() {
            v.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

impl BvhMaintainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the BVH if the drawable set changed since the last call.
    /// Returns true when a rebuild happened.
    pub fn maintain(&mut self, world: &World) -> bool {
        let hash = mesh_set_hash(world);
        if self.mesh_set_hash == Some(hash) {
            return false;
        }
        self.mesh_set_hash = Some(hash);

        let mut triangles = Vec::with_capacity(1024);
        let mut normals = Vec::with_capacity(1024);

        for (_, mesh, transform) in world.meshes() {
            let model = transform.model();
            collect_mesh(&mut triangles, &mut normals, mesh, &model);
        }

        log::info!(
            target: "program",
            "rebuilding scene bvh over {} triangles",
            triangles.len()
        );
        self.bvh.build(&triangles, &normals);
        true
    }
}

fn collect_mesh(
    triangles: &mut Vec<Triangle>,
    normals: &mut Vec<TriNormals>,
    mesh: &render_api::Mesh,
    model: &Mat4,
) {
    let pos = |v: Vec3| model.transform_point3(v);
    let nrm = |n: Vec3| model.transform_vector3(n).normalize_or_zero();

    let vertex = |i: usize| -> usize {
        if mesh.indices.is_empty() {
            i
        } else {
            mesh.indices[i] as usize
        }
    };

    for tri in 0..mesh.tri_count {
        let (i0, i1, i2) = (vertex(tri * 3), vertex(tri * 3 + 1), vertex(tri * 3 + 2));
        triangles.push(Triangle::new(
            pos(mesh.vertices[i0]),
            pos(mesh.vertices[i1]),
            pos(mesh.vertices[i2]),
            mesh.material,
        ));
        normals.push(TriNormals::new(
            nrm(mesh.normals[i0]),
            nrm(mesh.normals[i1]),
            nrm(mesh.normals[i2]),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_api::{Mesh, Transform};

    fn triangle_mesh() -> Mesh {
        Mesh::from_triangles(
            &[[
                Vec3::new(-1.0, 0.0, -3.0),
                Vec3::new(1.0, 0.0, -3.0),
                Vec3::new(0.0, 1.0, -3.0),
            ]],
            Vec3::new(1.0, 0.0, 0.0),
        )
    }

    #[test]
    fn static_scene_builds_once() {
        let mut world = World::new();
        let e = world.spawn();
        world.set_mesh(e, triangle_mesh());
        world.set_transform(e, Transform::default());

        let mut maintainer = BvhMaintainer::new();
        assert!(maintainer.maintain(&world));
        assert_eq!(maintainer.bvh.prim_count(), 1);
        assert!(!maintainer.maintain(&world));
        assert!(!maintainer.maintain(&world));
    }

    #[test]
    fn adding_a_mesh_triggers_a_rebuild() {
        let mut world = World::new();
        let e = world.spawn();
        world.set_mesh(e, triangle_mesh());
        world.set_transform(e, Transform::default());

        let mut maintainer = BvhMaintainer::new();
        maintainer.maintain(&world);

        let e2 = world.spawn();
        world.set_mesh(e2, triangle_mesh());
        world.set_transform(e2, Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        assert!(maintainer.maintain(&world));
        assert_eq!(maintainer.bvh.prim_count(), 2);
    }

    #[test]
    fn moving_an_entity_rebakes_world_space_triangles() {
        let mut world = World::new();
        let e = world.spawn();
        world.set_mesh(e, triangle_mesh());
        world.set_transform(e, Transform::default());

        let mut maintainer = BvhMaintainer::new();
        maintainer.maintain(&world);
        let before = maintainer.bvh.prims[0].v0;

        world.set_transform(e, Transform::from_position(Vec3::new(0.0, 10.0, 0.0)));
        assert!(maintainer.maintain(&world));
        let after = maintainer.bvh.prims[0].v0;
        assert!((after.y - before.y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn indexed_meshes_expand_through_the_index_array() {
        let mut mesh = Mesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            indices: vec![0, 1, 2, 2, 1, 3],
            material: Vec3::ONE,
            tri_count: 2,
        };
        mesh.tri_count = 2;

        let mut world = World::new();
        let e = world.spawn();
        world.set_mesh(e, mesh);
        world.set_transform(e, Transform::default());

        let mut maintainer = BvhMaintainer::new();
        maintainer.maintain(&world);
        assert_eq!(maintainer.bvh.prim_count(), 2);
        assert_eq!(maintainer.bvh.prims[1].v2, Vec3::new(1.0, 1.0, 0.0));
    }
}
