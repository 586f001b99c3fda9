//! Minimal entity/component store. The engine only ever queries three
//! component kinds, so storage is a typed map per kind rather than a
//! type-erased registry.

use std::collections::BTreeMap;

use crate::{Camera, Mesh, Transform};

/// Entity handle. Never reused within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(pub u64);

/// Manager for entities & their components.
#[derive(Default)]
pub struct World {
    next: u64,
    transforms: BTreeMap<Entity, Transform>,
    cameras: BTreeMap<Entity, Camera>,
    meshes: BTreeMap<Entity, Mesh>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        let entity = Entity(self.next);
        self.next += 1;
        entity
    }

    pub fn despawn(&mut self, entity: Entity) {
        self.transforms.remove(&entity);
        self.cameras.remove(&entity);
        self.meshes.remove(&entity);
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) {
        self.transforms.insert(entity, transform);
    }

    pub fn set_camera(&mut self, entity: Entity, camera: Camera) {
        self.cameras.insert(entity, camera);
    }

    pub fn set_mesh(&mut self, entity: Entity, mesh: Mesh) {
        self.meshes.insert(entity, mesh);
    }

    pub fn transform(&self, entity: Entity) -> Option<&Transform> {
        self.transforms.get(&entity)
    }

    pub fn transform_mut(&mut self, entity: Entity) -> Option<&mut Transform> {
        self.transforms.get_mut(&entity)
    }

    pub fn camera(&self, entity: Entity) -> Option<&Camera> {
        self.cameras.get(&entity)
    }

    pub fn mesh(&self, entity: Entity) -> Option<&Mesh> {
        self.meshes.get(&entity)
    }

    /// Every drawable: a mesh with its matching transform.
    pub fn meshes(&self) -> impl Iterator<Item = (Entity, &Mesh, &Transform)> {
        self.meshes.iter().filter_map(|(&entity, mesh)| {
            self.transforms
                .get(&entity)
                .map(|transform| (entity, mesh, transform))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn mesh_group_requires_matching_transform() {
        let mut world = World::new();

        let drawn = world.spawn();
        world.set_mesh(drawn, Mesh::default());
        world.set_transform(drawn, Transform::default());

        // A mesh without a transform is not drawable.
        let orphan = world.spawn();
        world.set_mesh(orphan, Mesh::default());

        let drawables: Vec<_> = world.meshes().collect();
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].0, drawn);
    }

    #[test]
    fn despawn_removes_all_components() {
        let mut world = World::new();
        let e = world.spawn();
        world.set_transform(e, Transform::from_position(Vec3::ONE));
        world.set_camera(e, Camera::new(70.0));
        world.despawn(e);
        assert!(world.transform(e).is_none());
        assert!(world.camera(e).is_none());
    }

    #[test]
    fn entities_are_not_reused() {
        let mut world = World::new();
        let a = world.spawn();
        world.despawn(a);
        let b = world.spawn();
        assert_ne!(a, b);
    }
}
