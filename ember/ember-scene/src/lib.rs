//! CPU-side scene geometry for Ember: ray-traceable triangles, bounding
//! boxes, the scene BVH with its GPU-packed node layout, and the maintainer
//! that keeps the BVH in sync with the world.

mod aabb;
mod bvh;
mod maintainer;
mod triangle;

pub use aabb::Aabb;
pub use bvh::{Bvh, BvhNode, GpuNode};
pub use maintainer::BvhMaintainer;
pub use triangle::{TriNormals, Triangle};
