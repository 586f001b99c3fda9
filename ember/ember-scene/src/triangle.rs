//! Ray-traceable triangle and its per-vertex normals, laid out exactly as the
//! GPU consumes them (48-byte interleaved stride).

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::Aabb;

/// A ray-traceable triangle. Positions interleave with the color channels so
/// the struct can be copied into the storage buffer as-is.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub v0: Vec3,
    pub r: f32,
    pub v1: Vec3,
    pub g: f32,
    pub v2: Vec3,
    pub b: f32,
}

impl Default for Triangle {
    fn default() -> Self {
        Self {
            v0: Vec3::ZERO,
            v1: Vec3::ZERO,
            v2: Vec3::ZERO,
            r: 1.0,
            g: 1.0,
            b: 1.0,
        }
    }
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, color: Vec3) -> Self {
        Self {
            v0,
            v1,
            v2,
            r: color.x,
            g: color.y,
            b: color.z,
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::default();
        aabb.grow(self.v0);
        aabb.grow(self.v1);
        aabb.grow(self.v2);
        aabb
    }
}

/// Per-vertex normals of one triangle, padded to the same 48-byte stride as
/// `Triangle` so both arrays stay index-aligned on the GPU.
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct TriNormals {
    pub n0: Vec3,
    pub _pad0: f32,
    pub n1: Vec3,
    pub _pad1: f32,
    pub n2: Vec3,
    pub _pad2: f32,
}

impl TriNormals {
    pub fn new(n0: Vec3, n1: Vec3, n2: Vec3) -> Self {
        Self {
            n0,
            n1,
            n2,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_stride_is_48_bytes() {
        assert_eq!(std::mem::size_of::<Triangle>(), 48);
        assert_eq!(std::mem::size_of::<TriNormals>(), 48);
    }

    #[test]
    fn centroid_and_bounds() {
        let tri = Triangle::new(
            Vec3::new(-1.0, 0.0, -3.0),
            Vec3::new(1.0, 0.0, -3.0),
            Vec3::new(0.0, 1.0, -3.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        assert!((tri.centroid() - Vec3::new(0.0, 1.0 / 3.0, -3.0)).length() < 1e-6);
        let aabb = tri.aabb();
        assert!(aabb.contains(tri.v0) && aabb.contains(tri.v1) && aabb.contains(tri.v2));
    }
}
