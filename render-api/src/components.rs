//! Components the renderer consumes. The renderer never writes these.

use glam::{Mat4, Quat, Vec3};

/// Transform component, holds position, rotation, & scale.
#[derive(Clone, Debug)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Model matrix representing this transform.
    pub fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Forward direction of this transform ((0,0,1) rotated).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Camera component, a window through which one can view the scene.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Field of view in degrees.
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { fov: 90.0 }
    }
}

impl Camera {
    pub fn new(fov: f32) -> Self {
        Self { fov }
    }

    /// Projection matrix for this camera's frustum.
    pub fn projection(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, near, far)
    }
}

/// Mesh component, a list of triangles to be rendered.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Empty when the vertex array is unindexed.
    pub indices: Vec<u32>,
    /// Flat material color applied to every triangle.
    pub material: Vec3,
    /// Number of triangles.
    pub tri_count: usize,
}

impl Mesh {
    /// Mesh from raw world-space triangle soup with flat normals.
    pub fn from_triangles(triangles: &[[Vec3; 3]], material: Vec3) -> Self {
        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut normals = Vec::with_capacity(triangles.len() * 3);
        for tri in triangles {
            let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
            vertices.extend_from_slice(tri);
            normals.extend_from_slice(&[n, n, n]);
        }
        Self {
            vertices,
            normals,
            indices: Vec::new(),
            material,
            tri_count: triangles.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_forward_follows_rotation() {
        let t = Transform::default();
        assert!((t.forward() - Vec3::Z).length() < 1e-6);

        let t = Transform {
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..Default::default()
        };
        // Rotating +Z by 90 degrees around Y lands on +X.
        assert!((t.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn flat_normals_face_out() {
        let mesh = Mesh::from_triangles(
            &[[Vec3::new(-1.0, 0.0, -3.0), Vec3::new(1.0, 0.0, -3.0), Vec3::new(0.0, 1.0, -3.0)]],
            Vec3::new(1.0, 0.0, 0.0),
        );
        assert_eq!(mesh.tri_count, 1);
        assert!((mesh.normals[0] - Vec3::Z).length() < 1e-6);
    }
}
