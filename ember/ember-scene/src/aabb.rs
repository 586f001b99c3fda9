//! Axis-aligned bounding box used by the BVH builder.

use glam::Vec3;

pub const AABB_INF: f32 = 1e30;

#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    /// Inverted box: growing it by any point yields that point.
    fn default() -> Self {
        Self {
            min: Vec3::splat(AABB_INF),
            max: Vec3::splat(-AABB_INF),
        }
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Grow to include a given point.
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow to include a given box.
    pub fn grow_aabb(&mut self, other: &Aabb) {
        if other.min.x != AABB_INF {
            self.grow(other.min);
            self.grow(other.max);
        }
    }

    /// Squared-extent area proxy used by the SAH cost function. Proportional
    /// ordering is all the split search needs, and the parent-cost comparison
    /// uses the same metric.
    pub fn area(&self) -> f32 {
        let e = self.max - self.min;
        e.x * e.x + e.y * e.y + e.z * e.z
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_inverted() {
        let mut aabb = Aabb::default();
        assert!(aabb.min.x > aabb.max.x);
        aabb.grow(Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(aabb.min, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn growing_by_an_empty_box_is_a_noop() {
        let mut aabb = Aabb::default();
        aabb.grow(Vec3::ZERO);
        aabb.grow(Vec3::ONE);
        let before = (aabb.min, aabb.max);
        aabb.grow_aabb(&Aabb::default());
        assert_eq!(before, (aabb.min, aabb.max));
    }

    #[test]
    fn area_is_squared_extent() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.area(), 1.0 + 4.0 + 9.0);
    }
}
