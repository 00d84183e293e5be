/// Axis-aligned bounding boxes in world space.
///
/// World axes follow the level grid: X = column, Z = row, Y = up.
/// A grid cell (x, z) covers `[x, x+1] × [z, z+1]` on the floor plane.

use glam::Vec3;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Aabb { min: center - half, max: center + half }
    }

    /// Same as `from_center_half_extents`, taking full edge lengths.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        Self::from_center_half_extents(center, size * 0.5)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Closed-interval overlap on all three axes. Touching faces count.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
            && self.min.y <= other.max.y && self.max.y >= other.min.y
            && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Does this box intersect any box in `others`?
    #[inline]
    pub fn intersects_any(&self, others: &[Aabb]) -> bool {
        others.iter().any(|o| self.intersects(o))
    }
}
