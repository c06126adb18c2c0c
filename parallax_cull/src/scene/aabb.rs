/// Axis-aligned bounding box used throughout the culling pipeline.
///
/// Boxes are reduced in object space on the compute device and transformed
/// to world space exactly once during initialization.

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box
///
/// `min`/`max` are opposite corners. A degenerate box (min == max) is a
/// valid point box and culls like any other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl Aabb {
    /// Point box at the origin. Emitted for objects with no vertices.
    pub const ZERO: Aabb = Aabb {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    /// Create an AABB from explicit corners.
    pub fn new(min: Vec3, max: Vec3) -> Aabb {
        Aabb { min, max }
    }

    /// Tight AABB of a point set, or `None` for an empty set.
    ///
    /// Matches the device reduction exactly: min/max per component is
    /// order-independent, so host and device results are bit-identical.
    pub fn from_points(points: &[Vec3]) -> Option<Aabb> {
        let first = *points.first()?;
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for p in &points[1..] {
            aabb.min = aabb.min.min(*p);
            aabb.max = aabb.max.max(*p);
        }
        Some(aabb)
    }

    /// Transform this local-space AABB by a matrix, returning a new AABB.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the AABB extents
    /// for an exact (tight) result without transforming all 8 corners.
    /// Equivalent to the eight-corner method for affine transforms, and
    /// correct under rotation where the naive two-corner transform is not.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        Aabb {
            min: new_min,
            max: new_max,
        }
    }

    /// Smallest AABB containing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Test if a point lies inside (or on the boundary of) this AABB.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.x <= p.x && p.x <= self.max.x
        && self.min.y <= p.y && p.y <= self.max.y
        && self.min.z <= p.z && p.z <= self.max.z
    }

    /// True when the box has zero extent on every axis.
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extents along each axis.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
