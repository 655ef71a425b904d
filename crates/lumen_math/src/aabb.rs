use crate::{Ray, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// Stored as a pair of corners. The empty box has `min = +inf` and
/// `max = -inf`, so merging anything into it yields the other operand.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An empty box (contains nothing, identity for `surrounding`).
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create an AABB from two corner points in any order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow the box so it contains `point`.
    pub fn include_point(&self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }


    /// True if the box contains no point at all.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Per-axis extent (`max - min`).
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties prefer the later axis, so a cube splits along Z.
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        let mut axis = 0;
        if size.y >= size.x && size.y >= size.z {
            axis = 1;
        }
        if size.z >= size.x && size.z >= size.y {
            axis = 2;
        }
        axis
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Test if a ray intersects this AABB within the ray's `[tmin, tmax]`.
    pub fn hit(&self, ray: &Ray) -> bool {
        self.hit_inv(ray, ray.inv_direction())
    }

    /// Slab test with a precomputed reciprocal direction.
    ///
    /// Flat boxes (zero extent on one axis) still register hits since the
    /// interval comparison is inclusive. A ray lying in a slab plane gives
    /// `0 * inf = NaN` for that axis, which is treated as an unbounded slab.
    #[inline]
    pub fn hit_inv(&self, ray: &Ray, inv_dir: Vec3) -> bool {
        let it_min = (self.min - ray.origin) * inv_dir;
        let it_max = (self.max - ray.origin) * inv_dir;
        let nan = it_min.is_nan_mask() | it_max.is_nan_mask();
        let near = Vec3::select(nan, Vec3::NEG_INFINITY, it_min.min(it_max));
        let far = Vec3::select(nan, Vec3::INFINITY, it_min.max(it_max));
        let t0 = near.max_element().max(ray.tmin);
        // slightly widen the far side to absorb rounding in the slab products
        let t1 = far.min_element().min(ray.tmax) * 1.000_000_24;
        t0 <= t1
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_surrounding() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let box2 = Aabb::from_points(Vec3::new(3.0, 3.0, 3.0), Vec3::new(10.0, 10.0, 10.0));
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert_eq!(surrounding.min, Vec3::ZERO);
        assert_eq!(surrounding.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_empty_is_identity() {
        let aabb = Aabb::from_points(Vec3::ONE, Vec3::splat(2.0));
        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(Aabb::surrounding(&Aabb::EMPTY, &aabb), aabb);
        assert_eq!(Aabb::EMPTY.include_point(Vec3::ONE).size(), Vec3::ZERO);
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));

        // Ray pointing at center
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(aabb.hit(&ray));

        // Ray pointing away
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::NEG_Z);
        assert!(!aabb.hit(&ray));

        // Ray missing the box
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(!aabb.hit(&ray));

        // Ray stopping short of the box
        let ray = Ray::with_interval(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, 3.0);
        assert!(!aabb.hit(&ray));
    }

    #[test]
    fn test_flat_box_is_hit() {
        // A triangle lying in z=0 has a box with no depth.
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::NEG_Z);
        assert!(aabb.hit(&ray));
    }

    #[test]
    fn test_ray_on_box_face_is_hit() {
        // The origin sits exactly on the x = 0 face and the direction has
        // no x component, so the x slab product is 0 * inf.
        let flat = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let ray = Ray::new(Vec3::new(0.0, 0.25, 1.0), Vec3::NEG_Z);
        assert!(flat.hit(&ray));

        let ray = Ray::new(Vec3::new(0.0, 0.25, -1.0), Vec3::Z);
        assert!(flat.hit(&ray));

        // On the max face, going the other way along the plane
        let cube = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(Vec3::new(1.0, 0.5, -3.0), Vec3::Z);
        assert!(cube.hit(&ray));

        // Still a miss when another slab rejects the ray
        let ray = Ray::new(Vec3::new(0.0, 2.0, 1.0), Vec3::NEG_Z);
        assert!(!flat.hit(&ray));
    }

    #[test]
    fn test_aabb_centroid() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::splat(10.0));
        assert_eq!(aabb.centroid(), Vec3::splat(5.0));
    }

    #[test]
    fn test_aabb_longest_axis() {
        let aabb_x = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.longest_axis(), 0);

        let aabb_y = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.longest_axis(), 1);

        let aabb_z = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.longest_axis(), 2);

        // Ties go to the last axis
        let cube = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        assert_eq!(cube.longest_axis(), 2);

        let flat = Aabb::from_points(Vec3::ZERO, Vec3::new(4.0, 4.0, 1.0));
        assert_eq!(flat.longest_axis(), 1);
    }
}
