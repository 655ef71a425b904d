use crate::Vec3;

/// Default offset used for the near end of a ray's valid interval.
pub const RAY_EPS: f32 = 1e-4;

/// A ray segment in 3D space.
///
/// The ray covers the points `origin + t * direction` for `t` in
/// `[tmin, tmax]`. Traversal shrinks `tmax` as closer hits are found, so the
/// segment doubles as the current search interval.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tmin: f32,
    pub tmax: f32,
}

impl Ray {
    /// Create a ray with the default `[RAY_EPS, f32::MAX]` interval.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            tmin: RAY_EPS,
            tmax: f32::MAX,
        }
    }

    /// Create a ray with an explicit parameter interval.
    pub fn with_interval(origin: Vec3, direction: Vec3, tmin: f32, tmax: f32) -> Self {
        Self {
            origin,
            direction,
            tmin,
            tmax,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Component-wise reciprocal of the direction, used by slab tests.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        Vec3::ONE / self.direction
    }

    /// Whether `t` lies inside the ray's valid interval (inclusive).
    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        self.tmin <= t && t <= self.tmax
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_creation() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let direction = Vec3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(origin, direction);

        assert_eq!(ray.origin, origin);
        assert_eq!(ray.direction, direction);
        assert_eq!(ray.tmin, RAY_EPS);
        assert_eq!(ray.tmax, f32::MAX);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_interval() {
        let ray = Ray::with_interval(Vec3::ZERO, Vec3::Y, 1.0, 5.0);

        assert!(ray.contains(1.0));
        assert!(ray.contains(5.0));
        assert!(!ray.contains(0.5));
        assert!(!ray.contains(5.5));
    }

    #[test]
    fn test_inv_direction_handles_zero_components() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, -4.0));
        let inv = ray.inv_direction();

        assert_eq!(inv.x, 0.5);
        assert!(inv.y.is_infinite());
        assert_eq!(inv.z, -0.25);
    }
}
