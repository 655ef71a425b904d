//! Lumen math - vector, ray, bounding box and frame utilities.
//!
//! Vector and matrix types come straight from `glam`; this crate adds the
//! few ray tracing specific pieces on top.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod ray;

pub use aabb::Aabb;
pub use frame::{basis_from_z, orthonormalize, Frame, FrameExt};
pub use ray::{Ray, RAY_EPS};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_frame_alias_is_affine() {
        let frame: Frame = Frame::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(frame.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    }
}
