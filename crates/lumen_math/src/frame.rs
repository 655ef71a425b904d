// Frame utilities for Affine3A
//
// Extends glam::Affine3A with the inverse flavours and box/ray mapping used
// when moving rays between world space and object space.

use glam::{Affine3A, Mat3, Vec3};

use crate::{Aabb, Ray};

/// An affine frame: a 3x3 basis plus an origin.
pub type Frame = Affine3A;

/// Extension trait for frames used by instancing.
pub trait FrameExt {
    /// Inverse that assumes an orthonormal basis (rotation + translation).
    fn rigid_inverse(&self) -> Self;

    /// Inverse frame, general when `non_rigid` is set and rigid otherwise.
    fn inverse_frame(&self, non_rigid: bool) -> Self;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform a ray, keeping its parameter interval.
    ///
    /// The direction is not renormalized, so hit distances in the target
    /// space stay comparable with distances in the source space.
    fn transform_ray(&self, ray: &Ray) -> Ray;

    /// Transform a surface normal and renormalize it.
    ///
    /// With `non_rigid` the inverse transpose of the basis is used, which
    /// keeps normals perpendicular under non-uniform scale.
    fn transform_normal(&self, normal: Vec3, non_rigid: bool) -> Vec3;
}

impl FrameExt for Affine3A {
    fn rigid_inverse(&self) -> Self {
        let matrix3 = self.matrix3.transpose();
        let translation = -(matrix3 * self.translation);
        Affine3A {
            matrix3,
            translation,
        }
    }

    fn inverse_frame(&self, non_rigid: bool) -> Self {
        if non_rigid {
            self.inverse()
        } else {
            self.rigid_inverse()
        }
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        aabb.corners()
            .iter()
            .fold(Aabb::EMPTY, |acc, &corner| {
                acc.include_point(self.transform_point3(corner))
            })
    }

    fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::with_interval(
            self.transform_point3(ray.origin),
            self.transform_vector3(ray.direction),
            ray.tmin,
            ray.tmax,
        )
    }

    fn transform_normal(&self, normal: Vec3, non_rigid: bool) -> Vec3 {
        if non_rigid {
            let basis = Mat3::from(self.matrix3).inverse().transpose();
            (basis * normal).normalize()
        } else {
            self.transform_vector3(normal).normalize()
        }
    }
}

/// Remove from `a` its component along unit vector `b` and normalize.
#[inline]
pub fn orthonormalize(a: Vec3, b: Vec3) -> Vec3 {
    (a - b * a.dot(b)).normalize()
}

/// Build an orthonormal basis whose third column is the unit vector `n`.
pub fn basis_from_z(n: Vec3) -> Mat3 {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    Mat3::from_cols(tangent, bitangent, n)
}
