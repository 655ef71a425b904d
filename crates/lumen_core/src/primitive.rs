//! Bounds and exact ray intersection for points, lines and triangles.
//!
//! Each test returns the barycentric uv and the ray parameter of the hit.
//! Hits outside the ray's `[tmin, tmax]` interval are rejected.

use lumen_math::{Aabb, Ray, Vec2, Vec3};

/// Bounds of a sphere-like point with radius `r`.
pub fn point_bounds(p: Vec3, r: f32) -> Aabb {
    Aabb::from_points(p - Vec3::splat(r), p + Vec3::splat(r))
}

/// Bounds of a capsule from `p0` (radius `r0`) to `p1` (radius `r1`).
pub fn line_bounds(p0: Vec3, p1: Vec3, r0: f32, r1: f32) -> Aabb {
    Aabb::surrounding(&point_bounds(p0, r0), &point_bounds(p1, r1))
}

pub fn triangle_bounds(p0: Vec3, p1: Vec3, p2: Vec3) -> Aabb {
    Aabb::from_points(p0.min(p1).min(p2), p0.max(p1).max(p2))
}

/// Intersect a ray with a point rendered as a sphere of radius `r`.
///
/// The hit is reported at the ray's closest approach to the point, so uv is
/// always zero.
pub fn intersect_point(ray: &Ray, p: Vec3, r: f32) -> Option<(Vec2, f32)> {
    let w = p - ray.origin;
    let t = w.dot(ray.direction) / ray.direction.dot(ray.direction);
    if !ray.contains(t) {
        return None;
    }

    let closest = ray.at(t);
    if (p - closest).length_squared() > r * r {
        return None;
    }

    Some((Vec2::ZERO, t))
}

/// Intersect a ray with a line segment of varying radius.
///
/// Solves for the closest points between the ray and the segment's
/// supporting line, then checks the distance against the interpolated
/// radius. `uv.x` is the position along the segment, `uv.y` the normalized
/// distance from its axis.
pub fn intersect_line(ray: &Ray, p0: Vec3, p1: Vec3, r0: f32, r1: f32) -> Option<(Vec2, f32)> {
    let u = ray.direction;
    let v = p1 - p0;
    let w = ray.origin - p0;

    let a = u.dot(u);
    let b = u.dot(v);
    let c = v.dot(v);
    let d = u.dot(w);
    let e = v.dot(w);
    let det = a * c - b * b;

    // ray parallel to the segment
    if det == 0.0 {
        return None;
    }

    let t = (b * e - c * d) / det;
    let s = ((a * e - b * d) / det).clamp(0.0, 1.0);
    if !ray.contains(t) {
        return None;
    }

    let p = p0.lerp(p1, s);
    let r = r0 + (r1 - r0) * s;
    let delta = p - ray.at(t);
    let dist_sq = delta.length_squared();
    if dist_sq > r * r {
        return None;
    }

    Some((Vec2::new(s, dist_sq.sqrt() / r), t))
}

/// Watertight ray-triangle intersection (Woop, Benthin and Wald 2013).
///
/// Rays hitting a shared edge register on at least one of the two
/// triangles, so closed meshes have no cracks. The returned uv weights `p1`
/// and `p2`: `p = p0 * (1 - u - v) + p1 * u + p2 * v`.
pub fn intersect_triangle(ray: &Ray, p0: Vec3, p1: Vec3, p2: Vec3) -> Option<(Vec2, f32)> {
    let dir = ray.direction;

    // permute axes so the dominant direction component becomes z
    let abs_dir = dir.abs();
    let kz = if abs_dir.x > abs_dir.y {
        if abs_dir.x > abs_dir.z {
            0
        } else {
            2
        }
    } else if abs_dir.y > abs_dir.z {
        1
    } else {
        2
    };
    let mut kx = (kz + 1) % 3;
    let mut ky = (kx + 1) % 3;
    if dir[kz] < 0.0 {
        std::mem::swap(&mut kx, &mut ky);
    }

    // shear constants
    let sx = dir[kx] / dir[kz];
    let sy = dir[ky] / dir[kz];
    let sz = 1.0 / dir[kz];

    let a = p0 - ray.origin;
    let b = p1 - ray.origin;
    let c = p2 - ray.origin;

    let ax = a[kx] - sx * a[kz];
    let ay = a[ky] - sy * a[kz];
    let bx = b[kx] - sx * b[kz];
    let by = b[ky] - sy * b[kz];
    let cx = c[kx] - sx * c[kz];
    let cy = c[ky] - sy * c[kz];

    // scaled barycentrics
    let mut u = cx * by - cy * bx;
    let mut v = ax * cy - ay * cx;
    let mut w = bx * ay - by * ax;

    // fall back to double precision on edges
    if u == 0.0 || v == 0.0 || w == 0.0 {
        u = (cx as f64 * by as f64 - cy as f64 * bx as f64) as f32;
        v = (ax as f64 * cy as f64 - ay as f64 * cx as f64) as f32;
        w = (bx as f64 * ay as f64 - by as f64 * ax as f64) as f32;
    }

    if (u < 0.0 || v < 0.0 || w < 0.0) && (u > 0.0 || v > 0.0 || w > 0.0) {
        return None;
    }

    let det = u + v + w;
    if det == 0.0 {
        return None;
    }

    let az = sz * a[kz];
    let bz = sz * b[kz];
    let cz = sz * c[kz];
    let t = (u * az + v * bz + w * cz) / det;
    if !ray.contains(t) {
        return None;
    }

    Some((Vec2::new(v / det, w / det), t))
}
