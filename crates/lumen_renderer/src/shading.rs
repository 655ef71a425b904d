//! Reflectance helpers: Fresnel, GGX microfacets and direction sampling.

use std::f32::consts::PI;

use lumen_core::Color;
use lumen_math::{basis_from_z, Vec2, Vec3};
use rand::Rng;

/// Floor for cosine terms used as denominators.
pub const COS_EPS: f32 = 1e-4;

/// Reflectance at normal incidence of common dielectrics.
pub const DIELECTRIC_F0: f32 = 0.04;

/// Mirror `outgoing` about `normal`. Both point away from the surface.
#[inline]
pub fn reflect(outgoing: Vec3, normal: Vec3) -> Vec3 {
    -outgoing + 2.0 * outgoing.dot(normal) * normal
}

/// Schlick weight `(1 - cos)^5`.
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick Fresnel approximation.
#[inline]
pub fn fresnel_schlick(f0: Color, cos_theta: f32) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// Scalar Schlick Fresnel.
#[inline]
pub fn fresnel_schlick1(f0: f32, cos_theta: f32) -> f32 {
    f0 + (1.0 - f0) * schlick_weight(cos_theta)
}

/// Reflectance at normal incidence for an interface with vacuum.
#[inline]
pub fn eta_to_reflectivity(ior: f32) -> f32 {
    let r = (ior - 1.0) / (ior + 1.0);
    r * r
}

/// GGX/Trowbridge-Reitz distribution.
#[inline]
pub fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    if n_dot_h <= 0.0 {
        return 0.0;
    }
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Smith G for GGX, masking and shadowing combined.
#[inline]
pub fn smith_g_ggx(n_dot_l: f32, n_dot_v: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let g1 = |n_dot_x: f32| {
        let n_dot_x = n_dot_x.max(0.0);
        2.0 * n_dot_x / (n_dot_x + (a2 + (1.0 - a2) * n_dot_x * n_dot_x).sqrt()).max(COS_EPS)
    };
    g1(n_dot_l) * g1(n_dot_v)
}

/// Sample a GGX microfacet normal around `normal`.
pub fn sample_ggx<R: Rng + ?Sized>(normal: Vec3, alpha: f32, rng: &mut R) -> Vec3 {
    let u: Vec2 = Vec2::new(rng.gen(), rng.gen());

    let theta = (alpha * u.x.sqrt() / (1.0 - u.x).max(0.0).sqrt()).atan();
    let phi = 2.0 * PI * u.y;

    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let local = Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);

    (basis_from_z(normal) * local).normalize()
}

/// Cosine-weighted direction in the hemisphere around `normal`.
pub fn sample_hemisphere_cos<R: Rng + ?Sized>(normal: Vec3, rng: &mut R) -> Vec3 {
    let u: Vec2 = Vec2::new(rng.gen(), rng.gen());

    let r = u.x.sqrt();
    let phi = 2.0 * PI * u.y;
    let local = Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u.x).max(0.0).sqrt());

    (basis_from_z(normal) * local).normalize()
}
