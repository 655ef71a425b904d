//! Path tracing integrator.
//!
//! Paths are traced iteratively: each bounce multiplies the path weight by
//! the sampled lobe's weight and adds the emission it meets, until the path
//! escapes to the environment or reaches the bounce limit.

use lumen_core::{Color, Scene, Topology};
use lumen_math::{orthonormalize, Ray, Vec3, Vec4};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::TraceParams;
use crate::shader::{Shader, SurfacePoint};
use crate::shading::{
    eta_to_reflectivity, fresnel_schlick, fresnel_schlick1, ggx_d, reflect, sample_ggx,
    sample_hemisphere_cos, smith_g_ggx, COS_EPS, DIELECTRIC_F0,
};

/// Offset applied when a path passes through a transparent surface.
const OPACITY_STEP: f32 = 1e-2;

/// Physically based path tracer.
pub struct RaytraceShader;

impl Shader for RaytraceShader {
    fn shade(&self, scene: &Scene, ray: &Ray, bounce: u32, rng: &mut SmallRng, params: &TraceParams) -> Vec4 {
        trace_path(scene, ray, bounce, rng, params).extend(1.0)
    }
}

/// Material parameters resolved at a surface point.
struct Lobe {
    color: Color,
    specular: f32,
    metallic: f32,
    roughness: f32,
    transmission: f32,
    ior: f32,
}

fn trace_path(scene: &Scene, ray: &Ray, bounce: u32, rng: &mut SmallRng, params: &TraceParams) -> Vec3 {
    let mut radiance = Color::ZERO;
    let mut weight = Color::ONE;
    let mut ray = *ray;
    let mut bounce = bounce;

    loop {
        let Some(hit) = scene.intersect(&ray, false, params.non_rigid_frames) else {
            radiance += weight * scene.eval_environment(ray.direction);
            break;
        };
        let Some(surface) = SurfacePoint::eval(scene, &hit, params.non_rigid_frames) else {
            break;
        };

        let outgoing = -ray.direction.normalize();
        let normal = match surface.topology {
            // lines are shaded as tubes facing the viewer
            Topology::Lines(_) => orthonormalize(outgoing, surface.normal),
            Topology::Triangles(_) if surface.normal.dot(outgoing) < 0.0 => -surface.normal,
            _ => surface.normal,
        };

        let material = surface.material;
        let st = surface.texcoord;
        let emission = material.emission * scene.eval_texture(material.emission_tex, st, false);
        radiance += weight * emission;

        if bounce >= params.bounces {
            break;
        }

        let opacity = material.opacity * scene.eval_texture(material.opacity_tex, st, true).element_sum() / 3.0;
        if opacity < 1.0 && rng.gen::<f32>() >= opacity {
            ray = Ray::new(surface.position + ray.direction * OPACITY_STEP, ray.direction);
            continue;
        }

        let lobe = Lobe {
            color: material.color * scene.eval_texture(material.color_tex, st, false),
            specular: material.specular * scene.eval_texture(material.specular_tex, st, true).x,
            metallic: material.metallic * scene.eval_texture(material.metallic_tex, st, true).x,
            roughness: material.roughness() * scene.eval_texture(material.roughness_tex, st, true).x,
            transmission: material.transmission
                * scene.eval_texture(material.transmission_tex, st, true).x,
            ior: material.ior,
        };

        let Some((incoming, lobe_weight)) = sample_lobe(&lobe, normal, outgoing, rng) else {
            break;
        };
        weight *= lobe_weight;
        if weight == Color::ZERO || !weight.is_finite() {
            break;
        }

        ray = Ray::new(surface.position, incoming);
        bounce += 1;
    }

    radiance
}

/// Pick the reflectance model for `lobe` and sample it.
///
/// Returns the next direction and the throughput weight (BRDF times cosine
/// over pdf), or `None` when the sample is absorbed.
fn sample_lobe(lobe: &Lobe, normal: Vec3, outgoing: Vec3, rng: &mut SmallRng) -> Option<(Vec3, Color)> {
    let cos_o = normal.dot(outgoing);

    if lobe.transmission > 0.0 {
        // polished dielectric: reflect or pass straight through
        let fresnel = fresnel_schlick1(eta_to_reflectivity(lobe.ior), cos_o.abs());
        if rng.gen::<f32>() < fresnel {
            return Some((reflect(outgoing, normal), Color::ONE));
        }
        return Some((-outgoing, lobe.color));
    }

    if lobe.metallic > 0.0 && lobe.roughness == 0.0 {
        // polished metal
        let incoming = reflect(outgoing, normal);
        return Some((incoming, fresnel_schlick(lobe.color, cos_o)));
    }

    if lobe.metallic > 0.0 {
        // rough metal: sample the microfacet normal, reflect about it. The
        // GGX half-vector pdf stands in for a mirror sample weighted by D.
        let halfway = sample_ggx(normal, lobe.roughness, rng);
        let incoming = reflect(outgoing, halfway);
        let cos_i = normal.dot(incoming);
        if cos_i <= 0.0 {
            return None;
        }

        let o_dot_h = outgoing.dot(halfway).abs();
        let n_dot_h = normal.dot(halfway).max(COS_EPS);
        let fresnel = fresnel_schlick(lobe.color, o_dot_h);
        let shadowing = smith_g_ggx(cos_i, cos_o, lobe.roughness);
        // D and the Jacobian of the reflection cancel against the pdf
        let weight = fresnel * shadowing * o_dot_h / (cos_o.max(COS_EPS) * n_dot_h);
        return Some((incoming, weight));
    }

    let incoming = sample_hemisphere_cos(normal, rng);

    if lobe.specular > 0.0 {
        // rough plastic: diffuse base under a dielectric coat
        let cos_i = normal.dot(incoming).max(COS_EPS);
        let halfway = (outgoing + incoming).normalize_or_zero();
        let fresnel = fresnel_schlick1(DIELECTRIC_F0, halfway.dot(outgoing)) * lobe.specular;
        let distribution = ggx_d(normal.dot(halfway), lobe.roughness.max(COS_EPS));
        let shadowing = smith_g_ggx(cos_i, cos_o, lobe.roughness.max(COS_EPS));
        let specular = std::f32::consts::PI * fresnel * distribution * shadowing
            / (4.0 * cos_o.max(COS_EPS) * cos_i);
        let weight = lobe.color * (1.0 - fresnel) + Color::splat(specular);
        return Some((incoming, weight));
    }

    // lambertian: the cosine and 1/pi cancel against the pdf
    Some((incoming, lobe.color))
}
