//! Shader trait, surface evaluation and the debug shaders.

use lumen_core::{Intersection, Material, Scene, Topology};
use lumen_math::{FrameExt, Ray, Vec2, Vec3, Vec4};
use rand::rngs::SmallRng;

use crate::config::{ShaderType, TraceParams};
use crate::integrator::RaytraceShader;

/// A per-ray color function.
///
/// Returns linear radiance in `xyz` and pixel coverage in `w`.
pub trait Shader: Send + Sync {
    fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        bounce: u32,
        rng: &mut SmallRng,
        params: &TraceParams,
    ) -> Vec4;
}

impl ShaderType {
    /// The shader implementing this variant.
    pub fn shader(self) -> &'static dyn Shader {
        match self {
            ShaderType::Raytrace => &RaytraceShader,
            ShaderType::Eyelight => &EyelightShader,
            ShaderType::Normal => &NormalShader,
            ShaderType::Texcoord => &TexcoordShader,
            ShaderType::Color => &ColorShader,
        }
    }
}

/// Geometry and material at a ray hit, in world space.
pub struct SurfacePoint<'a> {
    pub position: Vec3,
    /// Interpolated shading normal, not yet oriented towards the viewer.
    pub normal: Vec3,
    pub texcoord: Vec2,
    pub topology: &'a Topology,
    pub material: &'a Material,
}

impl<'a> SurfacePoint<'a> {
    /// Evaluate the hit point of `hit`. Returns `None` if the hit refers to
    /// entities missing from the scene.
    pub fn eval(scene: &'a Scene, hit: &Intersection, non_rigid_frames: bool) -> Option<Self> {
        let object = scene.object(hit.object)?;
        let shape = scene.shape(object.shape)?;
        let material = scene.material(object.material)?;

        let position = object
            .frame
            .transform_point3(shape.eval_position(hit.element, hit.uv));
        let normal = object
            .frame
            .transform_normal(shape.eval_normal(hit.element, hit.uv), non_rigid_frames);

        Some(Self {
            position,
            normal,
            texcoord: shape.eval_texcoord(hit.element, hit.uv),
            topology: shape.topology(),
            material,
        })
    }
}

/// Intersect and evaluate the nearest surface, the single step every debug
/// shader shares.
fn nearest_surface<'a>(scene: &'a Scene, ray: &Ray, params: &TraceParams) -> Option<SurfacePoint<'a>> {
    let hit = scene.intersect(ray, false, params.non_rigid_frames)?;
    SurfacePoint::eval(scene, &hit, params.non_rigid_frames)
}

const MISS: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Material color shaded by the cosine between normal and viewer.
pub struct EyelightShader;

impl Shader for EyelightShader {
    fn shade(&self, scene: &Scene, ray: &Ray, _bounce: u32, _rng: &mut SmallRng, params: &TraceParams) -> Vec4 {
        let Some(surface) = nearest_surface(scene, ray, params) else {
            return MISS;
        };
        let cos = surface.normal.dot(-ray.direction.normalize()).abs();
        (surface.material.color * cos).extend(1.0)
    }
}

/// World-space normal remapped from `[-1, 1]` to `[0, 1]`.
pub struct NormalShader;

impl Shader for NormalShader {
    fn shade(&self, scene: &Scene, ray: &Ray, _bounce: u32, _rng: &mut SmallRng, params: &TraceParams) -> Vec4 {
        let Some(surface) = nearest_surface(scene, ray, params) else {
            return MISS;
        };
        (surface.normal * 0.5 + 0.5).extend(1.0)
    }
}

/// Texture coordinates wrapped into `[0, 1)`.
pub struct TexcoordShader;

impl Shader for TexcoordShader {
    fn shade(&self, scene: &Scene, ray: &Ray, _bounce: u32, _rng: &mut SmallRng, params: &TraceParams) -> Vec4 {
        let Some(surface) = nearest_surface(scene, ray, params) else {
            return MISS;
        };
        let st = surface.texcoord;
        Vec4::new(st.x.rem_euclid(1.0), st.y.rem_euclid(1.0), 0.0, 1.0)
    }
}

/// Raw material base color.
pub struct ColorShader;

impl Shader for ColorShader {
    fn shade(&self, scene: &Scene, ray: &Ray, _bounce: u32, _rng: &mut SmallRng, params: &TraceParams) -> Vec4 {
        let Some(surface) = nearest_surface(scene, ray, params) else {
            return MISS;
        };
        surface.material.color.extend(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Frame, Object, Shape};
    use rand::SeedableRng;

    /// A unit quad at z = 0 with texcoords spanning [0, 2].
    fn quad_scene(frame: Frame) -> Scene {
        let mut scene = Scene::new();
        let shape = Shape::triangles(
            vec![[0, 1, 2], [0, 2, 3]],
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
        )
        .with_texcoords(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ]);
        let shape = scene.add_shape(shape);
        let material = scene.add_material(Material::diffuse(Vec3::new(0.8, 0.4, 0.2)));
        scene.add_object(Object::new(shape, material).with_frame(frame));
        scene.build_bvh(None).unwrap();
        scene
    }

    fn shade(shader: ShaderType, scene: &Scene, ray: &Ray) -> Vec4 {
        let mut rng = SmallRng::seed_from_u64(0);
        shader.shader().shade(scene, ray, 0, &mut rng, &TraceParams::default())
    }

    #[test]
    fn test_debug_shaders_miss_is_black() {
        let scene = quad_scene(Frame::IDENTITY);
        let ray = Ray::new(Vec3::new(3.0, 0.0, 1.0), Vec3::NEG_Z);
        for shader in [ShaderType::Eyelight, ShaderType::Normal, ShaderType::Texcoord, ShaderType::Color] {
            assert_eq!(shade(shader, &scene, &ray), MISS, "{shader}");
        }
    }

    #[test]
    fn test_color_and_eyelight() {
        let scene = quad_scene(Frame::IDENTITY);
        let ray = Ray::new(Vec3::new(0.1, 0.2, 1.0), Vec3::NEG_Z);

        assert_eq!(shade(ShaderType::Color, &scene, &ray), Vec4::new(0.8, 0.4, 0.2, 1.0));

        // Head-on view: full cosine
        let lit = shade(ShaderType::Eyelight, &scene, &ray);
        assert!((lit - Vec4::new(0.8, 0.4, 0.2, 1.0)).length() < 1e-5);

        // Grazing view from below still sees the absolute cosine
        let dir = Vec3::new(0.0, 1.0, 1.0).normalize();
        let ray = Ray::new(Vec3::new(0.1, -0.5, -0.5), dir);
        let lit = shade(ShaderType::Eyelight, &scene, &ray);
        assert!((lit.x - 0.8 * dir.z).abs() < 1e-4);
    }

    #[test]
    fn test_normal_follows_instance_frame() {
        let frame = Frame::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        let scene = quad_scene(frame);

        // The quad now faces +y
        let ray = Ray::new(Vec3::new(0.1, 2.0, 0.1), Vec3::NEG_Y);
        let color = shade(ShaderType::Normal, &scene, &ray);
        assert!((color - Vec4::new(0.5, 1.0, 0.5, 1.0)).length() < 1e-4);
    }

    #[test]
    fn test_texcoord_wraps() {
        let scene = quad_scene(Frame::IDENTITY);
        // Texcoords here are (2 * (x + 0.5), 2 * (y + 0.5)) = (1.4, 1.2)
        let ray = Ray::new(Vec3::new(0.2, 0.1, 1.0), Vec3::NEG_Z);
        let color = shade(ShaderType::Texcoord, &scene, &ray);
        assert!((color - Vec4::new(0.4, 0.2, 0.0, 1.0)).length() < 1e-4);
    }
}
