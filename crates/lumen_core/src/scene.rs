//! Scene container, instancing and the top-level BVH.
//!
//! Entities live in per-kind arrays and refer to each other by index.
//! Objects pair a shape with a material under a world frame; many objects
//! may share one shape or material.

use lumen_math::{Aabb, Frame, FrameExt, Ray, Vec2, Vec3};

use crate::bvh::{Bvh, BvhPrimitive};
use crate::camera::Camera;
use crate::environment::Environment;
use crate::error::{SceneError, SceneResult};
use crate::material::{Color, Material};
use crate::shape::Shape;
use crate::texture::{eval_texture, Texture};

/// Observer for long running stages: `(stage, done, total)`.
pub type ProgressCallback<'a> = &'a (dyn Fn(&str, usize, usize) + Sync);

/// An instance of a shape with a material, placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub frame: Frame,
    pub shape: usize,
    pub material: usize,
}

impl Object {
    pub fn new(shape: usize, material: usize) -> Self {
        Self {
            frame: Frame::IDENTITY,
            shape,
            material,
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }
}

/// A ray hit against the scene.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    pub object: usize,
    pub element: usize,
    pub uv: Vec2,
    pub distance: f32,
}

/// Entity counts, mostly for logging.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub cameras: usize,
    pub shapes: usize,
    pub objects: usize,
    pub materials: usize,
    pub textures: usize,
    pub environments: usize,
    /// Total elements over all shapes.
    pub primitives: usize,
}

/// Owner of all scene entities and the instance BVH.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    cameras: Vec<Camera>,
    textures: Vec<Texture>,
    shapes: Vec<Shape>,
    materials: Vec<Material>,
    objects: Vec<Object>,
    environments: Vec<Environment>,
    bvh: Option<Bvh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn add_shape(&mut self, shape: Shape) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Add an instance. The scene BVH is dropped until the next build.
    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.bvh = None;
        self.objects.len() - 1
    }

    pub fn add_environment(&mut self, environment: Environment) -> usize {
        self.environments.push(environment);
        self.environments.len() - 1
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    pub fn shape(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index)
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn object(&self, index: usize) -> Option<&Object> {
        self.objects.get(index)
    }

    pub fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    pub fn texture_mut(&mut self, index: usize) -> Option<&mut Texture> {
        self.textures.get_mut(index)
    }

    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    pub fn environment_mut(&mut self, index: usize) -> Option<&mut Environment> {
        self.environments.get_mut(index)
    }

    /// Mutable access to a shape. Drops the scene BVH since the shape's
    /// bounds may change.
    pub fn shape_mut(&mut self, index: usize) -> Option<&mut Shape> {
        self.bvh = None;
        self.shapes.get_mut(index)
    }

    /// Mutable access to an object. Drops the scene BVH since the object's
    /// frame or shape may change.
    pub fn object_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.bvh = None;
        self.objects.get_mut(index)
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            cameras: self.cameras.len(),
            shapes: self.shapes.len(),
            objects: self.objects.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
            environments: self.environments.len(),
            primitives: self.shapes.iter().map(Shape::num_elements).sum(),
        }
    }

    /// Check every cross reference and every shape's geometry.
    pub fn validate(&self) -> SceneResult<()> {
        for (i, object) in self.objects.iter().enumerate() {
            if object.shape >= self.shapes.len() {
                return Err(SceneError::MissingShape {
                    object: i,
                    shape: object.shape,
                });
            }
            if object.material >= self.materials.len() {
                return Err(SceneError::MissingMaterial {
                    object: i,
                    material: object.material,
                });
            }
        }

        for (i, material) in self.materials.iter().enumerate() {
            for (slot, texture) in material.texture_slots() {
                self.check_texture(texture, || format!("material {i} {slot}"))?;
            }
        }

        for (i, environment) in self.environments.iter().enumerate() {
            self.check_texture(environment.emission_tex, || format!("environment {i} emission"))?;
        }

        for (i, shape) in self.shapes.iter().enumerate() {
            shape
                .validate()
                .map_err(|source| SceneError::InvalidShape { shape: i, source })?;
        }

        Ok(())
    }

    fn check_texture(&self, texture: Option<usize>, owner: impl FnOnce() -> String) -> SceneResult<()> {
        match texture {
            Some(texture) if texture >= self.textures.len() => Err(SceneError::MissingTexture {
                owner: owner(),
                texture,
            }),
            _ => Ok(()),
        }
    }

    /// Validate the scene, then rebuild every shape BVH and the instance BVH
    /// over the objects.
    pub fn build_bvh(&mut self, progress: Option<ProgressCallback>) -> SceneResult<()> {
        self.validate()?;

        let total = self.shapes.len() + 1;
        for (i, shape) in self.shapes.iter_mut().enumerate() {
            if let Some(progress) = progress {
                progress("build shape bvh", i, total);
            }
            shape
                .build_bvh()
                .map_err(|source| SceneError::InvalidShape { shape: i, source })?;
        }

        if let Some(progress) = progress {
            progress("build scene bvh", self.shapes.len(), total);
        }

        let primitives: Vec<BvhPrimitive> = self
            .objects
            .iter()
            .enumerate()
            .filter_map(|(i, object)| {
                let bounds = self.object_bounds(object);
                if bounds.is_empty() {
                    log::debug!("Object {} has an empty shape, skipping", i);
                    return None;
                }
                Some(BvhPrimitive::new(i, bounds))
            })
            .collect();

        let bvh = Bvh::build(primitives);
        let stats = self.stats();
        log::info!(
            "Built BVH: {} objects, {} shapes, {} primitives, {} scene nodes",
            stats.objects,
            stats.shapes,
            stats.primitives,
            bvh.nodes().len()
        );
        self.bvh = Some(bvh);

        if let Some(progress) = progress {
            progress("build bvh", total, total);
        }
        Ok(())
    }

    /// World-space bounds of an object's shape.
    fn object_bounds(&self, object: &Object) -> Aabb {
        self.shapes
            .get(object.shape)
            .and_then(Shape::bvh)
            .map(|bvh| object.frame.transform_aabb(&bvh.bounds()))
            .unwrap_or(Aabb::EMPTY)
    }

    /// Bounds of everything in the scene.
    pub fn world_bounds(&self) -> Aabb {
        match &self.bvh {
            Some(bvh) => bvh.bounds(),
            None => self.objects.iter().fold(Aabb::EMPTY, |acc, object| {
                Aabb::surrounding(&acc, &self.object_bounds(object))
            }),
        }
    }

    /// Intersect a world-space ray with the scene.
    ///
    /// Returns `None` when nothing is hit or the scene BVH has not been
    /// built. With `find_any` the first hit found is returned instead of
    /// the closest.
    pub fn intersect(&self, ray: &Ray, find_any: bool, non_rigid_frames: bool) -> Option<Intersection> {
        let bvh = self.bvh.as_ref()?;
        bvh.intersect(ray, find_any, |ray, object| {
            self.intersect_instance(object, ray, find_any, non_rigid_frames)
                .map(|hit| (hit, hit.distance))
        })
    }

    /// Intersect a world-space ray with a single object.
    ///
    /// The ray is moved into object space with the inverse of the object's
    /// frame: a general inverse when `non_rigid_frames` is set, a rigid one
    /// otherwise.
    pub fn intersect_instance(
        &self,
        object: usize,
        ray: &Ray,
        find_any: bool,
        non_rigid_frames: bool,
    ) -> Option<Intersection> {
        let instance = self.objects.get(object)?;
        let shape = self.shapes.get(instance.shape)?;

        let local_ray = instance.frame.inverse_frame(non_rigid_frames).transform_ray(ray);
        shape.intersect(&local_ray, find_any).map(|hit| Intersection {
            object,
            element: hit.element,
            uv: hit.uv,
            distance: hit.distance,
        })
    }

    /// Sample a texture by index; a missing index is constant white.
    pub fn eval_texture(&self, texture: Option<usize>, uv: Vec2, ldr_as_linear: bool) -> Vec3 {
        eval_texture(texture.and_then(|i| self.textures.get(i)), uv, ldr_as_linear)
    }

    /// Radiance arriving from all environments along `direction`.
    pub fn eval_environment(&self, direction: Vec3) -> Color {
        self.environments
            .iter()
            .fold(Color::ZERO, |radiance, environment| {
                let texcoord = environment.eval_texcoord(direction);
                radiance
                    + environment.emission
                        * self.eval_texture(environment.emission_tex, texcoord, false)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeError;
    use std::sync::Mutex;

    fn unit_quad() -> Shape {
        Shape::triangles(
            vec![[0, 1, 2], [0, 2, 3]],
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
        )
    }

    /// A row of quads at x = 0, 2, 4, ... each facing +z.
    fn row_of_quads(count: usize) -> Scene {
        let mut scene = Scene::new();
        let shape = scene.add_shape(unit_quad());
        let material = scene.add_material(Material::default());
        for i in 0..count {
            let frame = Frame::from_translation(Vec3::new(2.0 * i as f32, 0.0, 0.0));
            scene.add_object(Object::new(shape, material).with_frame(frame));
        }
        scene.build_bvh(None).unwrap();
        scene
    }

    #[test]
    fn test_nearest_hit_through_instances() {
        let mut scene = Scene::new();
        let shape = scene.add_shape(unit_quad());
        let material = scene.add_material(Material::default());
        // Two copies of the quad, one behind the other
        let far = scene.add_object(Object::new(shape, material).with_frame(Frame::from_translation(Vec3::new(0.0, 0.0, -3.0))));
        let near = scene.add_object(Object::new(shape, material).with_frame(Frame::from_translation(Vec3::new(0.0, 0.0, -1.0))));
        scene.build_bvh(None).unwrap();

        let ray = Ray::new(Vec3::new(0.1, 0.1, 2.0), Vec3::NEG_Z);
        let hit = scene.intersect(&ray, false, true).unwrap();
        assert_eq!(hit.object, near);
        assert!((hit.distance - 3.0).abs() < 1e-5);

        let ray = Ray::new(Vec3::new(0.1, 0.1, -2.0), Vec3::NEG_Z);
        let hit = scene.intersect(&ray, false, true).unwrap();
        assert_eq!(hit.object, far);
        assert!((hit.distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_any_hit_and_miss() {
        let scene = row_of_quads(20);

        let ray = Ray::new(Vec3::new(10.0, 0.0, 1.0), Vec3::NEG_Z);
        let hit = scene.intersect(&ray, true, true).unwrap();
        assert_eq!(hit.object, 5);

        // Between two quads
        let ray = Ray::new(Vec3::new(11.0, 0.0, 1.0), Vec3::NEG_Z);
        assert!(scene.intersect(&ray, false, true).is_none());

        // Parallel to the row, above it
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 1.0), Vec3::X);
        assert!(scene.intersect(&ray, false, true).is_none());
    }

    #[test]
    fn test_ray_along_bounds_face_hits_edge() {
        // Rays in the x = -0.5 and x = 6.5 planes graze the outer quad
        // edges, which lie exactly on the faces of every enclosing box.
        let scene = row_of_quads(4);

        let ray = Ray::new(Vec3::new(-0.5, 0.1, 1.0), Vec3::NEG_Z);
        let hit = scene.intersect(&ray, false, true).unwrap();
        assert_eq!(hit.object, 0);
        assert!((hit.distance - 1.0).abs() < 1e-5);

        let ray = Ray::new(Vec3::new(6.5, -0.2, -1.0), Vec3::Z);
        let hit = scene.intersect(&ray, false, false).unwrap();
        assert_eq!(hit.object, 3);
        assert!((hit.distance - 1.0).abs() < 1e-5);

        // Between quads the shared plane holds no geometry
        let ray = Ray::new(Vec3::new(1.0, 0.5, 1.0), Vec3::NEG_Z);
        assert!(scene.intersect(&ray, true, true).is_none());
    }

    #[test]
    fn test_scaled_instance_distance_is_world_space() {
        let mut scene = Scene::new();
        let shape = scene.add_shape(unit_quad());
        let material = scene.add_material(Material::default());
        let frame = Frame::from_scale_rotation_translation(
            Vec3::new(4.0, 4.0, 1.0),
            lumen_math::Quat::IDENTITY,
            Vec3::new(0.0, 0.0, -5.0),
        );
        scene.add_object(Object::new(shape, material).with_frame(frame));
        scene.build_bvh(None).unwrap();

        // Outside the unit quad but inside the scaled one
        let ray = Ray::new(Vec3::new(1.5, 1.5, 0.0), Vec3::NEG_Z);
        let hit = scene.intersect(&ray, false, true).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert!((ray.at(hit.distance).z + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_intersect_requires_bvh() {
        let mut scene = row_of_quads(3);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z);
        assert!(scene.intersect(&ray, false, true).is_some());

        scene.object_mut(0).unwrap().frame = Frame::from_translation(Vec3::Y * 10.0);
        assert!(scene.bvh().is_none());
        assert!(scene.intersect(&ray, false, true).is_none());

        scene.build_bvh(None).unwrap();
        assert!(scene.intersect(&ray, false, true).is_none());
        let ray = Ray::new(Vec3::new(0.0, 10.0, 1.0), Vec3::NEG_Z);
        assert_eq!(scene.intersect(&ray, false, true).map(|hit| hit.object), Some(0));
    }

    #[test]
    fn test_validate_reports_missing_references() {
        let mut scene = Scene::new();
        let shape = scene.add_shape(unit_quad());
        scene.add_object(Object::new(shape, 3));
        assert_eq!(
            scene.build_bvh(None),
            Err(SceneError::MissingMaterial {
                object: 0,
                material: 3
            })
        );

        let mut scene = Scene::new();
        let mut material = Material::default();
        material.set_color(Color::ONE, Some(7));
        scene.add_material(material);
        assert!(matches!(
            scene.validate(),
            Err(SceneError::MissingTexture { texture: 7, .. })
        ));

        let mut scene = Scene::new();
        scene.add_shape(Shape::triangles(vec![[0, 1, 9]], vec![Vec3::ZERO; 3]));
        assert!(matches!(
            scene.validate(),
            Err(SceneError::InvalidShape {
                shape: 0,
                source: ShapeError::IndexOutOfBounds { vertex: 9, .. }
            })
        ));
    }

    #[test]
    fn test_build_progress_and_stats() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = row_of_quads(4);
        let calls = Mutex::new(Vec::new());
        let progress = |stage: &str, done: usize, total: usize| {
            calls.lock().unwrap().push((stage.to_string(), done, total));
        };
        scene.build_bvh(Some(&progress)).unwrap();

        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.first().map(|c| c.1), Some(0));
        assert_eq!(calls.last().map(|c| (c.1, c.2)), Some((2, 2)));

        let stats = scene.stats();
        assert_eq!(stats.objects, 4);
        assert_eq!(stats.shapes, 1);
        assert_eq!(stats.primitives, 2);

        let bounds = scene.world_bounds();
        assert!((bounds.min - Vec3::new(-0.5, -0.5, 0.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(6.5, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_environment_sum() {
        let mut scene = Scene::new();
        assert_eq!(scene.eval_environment(Vec3::Y), Color::ZERO);

        scene.add_environment(Environment::new(Color::new(0.5, 0.25, 1.0)));
        let mut texture = Texture::new();
        texture.set_color_f32(1, 1, vec![Color::splat(2.0)]).unwrap();
        let texture = scene.add_texture(texture);
        let mut env = Environment::new(Color::ONE);
        env.set_emission(Color::ONE, Some(texture));
        scene.add_environment(env);

        let radiance = scene.eval_environment(Vec3::new(0.3, -0.4, 0.1).normalize());
        assert!((radiance - Color::new(2.5, 2.25, 3.0)).length() < 1e-5);
    }
}
