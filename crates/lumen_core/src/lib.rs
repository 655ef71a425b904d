//! Lumen core - scene model and ray intersection
//!
//! Holds everything the renderer reads while tracing: cameras, shapes,
//! materials, textures, environments and the two-level BVH used to
//! intersect rays with instanced geometry.

pub mod bvh;
pub mod camera;
pub mod environment;
pub mod error;
pub mod material;
pub mod primitive;
pub mod scene;
pub mod shape;
pub mod texture;

pub use bvh::{Bvh, BvhNode, BvhPrimitive, BVH_MAX_PRIMS, BVH_STACK_SIZE};
pub use camera::{look_at_frame, Camera};
pub use environment::Environment;
pub use error::{SceneError, SceneResult, ShapeError};
pub use material::{Color, Material};
pub use scene::{Intersection, Object, ProgressCallback, Scene, SceneStats};
pub use shape::{ElementHit, Shape, Topology, DEFAULT_RADIUS};
pub use texture::{eval_texture, srgb_to_linear, Texture, TextureData};

/// Re-export math types from lumen_math
pub use lumen_math::{Aabb, Frame, FrameExt, Ray, Vec2, Vec3, Vec4};
