//! Trace configuration and renderer errors.

use std::fmt;
use std::str::FromStr;

use lumen_core::SceneError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unknown shader {0:?}, expected one of raytrace, eyelight, normal, texcoord, color")]
    UnknownShader(String),

    #[error("scene BVH has not been built")]
    MissingBvh,

    #[error("camera {index} does not exist ({count} cameras in scene)")]
    MissingCamera { index: usize, count: usize },

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Per-ray color function used by the sampling driver.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderType {
    /// Full path tracing.
    #[default]
    Raytrace,
    /// Base color shaded by the cosine to the viewer.
    Eyelight,
    /// World-space normals remapped to `[0, 1]`.
    Normal,
    /// Fractional texture coordinates.
    Texcoord,
    /// Raw material base color.
    Color,
}

impl ShaderType {
    pub const NAMES: [&'static str; 5] = ["raytrace", "eyelight", "normal", "texcoord", "color"];

    pub const ALL: [ShaderType; 5] = [
        ShaderType::Raytrace,
        ShaderType::Eyelight,
        ShaderType::Normal,
        ShaderType::Texcoord,
        ShaderType::Color,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderType::Raytrace => "raytrace",
            ShaderType::Eyelight => "eyelight",
            ShaderType::Normal => "normal",
            ShaderType::Texcoord => "texcoord",
            ShaderType::Color => "color",
        }
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShaderType {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShaderType::ALL
            .into_iter()
            .find(|shader| shader.name() == s)
            .ok_or_else(|| RenderError::UnknownShader(s.to_string()))
    }
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    /// Index of the scene camera to render from
    pub camera: usize,
    /// Pixel count of the image's longer edge
    pub resolution: u32,
    /// Shader used for every camera ray
    pub shader: ShaderType,
    /// Samples per pixel for a full render
    pub samples: u32,
    /// Maximum ray bounce depth
    pub bounces: u32,
    /// Seed for the per-pixel random streams
    pub seed: u64,
    /// Ceiling on the largest channel of a single sample
    pub clamp: f32,
    /// Trace rows on the calling thread only
    pub noparallel: bool,
    /// Use general instead of rigid inverses for instance frames
    pub non_rigid_frames: bool,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            camera: 0,
            resolution: 720,
            shader: ShaderType::Raytrace,
            samples: 512,
            bounces: 4,
            seed: 961748941,
            clamp: 100.0,
            noparallel: false,
            non_rigid_frames: true,
        }
    }
}
