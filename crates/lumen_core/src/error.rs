//! Errors raised while assembling or validating a scene.

use thiserror::Error;

/// Problems found in a single shape's geometry arrays.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("element {element} references vertex {vertex} but only {count} positions exist")]
    IndexOutOfBounds {
        element: usize,
        vertex: u32,
        count: usize,
    },

    #[error("{attribute} has {len} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        len: usize,
        expected: usize,
    },
}

/// Errors that can occur while wiring scene entities together.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("object {object} references missing shape {shape}")]
    MissingShape { object: usize, shape: usize },

    #[error("object {object} references missing material {material}")]
    MissingMaterial { object: usize, material: usize },

    #[error("{owner} references missing texture {texture}")]
    MissingTexture { owner: String, texture: usize },

    #[error("invalid shape {shape}: {source}")]
    InvalidShape {
        shape: usize,
        #[source]
        source: ShapeError,
    },

    #[error("texture data has {len} texels, expected {width}x{height}")]
    TextureSize { width: u32, height: u32, len: usize },
}

pub type SceneResult<T> = Result<T, SceneError>;
