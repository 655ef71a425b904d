//! Raster textures and bilinear sampling.
//!
//! A texture holds exactly one of four encodings: float or byte texels,
//! three-channel color or single-channel scalar. Setting one encoding
//! replaces whatever was stored before.

use lumen_math::{Vec2, Vec3};

use crate::error::{SceneError, SceneResult};

/// Texel storage, one variant per encoding.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TextureData {
    #[default]
    Empty,
    /// Linear float color.
    ColorF32(Vec<Vec3>),
    /// Display-encoded (sRGB) byte color.
    ColorU8(Vec<[u8; 3]>),
    /// Linear float scalar.
    ScalarF32(Vec<f32>),
    /// Display-encoded (sRGB) byte scalar.
    ScalarU8(Vec<u8>),
}

/// A raster image used to modulate material and environment parameters.
///
/// Texels are stored row-major with `(0, 0)` at the first texel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    data: TextureData,
}

impl Texture {
    /// Create an empty texture. Sampling it yields white.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a 1x1 linear color texture.
    pub fn solid_color(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            data: TextureData::ColorF32(vec![color]),
        }
    }

    /// Store linear float color texels.
    pub fn set_color_f32(&mut self, width: u32, height: u32, texels: Vec<Vec3>) -> SceneResult<()> {
        check_size(width, height, texels.len())?;
        self.assign(width, height, TextureData::ColorF32(texels));
        Ok(())
    }

    /// Store sRGB byte color texels.
    pub fn set_color_u8(&mut self, width: u32, height: u32, texels: Vec<[u8; 3]>) -> SceneResult<()> {
        check_size(width, height, texels.len())?;
        self.assign(width, height, TextureData::ColorU8(texels));
        Ok(())
    }

    /// Store linear float scalar texels.
    pub fn set_scalar_f32(&mut self, width: u32, height: u32, texels: Vec<f32>) -> SceneResult<()> {
        check_size(width, height, texels.len())?;
        self.assign(width, height, TextureData::ScalarF32(texels));
        Ok(())
    }

    /// Store sRGB byte scalar texels.
    pub fn set_scalar_u8(&mut self, width: u32, height: u32, texels: Vec<u8>) -> SceneResult<()> {
        check_size(width, height, texels.len())?;
        self.assign(width, height, TextureData::ScalarU8(texels));
        Ok(())
    }

    fn assign(&mut self, width: u32, height: u32, data: TextureData) {
        self.width = width;
        self.height = height;
        self.data = data;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &TextureData {
        &self.data
    }

    /// True when no texels are stored.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || matches!(self.data, TextureData::Empty)
    }

    /// Fetch one texel as a color.
    ///
    /// Byte texels are decoded to `[0, 1]` and, unless `ldr_as_linear` is
    /// set, converted from sRGB to linear.
    pub fn lookup(&self, i: u32, j: u32, ldr_as_linear: bool) -> Vec3 {
        let idx = (j * self.width + i) as usize;
        match &self.data {
            TextureData::Empty => Vec3::ONE,
            TextureData::ColorF32(texels) => texels[idx],
            TextureData::ColorU8(texels) => {
                let [r, g, b] = texels[idx];
                Vec3::new(
                    decode_byte(r, ldr_as_linear),
                    decode_byte(g, ldr_as_linear),
                    decode_byte(b, ldr_as_linear),
                )
            }
            TextureData::ScalarF32(texels) => Vec3::splat(texels[idx]),
            TextureData::ScalarU8(texels) => Vec3::splat(decode_byte(texels[idx], ldr_as_linear)),
        }
    }

    /// Bilinear lookup with periodic addressing on both axes.
    pub fn sample(&self, uv: Vec2, ldr_as_linear: bool) -> Vec3 {
        if self.is_empty() {
            return Vec3::ONE;
        }

        let (width, height) = (self.width as f32, self.height as f32);

        // texel space, wrapped into [0, size)
        let mut s = (uv.x % 1.0) * width;
        let mut t = (uv.y % 1.0) * height;
        if s < 0.0 {
            s += width;
        }
        if t < 0.0 {
            t += height;
        }

        let i = (s as u32).min(self.width - 1);
        let j = (t as u32).min(self.height - 1);
        let ii = (i + 1) % self.width;
        let jj = (j + 1) % self.height;
        let u = s - i as f32;
        let v = t - j as f32;

        self.lookup(i, j, ldr_as_linear) * (1.0 - u) * (1.0 - v)
            + self.lookup(i, jj, ldr_as_linear) * (1.0 - u) * v
            + self.lookup(ii, j, ldr_as_linear) * u * (1.0 - v)
            + self.lookup(ii, jj, ldr_as_linear) * u * v
    }
}

/// Sample an optional texture; a missing texture is constant white.
pub fn eval_texture(texture: Option<&Texture>, uv: Vec2, ldr_as_linear: bool) -> Vec3 {
    match texture {
        Some(texture) => texture.sample(uv, ldr_as_linear),
        None => Vec3::ONE,
    }
}

fn check_size(width: u32, height: u32, len: usize) -> SceneResult<()> {
    if width as usize * height as usize != len {
        return Err(SceneError::TextureSize { width, height, len });
    }
    Ok(())
}

fn decode_byte(value: u8, ldr_as_linear: bool) -> f32 {
    let v = value as f32 / 255.0;
    if ldr_as_linear {
        v
    } else {
        srgb_to_linear(v)
    }
}

/// Convert an sRGB encoded value in `[0, 1]` to linear.
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
