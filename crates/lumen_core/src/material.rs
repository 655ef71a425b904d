//! Physically based material parameters.

use lumen_math::Vec3;

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Surface and volume parameters of an object.
///
/// Every parameter can be modulated by an optional texture, referenced by its
/// index in the owning scene. Scalar parameters read the first channel of
/// their texture (opacity reads the channel mean).
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub emission: Color,
    pub color: Color,
    pub specular: f32,
    pub metallic: f32,
    /// Stored squared, see [`Material::set_roughness`].
    roughness: f32,
    pub transmission: f32,
    pub thin: bool,
    pub trdepth: f32,
    pub opacity: f32,
    pub scattering: Color,
    pub scanisotropy: f32,
    pub ior: f32,

    pub emission_tex: Option<usize>,
    pub color_tex: Option<usize>,
    pub specular_tex: Option<usize>,
    pub metallic_tex: Option<usize>,
    pub roughness_tex: Option<usize>,
    pub transmission_tex: Option<usize>,
    pub opacity_tex: Option<usize>,
    pub scattering_tex: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            emission: Color::ZERO,
            color: Color::splat(0.5),
            specular: 0.0,
            metallic: 0.0,
            roughness: 0.0,
            transmission: 0.0,
            thin: true,
            trdepth: 0.01,
            opacity: 1.0,
            scattering: Color::ZERO,
            scanisotropy: 0.0,
            ior: 1.5,
            emission_tex: None,
            color_tex: None,
            specular_tex: None,
            metallic_tex: None,
            roughness_tex: None,
            transmission_tex: None,
            opacity_tex: None,
            scattering_tex: None,
        }
    }
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    /// A purely diffuse material.
    pub fn diffuse(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// An emitter with black base color.
    pub fn emissive(emission: Color) -> Self {
        Self {
            emission,
            color: Color::ZERO,
            ..Default::default()
        }
    }

    pub fn set_emission(&mut self, emission: Color, texture: Option<usize>) {
        self.emission = emission;
        self.emission_tex = texture;
    }

    pub fn set_color(&mut self, color: Color, texture: Option<usize>) {
        self.color = color;
        self.color_tex = texture;
    }

    pub fn set_specular(&mut self, specular: f32, texture: Option<usize>) {
        self.specular = specular;
        self.specular_tex = texture;
    }

    pub fn set_metallic(&mut self, metallic: f32, texture: Option<usize>) {
        self.metallic = metallic;
        self.metallic_tex = texture;
    }

    /// Set the perceptual roughness. The value is squared on storage so
    /// that roughness ramps look linear.
    pub fn set_roughness(&mut self, roughness: f32, texture: Option<usize>) {
        self.roughness = roughness * roughness;
        self.roughness_tex = texture;
    }

    /// The stored (squared) roughness.
    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_transmission(&mut self, transmission: f32, thin: bool, trdepth: f32, texture: Option<usize>) {
        self.transmission = transmission;
        self.thin = thin;
        self.trdepth = trdepth;
        self.transmission_tex = texture;
    }

    pub fn set_opacity(&mut self, opacity: f32, texture: Option<usize>) {
        self.opacity = opacity;
        self.opacity_tex = texture;
    }

    pub fn set_scattering(&mut self, scattering: Color, scanisotropy: f32, texture: Option<usize>) {
        self.scattering = scattering;
        self.scanisotropy = scanisotropy;
        self.scattering_tex = texture;
    }

    pub fn set_ior(&mut self, ior: f32) {
        self.ior = ior;
    }

    /// Every texture slot paired with its name.
    pub fn texture_slots(&self) -> [(&'static str, Option<usize>); 8] {
        [
            ("emission", self.emission_tex),
            ("color", self.color_tex),
            ("specular", self.specular_tex),
            ("metallic", self.metallic_tex),
            ("roughness", self.roughness_tex),
            ("transmission", self.transmission_tex),
            ("opacity", self.opacity_tex),
            ("scattering", self.scattering_tex),
        ]
    }
}
