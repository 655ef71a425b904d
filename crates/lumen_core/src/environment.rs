//! Infinitely distant environment lights.

use std::f32::consts::PI;

use lumen_math::{Frame, FrameExt, Vec2, Vec3};

use crate::material::Color;

/// An emitter at infinity, optionally modulated by a lat-long texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub frame: Frame,
    pub emission: Color,
    pub emission_tex: Option<usize>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            frame: Frame::IDENTITY,
            emission: Color::ZERO,
            emission_tex: None,
        }
    }
}

impl Environment {
    /// A constant environment.
    pub fn new(emission: Color) -> Self {
        Self {
            emission,
            ..Default::default()
        }
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn set_emission(&mut self, emission: Color, texture: Option<usize>) {
        self.emission = emission;
        self.emission_tex = texture;
    }

    /// Lat-long texture coordinates of a world-space direction.
    ///
    /// `u` wraps around the local y axis starting at +x; `v` runs from the
    /// +y pole (0) to the -y pole (1).
    pub fn eval_texcoord(&self, direction: Vec3) -> Vec2 {
        let local = self
            .frame
            .inverse_frame(true)
            .transform_vector3(direction)
            .normalize_or_zero();

        let mut u = local.z.atan2(local.x) / (2.0 * PI);
        if u < 0.0 {
            u += 1.0;
        }
        let v = local.y.clamp(-1.0, 1.0).acos() / PI;
        Vec2::new(u, v)
    }
}
