//! Pinhole and thin-lens camera.

use lumen_math::{Frame, Ray, UVec2, Vec2, Vec3};

/// A camera looking down its frame's -z axis.
///
/// `film` is the sensor size and `lens` the focal length, both in meters.
/// With a positive `aperture` the camera becomes a thin lens focused at
/// distance `focus`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub frame: Frame,
    pub lens: f32,
    pub film: Vec2,
    pub aperture: f32,
    pub focus: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            frame: Frame::IDENTITY,
            lens: 0.050,
            film: Vec2::new(0.036, 0.024),
            aperture: 0.0,
            focus: 10000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the camera at `look_from`, looking at `look_at`.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.set_frame(look_at_frame(look_from, look_at, vup));
        self
    }

    /// Set lens settings, see [`Camera::set_lens`].
    pub fn with_lens(mut self, lens: f32, aspect: f32, film: f32) -> Self {
        self.set_lens(lens, aspect, film);
        self
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    /// Set the focal length and derive the film rectangle from an aspect
    /// ratio; `film` is the length of the longer side.
    pub fn set_lens(&mut self, lens: f32, aspect: f32, film: f32) {
        self.lens = lens;
        self.film = if aspect >= 1.0 {
            Vec2::new(film, film / aspect)
        } else {
            Vec2::new(film * aspect, film)
        };
    }

    pub fn set_focus(&mut self, aperture: f32, focus: f32) {
        self.aperture = aperture;
        self.focus = focus;
    }

    pub fn aspect(&self) -> f32 {
        self.film.x / self.film.y
    }

    /// Image size whose longer edge is `resolution` pixels and whose aspect
    /// matches the film.
    pub fn image_size(&self, resolution: u32) -> UVec2 {
        let scaled = |num: f32, den: f32| (resolution as f32 * num / den).round() as u32;
        if self.film.x > self.film.y {
            UVec2::new(resolution, scaled(self.film.y, self.film.x))
        } else {
            UVec2::new(scaled(self.film.x, self.film.y), resolution)
        }
    }

    /// Generate a world-space ray through normalized image coordinates.
    ///
    /// `image_uv` spans `[0, 1]^2` with `(0, 0)` at the top left. `lens_uv`
    /// is a point in the unit disc and only matters when `aperture > 0`.
    pub fn eval_ray(&self, image_uv: Vec2, lens_uv: Vec2) -> Ray {
        let q = Vec3::new(
            self.film.x * (0.5 - image_uv.x),
            self.film.y * (image_uv.y - 0.5),
            self.lens,
        );
        let dir = -q.normalize();

        if self.aperture <= 0.0 {
            return Ray::new(
                self.frame.transform_point3(Vec3::ZERO),
                self.frame.transform_vector3(dir).normalize(),
            );
        }

        // aim the lens sample at the point the pinhole ray meets the focus plane
        let focus_point = dir * self.focus / dir.z.abs();
        let lens_point = (lens_uv * self.aperture / 2.0).extend(0.0);
        let dir = (focus_point - lens_point).normalize();
        Ray::new(
            self.frame.transform_point3(lens_point),
            self.frame.transform_vector3(dir).normalize(),
        )
    }
}

/// Frame at `from` whose -z axis points at `to`.
pub fn look_at_frame(from: Vec3, to: Vec3, up: Vec3) -> Frame {
    let w = (from - to).normalize();
    let u = up.cross(w).normalize();
    let v = w.cross(u);
    Frame::from_cols(u.into(), v.into(), w.into(), from.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_follows_film_aspect() {
        let camera = Camera::default();
        assert_eq!(camera.image_size(720), UVec2::new(720, 480));

        let portrait = Camera::new().with_lens(0.05, 0.5, 0.036);
        assert_eq!(portrait.film, Vec2::new(0.018, 0.036));
        assert_eq!(portrait.image_size(100), UVec2::new(50, 100));
    }

    #[test]
    fn test_center_ray_points_down_neg_z() {
        let camera = Camera::default();
        let ray = camera.eval_ray(Vec2::splat(0.5), Vec2::ZERO);

        assert_eq!(ray.origin, Vec3::ZERO);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_image_corners() {
        let camera = Camera::default();

        // Top left of the image looks up and to the left
        let ray = camera.eval_ray(Vec2::ZERO, Vec2::ZERO);
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);

        let ray = camera.eval_ray(Vec2::ONE, Vec2::ZERO);
        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.y < 0.0);
    }

    #[test]
    fn test_look_at() {
        let camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let ray = camera.eval_ray(Vec2::splat(0.5), Vec2::ZERO);

        assert!((ray.origin - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-6);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);

        let camera = Camera::new().with_position(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y);
        let ray = camera.eval_ray(Vec2::splat(0.5), Vec2::ZERO);
        assert!((ray.direction - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn test_thin_lens_converges_at_focus() {
        let mut camera = Camera::default();
        camera.set_focus(0.1, 4.0);

        let uv = Vec2::new(0.3, 0.6);
        let a = camera.eval_ray(uv, Vec2::new(1.0, 0.0));
        let b = camera.eval_ray(uv, Vec2::new(-0.5, 0.5));
        assert_ne!(a.origin, b.origin);

        // Both rays reach the plane z = -4 at the same point
        let pa = a.at(4.0 / -a.direction.z);
        let pb = b.at(4.0 / -b.direction.z);
        assert!((pa - pb).length() < 1e-4);
    }
}
