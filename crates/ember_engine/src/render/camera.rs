//! 3D camera
//!
//! A camera in 3D space with position, orientation, perspective projection
//! parameters, and photometric exposure. Matrices are computed on demand in
//! the standard right-handed, Y-up convention.

use crate::foundation::math::{Mat4, Point3, Vec3};

/// 3D camera for perspective projection
///
/// Exposure follows the photographic model: the triplet of aperture, shutter
/// speed and sensitivity determines an EV100 value, and the exposure scale
/// applied to shaded output is `1 / (1.2 * 2^ev100)`.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    fov_deg: f32,
    aspect: f32,
    near: f32,
    far: f32,

    aperture: f32,
    shutter_speed: f32,
    sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Create a camera at the origin looking down -Z.
    ///
    /// Projection defaults to 45° with a square aspect; exposure defaults to
    /// the photographic "sunny 16" triplet (f/16, 1/125s, ISO 100).
    pub fn new() -> Self {
        Self {
            position: Vec3::zeros(),
            target: -Vec3::z(),
            up: Vec3::y(),
            fov_deg: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            aperture: 16.0,
            shutter_speed: 1.0 / 125.0,
            sensitivity: 100.0,
        }
    }

    /// Set the perspective projection parameters.
    ///
    /// `fov_deg` is the vertical field of view in degrees.
    pub fn set_projection(&mut self, fov_deg: f32, aspect: f32, near: f32, far: f32) {
        self.fov_deg = fov_deg;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
    }

    /// Orient the camera from an eye point towards a center point.
    pub fn look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.position = eye;
        self.target = center;
        self.up = up;
    }

    /// Set the exposure from physical camera settings.
    ///
    /// `shutter_speed` is in seconds, `sensitivity` in ISO.
    pub fn set_exposure(&mut self, aperture: f32, shutter_speed: f32, sensitivity: f32) {
        self.aperture = aperture;
        self.shutter_speed = shutter_speed;
        self.sensitivity = sensitivity;
    }

    /// Set the exposure scale directly.
    ///
    /// Convenience over [`Camera::set_exposure`]: picks a synthetic triplet
    /// such that [`Camera::exposure`] returns exactly `exposure`.
    pub fn set_exposure_direct(&mut self, exposure: f32) {
        self.set_exposure(1.0, 1.2, 100.0 * exposure);
    }

    /// The EV100 value of the current exposure settings.
    pub fn ev100(&self) -> f32 {
        (self.aperture * self.aperture / self.shutter_speed * 100.0 / self.sensitivity).log2()
    }

    /// The exposure scale applied to shaded output.
    pub fn exposure(&self) -> f32 {
        1.0 / (1.2 * 2.0_f32.powf(self.ev100()))
    }

    /// The world-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// The view-to-clip projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov_deg.to_radians(), self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_relative_eq, relative_eq};
    use nalgebra::Vector4;

    #[test]
    fn sunny_16_defaults_give_the_expected_ev100() {
        let camera = Camera::new();
        // log2(16^2 / (1/125) * 100/100) = log2(32000)
        assert_relative_eq!(camera.ev100(), 32000.0_f32.log2(), epsilon = 1e-5);
        assert_relative_eq!(camera.exposure(), 1.0 / (1.2 * 32000.0), epsilon = 1e-9);
    }

    #[test]
    fn direct_exposure_round_trips() {
        let mut camera = Camera::new();
        camera.set_exposure_direct(100.0);
        assert_relative_eq!(camera.exposure(), 100.0, epsilon = 1e-2);

        camera.set_exposure_direct(0.5);
        assert_relative_eq!(camera.exposure(), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn view_matrix_maps_the_eye_to_the_origin() {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y());

        let eye = camera.view_matrix() * Vector4::new(0.0, 0.0, 10.0, 1.0);
        assert_relative_eq!(eye.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn view_matrix_looks_down_negative_z() {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y());

        // The look-at center sits in front of the camera, on -Z in view space.
        let center = camera.view_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(center.z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn projection_matches_nalgebra_perspective() {
        let mut camera = Camera::new();
        camera.set_projection(45.0, 1280.0 / 720.0, 0.1, 100.0);

        let expected = nalgebra::Perspective3::new(1280.0 / 720.0, 45.0_f32.to_radians(), 0.1, 100.0);
        let actual = camera.projection_matrix();
        assert!(relative_eq!(
            actual,
            expected.to_homogeneous(),
            epsilon = 1e-5
        ));
    }
}
