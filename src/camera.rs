//! Perspective camera looking down the z axis at the point grid, with an
//! eased zoom toward a target distance.

use glam::{Mat4, Vec3};

pub const DEFAULT_CAMERA_Z: f32 = 50.0;

/// Fraction of the remaining distance covered per frame while easing.
const ZOOM_EASE: f32 = 0.02;

pub struct Camera {
    pub z: f32,
    pub target_z: f32,
    pub fov_y_degrees: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            z: DEFAULT_CAMERA_Z,
            target_z: DEFAULT_CAMERA_Z,
            fov_y_degrees: 45.0,
            aspect,
        }
    }

    /// Moves a fixed fraction toward the target distance. Called once per
    /// frame.
    pub fn ease(&mut self) {
        self.z += (self.target_z - self.z) * ZOOM_EASE;
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            0.1,
            1000.0,
        );
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, self.z), Vec3::ZERO, Vec3::Y);
        proj * view
    }

    /// Width/height of the visible slice of the z=0 plane, in world units.
    /// Drives how large the point grid has to be to fill the screen.
    pub fn world_size(&self) -> (f32, f32) {
        let v_fov = self.fov_y_degrees.to_radians();
        let height = 2.0 * (v_fov / 2.0).tan() * self.z.abs();
        let width = height * self.aspect;
        (width, height)
    }
}
