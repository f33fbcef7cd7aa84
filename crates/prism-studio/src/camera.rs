use glam::{Mat4, Vec3};
use prism_engine::tracer::CameraMatrices;

/// Camera circling a target point, looking at it.
///
/// Right-handed, +Y up; the camera looks down its local -Z, which is what the
/// trace program assumes when it unprojects through `_CameraInverseProjection`.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Radians around +Y.
    pub yaw: f32,
    /// Radians above the horizon.
    pub pitch: f32,
    /// Radians per second added to `yaw`.
    pub spin: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 0.8, 0.0),
            distance: 7.0,
            yaw: 0.0,
            pitch: 0.25,
            spin: 0.2,
            fov_y: 60f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl OrbitCamera {
    pub fn advance(&mut self, dt: f32) {
        self.yaw = (self.yaw + self.spin * dt).rem_euclid(std::f32::consts::TAU);
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(cp * sy, sp, cp * cy)
    }

    pub fn matrices(&self, aspect: f32) -> CameraMatrices {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let projection = Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far);
        CameraMatrices::new(view.inverse(), projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_to_world_origin_is_eye() {
        let cam = OrbitCamera::default();
        let m = cam.matrices(16.0 / 9.0);
        let origin = m.camera_to_world.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(cam.eye(), 1e-4));
    }

    #[test]
    fn local_forward_points_at_target() {
        let cam = OrbitCamera { yaw: 1.2, ..Default::default() };
        let m = cam.matrices(1.0);
        let forward = m.camera_to_world.transform_vector3(Vec3::NEG_Z).normalize();
        let expected = (cam.target - cam.eye()).normalize();
        assert!(forward.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn advance_wraps_yaw() {
        let mut cam = OrbitCamera { yaw: 6.2, spin: 1.0, ..Default::default() };
        cam.advance(0.5);
        assert!(cam.yaw >= 0.0 && cam.yaw < std::f32::consts::TAU);
        assert!((cam.yaw - (6.7 - std::f32::consts::TAU)).abs() < 1e-4);
    }

    #[test]
    fn eye_keeps_distance() {
        let cam = OrbitCamera { yaw: 2.0, pitch: 0.7, ..Default::default() };
        assert!(((cam.eye() - cam.target).length() - cam.distance).abs() < 1e-4);
    }
}
