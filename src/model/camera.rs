use glam::{Mat3, Mat4, Vec3};

pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 3.0),
            yaw: -std::f32::consts::FRAC_PI_2, // facing -Z
            pitch: 0.0,
            up: Vec3::Y,
            fov_y: 45f32.to_radians(),
            aspect: width as f32 / height as f32,
            z_near: 0.1,
            z_far: 100.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-1.5533, 1.5533); // Slightly less than π/2 to avoid gimbal lock
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    pub fn target(&self) -> Vec3 {
        self.eye + self.forward()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target(), self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    /// View matrix with the translation stripped, so a skybox stays centered
    /// on the viewer no matter where the camera moves.
    pub fn rotation_view(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_mat4(self.view_matrix()))
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let dir = (target - self.eye).normalize();
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_default_faces_negative_z() {
        let camera = Camera::new(1280, 720);
        let f = camera.forward();
        assert!(f.z < -0.99 && f.x.abs() < 1e-6, "default orientation looks down -Z: {f:?}");
    }

    #[test]
    fn test_look_at_round_trip() {
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec3::new(-4.0, 0.5, -7.0);
        camera.set_look_at(target);
        let dir = (target - camera.eye).normalize();
        assert!((camera.forward() - dir).length() < 1e-4);
    }

    #[test]
    fn test_rotation_view_has_no_translation() {
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(10.0, -3.0, 25.0);
        camera.yaw = 1.1;
        camera.pitch = -0.4;

        let rot_only = camera.rotation_view();
        let translation = rot_only * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(
            translation.truncate().length() < 1e-6,
            "skybox view must not move with the eye: {translation:?}"
        );
    }

    #[test]
    fn test_set_aspect() {
        let mut camera = Camera::new(800, 600);
        camera.set_aspect(1920, 1080);
        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }
}
