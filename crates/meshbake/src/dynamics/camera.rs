use cgmath::{perspective, Deg, Matrix4, Point3, Vector3};

use crate::world::CameraConfig;

/// Right-handed look-at camera with a perspective projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(eye: Point3<f32>, target: Point3<f32>, config: &CameraConfig) -> Self {
        Self {
            eye,
            target,
            up: Vector3::unit_y(),
            fovy: Deg(config.fovy_deg),
            near: config.near,
            far: config.far,
            aspect: 1.0,
        }
    }

    /// Sets the aspect ratio from the viewport. Returns false for a zero-sized
    /// viewport, which leaves the camera unchanged.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_position(&mut self, eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
        self.eye = eye;
        self.target = target;
        self.up = up;
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.near, self.far)
    }

    pub fn proj_view(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }
}
