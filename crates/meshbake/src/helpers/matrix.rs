use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, Quaternion, Vector3, Vector4};

/// Column-major 4x4 matrix as laid out in the GPU instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceMatrix {
    pub cols: [[f32; 4]; 4],
}

impl From<Matrix4<f32>> for InstanceMatrix {
    fn from(m: Matrix4<f32>) -> Self {
        Self { cols: m.into() }
    }
}

impl From<InstanceMatrix> for Matrix4<f32> {
    fn from(m: InstanceMatrix) -> Self {
        Matrix4::from(m.cols)
    }
}

/// glTF `matrix` property (16 floats, column major).
pub fn matrix_from_gltf(m: &[f32; 16]) -> Matrix4<f32> {
    Matrix4::from_cols(
        Vector4::new(m[0], m[1], m[2], m[3]),
        Vector4::new(m[4], m[5], m[6], m[7]),
        Vector4::new(m[8], m[9], m[10], m[11]),
        Vector4::new(m[12], m[13], m[14], m[15]),
    )
}

/// T * R * S, rotation given as glTF quaternion `[x, y, z, w]`.
pub fn matrix_from_trs(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Matrix4<f32> {
    let t = Matrix4::from_translation(Vector3::new(translation[0], translation[1], translation[2]));
    let r = Matrix4::from(Quaternion::new(
        rotation[3],
        rotation[0],
        rotation[1],
        rotation[2],
    ));
    let s = Matrix4::from_nonuniform_scale(scale[0], scale[1], scale[2]);
    t * r * s
}

/// Point (w = 1) taken into clip space.
#[inline]
pub fn to_clip(transform: &Matrix4<f32>, p: Vector3<f32>) -> Vector4<f32> {
    transform * p.extend(1.0)
}
