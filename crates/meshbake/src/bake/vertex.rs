use std::mem;

/// Baked vertex: two 16-byte groups.
///
/// `position_normal` holds the position in lanes 0..3 and the quantized
/// normal bit pattern in lane 3. `texcoord_tangent` holds the texcoord in
/// lanes 0..2, the quantized tangent bit pattern in lane 2, lane 3 is padding.
/// The packed lanes are not numbers: read them back with [`Vertex::normal`]
/// and [`Vertex::tangent`], never as floats.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position_normal: [f32; 4],
    pub texcoord_tangent: [f32; 4],
}

pub const VERTEX_SIZE: usize = mem::size_of::<Vertex>();

pub const POSITION_OFFSET: usize = 0;
pub const NORMAL_OFFSET: usize = 12;
pub const TEXCOORD_OFFSET: usize = 16;
pub const TANGENT_OFFSET: usize = 24;

/// Maps a unit-range component onto a signed byte, rounding half away from zero.
#[inline]
pub fn quantize_component(c: f32) -> i8 {
    (c.clamp(-1.0, 1.0) * 127.0).round() as i8
}

/// Packs four components little-endian into one 32-bit word.
#[inline]
pub fn pack_snorm8x4(v: [f32; 4]) -> u32 {
    u32::from_le_bytes(v.map(|c| quantize_component(c) as u8))
}

#[inline]
pub fn unpack_snorm8x4(bits: u32) -> [i8; 4] {
    bits.to_le_bytes().map(|b| b as i8)
}

#[inline]
pub fn dequantize(v: [i8; 4]) -> [f32; 4] {
    v.map(|b| (b as f32 / 127.0).max(-1.0))
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], texcoord: [f32; 2], tangent: [f32; 4]) -> Self {
        let normal = pack_snorm8x4([normal[0], normal[1], normal[2], 0.0]);
        let tangent = pack_snorm8x4(tangent);
        Self {
            position_normal: [position[0], position[1], position[2], f32::from_bits(normal)],
            texcoord_tangent: [texcoord[0], texcoord[1], f32::from_bits(tangent), 0.0],
        }
    }

    pub fn position(&self) -> [f32; 3] {
        let p = self.position_normal;
        [p[0], p[1], p[2]]
    }

    pub fn texcoord(&self) -> [f32; 2] {
        [self.texcoord_tangent[0], self.texcoord_tangent[1]]
    }

    pub fn normal(&self) -> [i8; 4] {
        unpack_snorm8x4(self.position_normal[3].to_bits())
    }

    pub fn tangent(&self) -> [i8; 4] {
        unpack_snorm8x4(self.texcoord_tangent[2].to_bits())
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Positions
                wgpu::VertexAttribute {
                    offset: POSITION_OFFSET as wgpu::BufferAddress,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normals
                wgpu::VertexAttribute {
                    offset: NORMAL_OFFSET as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Snorm8x4,
                },
                // Texcoord0
                wgpu::VertexAttribute {
                    offset: TEXCOORD_OFFSET as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // Tangents
                wgpu::VertexAttribute {
                    offset: TANGENT_OFFSET as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Snorm8x4,
                },
            ],
        }
    }
}
