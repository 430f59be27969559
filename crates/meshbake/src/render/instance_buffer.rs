use crate::helpers::{BakeError, InstanceMatrix};

pub const INSTANCE_MATRIX_SIZE: usize = std::mem::size_of::<InstanceMatrix>();

/// GPU storage buffer holding up to `capacity` instance matrices.
///
/// Sized once at creation; per-frame uploads never grow it.
#[derive(Clone, Debug)]
pub struct InstanceBuffer {
    pub buf: wgpu::Buffer,
    pub capacity: usize, // #instances
}

impl InstanceBuffer {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let size = (capacity.max(1) * INSTANCE_MATRIX_SIZE) as wgpu::BufferAddress;
        let buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_matrices_storage"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { buf, capacity }
    }

    /// Copies `instances` to the start of the buffer in one write.
    pub fn upload(&self, queue: &wgpu::Queue, instances: &[InstanceMatrix]) -> Result<(), BakeError> {
        check_capacity(self.capacity, instances.len())?;
        if !instances.is_empty() {
            queue.write_buffer(&self.buf, 0, bytemuck::cast_slice(instances));
        }
        Ok(())
    }

    /// Layout for reading instance matrices as per-instance vertex
    /// attributes, see [`instance_attributes`].
    pub fn desc<'a>(attributes: &'a [wgpu::VertexAttribute; 4]) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: INSTANCE_MATRIX_SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    }
}

/// One Float32x4 attribute per matrix column.
pub fn instance_attributes(first_location: u32) -> [wgpu::VertexAttribute; 4] {
    let column = |i: u32| wgpu::VertexAttribute {
        offset: (i as u64) * 16,
        shader_location: first_location + i,
        format: wgpu::VertexFormat::Float32x4,
    };
    [column(0), column(1), column(2), column(3)]
}

pub fn check_capacity(capacity: usize, needed: usize) -> Result<(), BakeError> {
    if needed > capacity {
        log::error!("Instance buffer too small ({}), need {}", capacity, needed);
        return Err(BakeError::Internal(format!(
            "{needed} instances exceed buffer capacity {capacity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrices_are_64_bytes() {
        assert_eq!(INSTANCE_MATRIX_SIZE, 64);
    }

    #[test]
    fn columns_map_to_consecutive_locations() {
        let attrs = instance_attributes(4);
        assert_eq!(attrs[0].shader_location, 4);
        assert_eq!(attrs[3].shader_location, 7);
        assert_eq!(attrs[3].offset, 48);
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(check_capacity(4096, 4096).is_ok());
        assert!(check_capacity(4096, 4097).is_err());
    }
}
