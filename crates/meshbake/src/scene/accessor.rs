use byteorder::{ByteOrder, LittleEndian};

use crate::{
    helpers::BakeError,
    scene::{
        component_size, Accessor, Document, COMPONENT_BYTE, COMPONENT_FLOAT, COMPONENT_SHORT,
        COMPONENT_UNSIGNED_BYTE, COMPONENT_UNSIGNED_INT, COMPONENT_UNSIGNED_SHORT,
    },
};

/// Strided, bounds-checked window onto one accessor's elements.
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    pub index: usize,
    /// Bytes from the first element to the end of the buffer view. `None`
    /// for accessors without a buffer view, which read as zeros.
    data: Option<&'a [u8]>,
    pub stride: usize,
    pub count: usize,
    pub component_type: u32,
    pub components: usize,
    pub normalized: bool,
}

impl<'a> AccessorView<'a> {
    pub fn new(
        document: &'a Document,
        buffers: &'a [Vec<u8>],
        index: usize,
    ) -> Result<Self, BakeError> {
        let accessor: &Accessor = document.accessors.get(index).ok_or_else(|| {
            BakeError::InvalidInput(format!("accessor {index} does not exist"))
        })?;

        let size = component_size(accessor.component_type).ok_or(
            BakeError::UnsupportedComponentType {
                accessor: index,
                component_type: accessor.component_type,
            },
        )?;
        let components = accessor.component_count().ok_or_else(|| {
            BakeError::InvalidInput(format!(
                "accessor {index} has unknown type {}",
                accessor.kind
            ))
        })?;
        let element_size = size * components;

        let Some(view_index) = accessor.buffer_view else {
            return Ok(Self {
                index,
                data: None,
                stride: element_size,
                count: accessor.count,
                component_type: accessor.component_type,
                components,
                normalized: accessor.normalized,
            });
        };

        let view = document.buffer_views.get(view_index).ok_or_else(|| {
            BakeError::InvalidInput(format!(
                "accessor {index} references missing bufferView {view_index}"
            ))
        })?;
        let buffer = buffers.get(view.buffer).ok_or_else(|| {
            BakeError::Buffer(format!(
                "bufferView {view_index} references missing buffer {}",
                view.buffer
            ))
        })?;

        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                BakeError::Buffer(format!(
                    "bufferView {view_index} ({} + {} bytes) exceeds its buffer of {} bytes",
                    view.byte_offset,
                    view.byte_length,
                    buffer.len()
                ))
            })?;

        let stride = view.byte_stride.unwrap_or(element_size);
        let needed = match accessor.count {
            0 => Some(0),
            n => stride
                .checked_mul(n - 1)
                .and_then(|span| span.checked_add(accessor.byte_offset))
                .and_then(|span| span.checked_add(element_size)),
        };
        let Some(needed) = needed.filter(|&needed| needed <= view.byte_length) else {
            return Err(BakeError::AccessorOutOfBounds {
                accessor: index,
                needed: needed.unwrap_or(usize::MAX),
                available: view.byte_length,
            });
        };

        let start = view.byte_offset + accessor.byte_offset.min(view.byte_length);
        Ok(Self {
            index,
            data: Some(&buffer[start..view_end]),
            stride,
            count: accessor.count,
            component_type: accessor.component_type,
            components,
            normalized: accessor.normalized,
        })
    }

    /// Reads element `i` as floats, decoding normalized integers. Lanes past
    /// the accessor's component count are zero.
    pub fn read_f32<const N: usize>(&self, i: usize) -> [f32; N] {
        let mut out = [0.0f32; N];
        let Some(data) = self.data else {
            return out;
        };
        let size = component_size(self.component_type).unwrap_or(4);
        let base = i * self.stride;
        for (c, lane) in out.iter_mut().enumerate().take(self.components) {
            let at = base + c * size;
            *lane = decode_component(&data[at..at + size], self.component_type, self.normalized);
        }
        out
    }

    /// Copies every element into `out` as 32-bit indices.
    ///
    /// 8/16-bit indices are widened, tightly packed 32-bit indices are copied
    /// in one go.
    pub fn copy_indices(&self, out: &mut [u32]) -> Result<(), BakeError> {
        debug_assert_eq!(out.len(), self.count);
        let Some(data) = self.data else {
            out.fill(0);
            return Ok(());
        };

        match self.component_type {
            COMPONENT_UNSIGNED_INT if self.stride == 4 => {
                LittleEndian::read_u32_into(&data[..out.len() * 4], out);
            }
            COMPONENT_UNSIGNED_INT => {
                for (i, o) in out.iter_mut().enumerate() {
                    *o = LittleEndian::read_u32(&data[i * self.stride..]);
                }
            }
            COMPONENT_UNSIGNED_SHORT => {
                for (i, o) in out.iter_mut().enumerate() {
                    *o = LittleEndian::read_u16(&data[i * self.stride..]) as u32;
                }
            }
            COMPONENT_UNSIGNED_BYTE => {
                for (i, o) in out.iter_mut().enumerate() {
                    *o = data[i * self.stride] as u32;
                }
            }
            other => {
                return Err(BakeError::UnsupportedComponentType {
                    accessor: self.index,
                    component_type: other,
                })
            }
        }
        Ok(())
    }
}

fn decode_component(bytes: &[u8], component_type: u32, normalized: bool) -> f32 {
    match (component_type, normalized) {
        (COMPONENT_FLOAT, _) => LittleEndian::read_f32(bytes),
        (COMPONENT_BYTE, true) => (bytes[0] as i8 as f32 / 127.0).max(-1.0),
        (COMPONENT_BYTE, false) => bytes[0] as i8 as f32,
        (COMPONENT_UNSIGNED_BYTE, true) => bytes[0] as f32 / 255.0,
        (COMPONENT_UNSIGNED_BYTE, false) => bytes[0] as f32,
        (COMPONENT_SHORT, true) => (LittleEndian::read_i16(bytes) as f32 / 32767.0).max(-1.0),
        (COMPONENT_SHORT, false) => LittleEndian::read_i16(bytes) as f32,
        (COMPONENT_UNSIGNED_SHORT, true) => LittleEndian::read_u16(bytes) as f32 / 65535.0,
        (COMPONENT_UNSIGNED_SHORT, false) => LittleEndian::read_u16(bytes) as f32,
        (COMPONENT_UNSIGNED_INT, _) => LittleEndian::read_u32(bytes) as f32,
        _ => 0.0,
    }
}
