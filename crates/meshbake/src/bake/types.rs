use cgmath::Vector3;

use crate::{bake::Vertex, helpers::BakeError, render::BoundingBox};

/// Accessor `min`/`max` pair, carried through baking without recomputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessorBound {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl AccessorBound {
    pub fn from_accessor(min: &Option<Vec<f64>>, max: &Option<Vec<f64>>) -> Option<Self> {
        match (min, max) {
            (Some(min), Some(max)) => Some(AccessorBound {
                min: min.clone(),
                max: max.clone(),
            }),
            _ => None,
        }
    }

    pub fn to_box(&self) -> BoundingBox {
        let lane = |v: &Vec<f64>, i: usize| v.get(i).copied().unwrap_or(0.0) as f32;
        BoundingBox::new(
            Vector3::new(lane(&self.min, 0), lane(&self.min, 1), lane(&self.min, 2)),
            Vector3::new(lane(&self.max, 0), lane(&self.max, 1), lane(&self.max, 2)),
        )
    }
}

/// Optional attributes a render element's source primitive carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeSet {
    pub normal: bool,
    pub tangent: bool,
    pub texcoord: bool,
}

/// One drawable range of the baked vertex/index buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderElement {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
    pub position_bound: AccessorBound,
    pub texcoord_bound: Option<AccessorBound>,
    pub attributes: AttributeSet,
}

/// A contiguous run of render elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshRange {
    pub first_relem: u32,
    pub relem_count: u32,
}

impl MeshRange {
    pub fn relems(&self) -> std::ops::Range<usize> {
        let first = self.first_relem as usize;
        first..first + self.relem_count as usize
    }
}

/// Transcoder output: flat buffers plus the ranges that index into them.
#[derive(Debug, Clone, Default)]
pub struct TranscodedScene {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub render_elements: Vec<RenderElement>,
    pub meshes: Vec<MeshRange>,
}

impl TranscodedScene {
    /// Checks that every render element and mesh range stays inside the
    /// buffers it points into.
    pub fn check_ranges(&self) -> Result<(), BakeError> {
        let vertices = self.vertices.len() as u64;
        let indices = self.indices.len() as u64;
        for (i, relem) in self.render_elements.iter().enumerate() {
            if relem.vertex_offset as u64 + relem.vertex_count as u64 > vertices {
                return Err(BakeError::Internal(format!(
                    "render element {i} vertex range exceeds {vertices} vertices"
                )));
            }
            if relem.index_offset as u64 + relem.index_count as u64 > indices {
                return Err(BakeError::Internal(format!(
                    "render element {i} index range exceeds {indices} indices"
                )));
            }
        }
        let relems = self.render_elements.len() as u64;
        for (i, mesh) in self.meshes.iter().enumerate() {
            if mesh.first_relem as u64 + mesh.relem_count as u64 > relems {
                return Err(BakeError::Internal(format!(
                    "mesh {i} render element range exceeds {relems} elements"
                )));
            }
        }
        Ok(())
    }
}
