use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info};
use wgpu::util::DeviceExt;

use crate::{
    bake::{
        transcode, AccessorBound, AttributeSet, MeshRange, RenderElement, TranscodedScene, Vertex,
        INDEX_VIEW, POSITION_OFFSET, VERTEX_SIZE, VERTEX_VIEW,
    },
    helpers::{BakeError, InstanceMatrix},
    render::BoundingBox,
    scene::{
        collect_instances, load_scene, Accessor, Document, SceneInstance, ATTR_NORMAL,
        ATTR_POSITION, ATTR_TANGENT, ATTR_TEXCOORD_0, COMPONENT_FLOAT, COMPONENT_UNSIGNED_INT,
    },
};

/// CPU-side scene the renderer draws from.
///
/// All sequences are cross-referenced by position: `instance_meshes[i]`
/// indexes `meshes` and `mesh_bounds`, `meshes[m]` covers a run of
/// `render_elements`.
#[derive(Debug, Clone, Default)]
pub struct BakedScene {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub render_elements: Vec<RenderElement>,
    pub meshes: Vec<MeshRange>,
    pub instance_meshes: Vec<usize>,
    pub instance_matrices: Vec<InstanceMatrix>,
    pub mesh_bounds: Vec<BoundingBox>,
}

impl BakedScene {
    pub fn from_parts(
        transcoded: TranscodedScene,
        instances: &[SceneInstance],
    ) -> Result<Self, BakeError> {
        transcoded.check_ranges()?;

        let mesh_bounds = transcoded
            .meshes
            .iter()
            .map(|mesh| {
                mesh.relems()
                    .map(|r| transcoded.render_elements[r].position_bound.to_box())
                    .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
            })
            .collect();

        let mut instance_meshes = Vec::with_capacity(instances.len());
        let mut instance_matrices = Vec::with_capacity(instances.len());
        for instance in instances {
            if instance.mesh >= transcoded.meshes.len() {
                return Err(BakeError::InvalidInput(format!(
                    "instance references mesh {}, scene has {}",
                    instance.mesh,
                    transcoded.meshes.len()
                )));
            }
            instance_meshes.push(instance.mesh);
            instance_matrices.push(InstanceMatrix::from(instance.transform));
        }

        Ok(Self {
            vertices: transcoded.vertices,
            indices: transcoded.indices,
            render_elements: transcoded.render_elements,
            meshes: transcoded.meshes,
            instance_meshes,
            instance_matrices,
            mesh_bounds,
        })
    }

    /// Transcodes an unbaked document in memory.
    pub fn from_document(
        document: &Document,
        buffers: &[Vec<u8>],
        parallel: bool,
    ) -> Result<Self, BakeError> {
        let transcoded = transcode(document, buffers, parallel)?;
        Self::from_parts(transcoded, &collect_instances(document))
    }

    /// Loads a baked asset written by [`crate::bake::bake`].
    pub fn load(path: &Path) -> Result<Self, BakeError> {
        let loaded = load_scene(path)?;
        let blob = match loaded.buffers.as_slice() {
            [blob] => blob,
            other => {
                return Err(BakeError::InvalidBakedLayout(format!(
                    "expected one buffer, found {}",
                    other.len()
                )))
            }
        };
        let scene = read_baked(&loaded.document, blob)?;
        info!(
            "Loaded {} ({} meshes, {} render elements, {} instances)",
            path.display(),
            scene.meshes.len(),
            scene.render_elements.len(),
            scene.instance_meshes.len()
        );
        Ok(scene)
    }

    /// Loads `path` as a baked asset, transcoding it in memory when it is
    /// not one.
    pub fn open(path: &Path, parallel: bool) -> Result<Self, BakeError> {
        let loaded = load_scene(path)?;
        let baked = match loaded.buffers.as_slice() {
            [blob] => read_baked(&loaded.document, blob),
            other => Err(layout_error(format!("{} buffers", other.len()))),
        };
        match baked {
            Err(BakeError::InvalidBakedLayout(reason)) => {
                info!(
                    "{} is not baked ({}), transcoding in memory",
                    path.display(),
                    reason
                );
                Self::from_document(&loaded.document, &loaded.buffers, parallel)
            }
            other => other,
        }
    }

    pub fn relem_count(&self) -> usize {
        self.render_elements.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instance_meshes.len()
    }
}

fn layout_error(msg: impl Into<String>) -> BakeError {
    BakeError::InvalidBakedLayout(msg.into())
}

/// Rebuilds a scene from a baked document and its single blob.
pub fn read_baked(document: &Document, blob: &[u8]) -> Result<BakedScene, BakeError> {
    let [index_view, vertex_view] = document.buffer_views.as_slice() else {
        return Err(layout_error(format!(
            "expected 2 buffer views, found {}",
            document.buffer_views.len()
        )));
    };
    if index_view.byte_offset != 0 || index_view.byte_length % 4 != 0 {
        return Err(layout_error("index view must start the buffer and hold u32s"));
    }
    if vertex_view.byte_stride != Some(VERTEX_SIZE)
        || vertex_view.byte_offset != index_view.byte_length
        || vertex_view.byte_length % VERTEX_SIZE != 0
    {
        return Err(layout_error(format!(
            "vertex view must follow the indices with stride {VERTEX_SIZE}"
        )));
    }
    let end = vertex_view
        .byte_offset
        .checked_add(vertex_view.byte_length)
        .filter(|&end| end <= blob.len())
        .ok_or_else(|| {
            layout_error(format!(
                "vertex view ({} + {} bytes) exceeds the buffer of {} bytes",
                vertex_view.byte_offset,
                vertex_view.byte_length,
                blob.len()
            ))
        })?;

    let mut indices = vec![0u32; index_view.byte_length / 4];
    LittleEndian::read_u32_into(&blob[..index_view.byte_length], &mut indices);
    let vertices: Vec<Vertex> = blob[vertex_view.byte_offset..end]
        .chunks_exact(VERTEX_SIZE)
        .map(bytemuck::pod_read_unaligned)
        .collect();

    let mut render_elements = Vec::new();
    let mut meshes = Vec::with_capacity(document.meshes.len());
    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        let first_relem = render_elements.len() as u32;
        for (prim_index, primitive) in mesh.primitives.iter().enumerate() {
            let at = |what: &str| format!("mesh {mesh_index} primitive {prim_index}: {what}");
            if !primitive.is_triangle_list() {
                return Err(layout_error(at("not a triangle list")));
            }

            let index_accessor = primitive
                .indices
                .and_then(|i| document.accessors.get(i))
                .ok_or_else(|| layout_error(at("missing index accessor")))?;
            if index_accessor.buffer_view != Some(INDEX_VIEW)
                || index_accessor.component_type != COMPONENT_UNSIGNED_INT
                || index_accessor.byte_offset % 4 != 0
            {
                return Err(layout_error(at("index accessor is not baked")));
            }

            let position = primitive
                .attribute(ATTR_POSITION)
                .and_then(|i| document.accessors.get(i))
                .ok_or_else(|| layout_error(at("missing POSITION")))?;
            if position.buffer_view != Some(VERTEX_VIEW)
                || position.component_type != COMPONENT_FLOAT
                || position.byte_offset % VERTEX_SIZE != POSITION_OFFSET
            {
                return Err(layout_error(at("POSITION accessor is not baked")));
            }

            let vertex_offset =
                layout_u32(position.byte_offset / VERTEX_SIZE, || at("vertex offset"))?;
            let vertex_count = layout_u32(position.count, || at("vertex count"))?;
            let index_offset =
                layout_u32(index_accessor.byte_offset / 4, || at("index offset"))?;
            let index_count = layout_u32(index_accessor.count, || at("index count"))?;

            let position_bound = AccessorBound::from_accessor(&position.min, &position.max)
                .unwrap_or_else(|| {
                    let start = (vertex_offset as usize).min(vertices.len());
                    let end = (start + vertex_count as usize).min(vertices.len());
                    bound_of(&vertices[start..end])
                });
            let texcoord: Option<&Accessor> = primitive
                .attribute(ATTR_TEXCOORD_0)
                .and_then(|i| document.accessors.get(i));

            render_elements.push(RenderElement {
                vertex_offset,
                vertex_count,
                index_offset,
                index_count,
                position_bound,
                texcoord_bound: texcoord.and_then(|a| AccessorBound::from_accessor(&a.min, &a.max)),
                attributes: AttributeSet {
                    normal: primitive.attribute(ATTR_NORMAL).is_some(),
                    tangent: primitive.attribute(ATTR_TANGENT).is_some(),
                    texcoord: texcoord.is_some(),
                },
            });
        }
        meshes.push(MeshRange {
            first_relem,
            relem_count: render_elements.len() as u32 - first_relem,
        });
    }

    let transcoded = TranscodedScene {
        vertices,
        indices,
        render_elements,
        meshes,
    };
    transcoded
        .check_ranges()
        .map_err(|e| layout_error(e.to_string()))?;

    debug!(
        "Recovered {} render elements from baked layout",
        transcoded.render_elements.len()
    );
    BakedScene::from_parts(transcoded, &collect_instances(document))
}

fn layout_u32(value: usize, what: impl FnOnce() -> String) -> Result<u32, BakeError> {
    u32::try_from(value)
        .map_err(|_| layout_error(format!("{} {value} does not fit in 32 bits", what())))
}

fn bound_of(vertices: &[Vertex]) -> AccessorBound {
    if vertices.is_empty() {
        return AccessorBound {
            min: vec![0.0; 3],
            max: vec![0.0; 3],
        };
    }
    let mut min = [f64::MAX; 3];
    let mut max = [f64::MIN; 3];
    for v in vertices {
        for (c, p) in v.position().iter().enumerate() {
            min[c] = min[c].min(*p as f64);
            max[c] = max[c].max(*p as f64);
        }
    }
    AccessorBound {
        min: min.to_vec(),
        max: max.to_vec(),
    }
}

/// GPU-resident vertex and index buffers of a [`BakedScene`].
#[derive(Debug)]
pub struct GpuScene {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl GpuScene {
    pub fn upload(device: &wgpu::Device, scene: &BakedScene) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Baked Vertex Buffer"),
            contents: bytemuck::cast_slice(&scene.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Baked Index Buffer"),
            contents: bytemuck::cast_slice(&scene.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: scene.indices.len() as u32,
        }
    }

    /// Binds the vertex buffer to slot 0 and the 32-bit index buffer.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }
}
