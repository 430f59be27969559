mod bake;

use std::collections::BTreeMap;

use crate::scene::{
    Accessor, Buffer, BufferView, Document, Mesh, Node, Primitive, ATTR_NORMAL, ATTR_POSITION,
    ATTR_TANGENT, ATTR_TEXCOORD_0, COMPONENT_FLOAT, COMPONENT_UNSIGNED_SHORT,
};

/// Builds an in-memory document backed by a single buffer.
#[derive(Default)]
pub struct SceneBuilder {
    pub document: Document,
    pub bin: Vec<u8>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.document.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: self.bin.len(),
            byte_length: bytes.len(),
            ..Default::default()
        });
        self.bin.extend_from_slice(bytes);
        self.document.buffer_views.len() - 1
    }

    pub fn accessor(
        &mut self,
        bytes: &[u8],
        component_type: u32,
        count: usize,
        kind: &str,
    ) -> usize {
        let view = self.push_view(bytes);
        self.document.accessors.push(Accessor {
            buffer_view: Some(view),
            component_type,
            count,
            kind: kind.to_string(),
            ..Default::default()
        });
        self.document.accessors.len() - 1
    }

    /// FLOAT accessor with `N` components per element.
    pub fn floats<const N: usize>(&mut self, data: &[[f32; N]], with_bounds: bool) -> usize {
        let kind = match N {
            1 => "SCALAR",
            2 => "VEC2",
            3 => "VEC3",
            _ => "VEC4",
        };
        let flat: Vec<f32> = data.iter().flatten().copied().collect();
        let index = self.accessor(bytemuck::cast_slice(&flat), COMPONENT_FLOAT, data.len(), kind);
        if with_bounds {
            let mut min = vec![f64::MAX; N];
            let mut max = vec![f64::MIN; N];
            for v in data {
                for c in 0..N {
                    min[c] = min[c].min(v[c] as f64);
                    max[c] = max[c].max(v[c] as f64);
                }
            }
            let accessor = &mut self.document.accessors[index];
            accessor.min = Some(min);
            accessor.max = Some(max);
        }
        index
    }

    pub fn short_indices(&mut self, data: &[u16]) -> usize {
        self.accessor(
            bytemuck::cast_slice(data),
            COMPONENT_UNSIGNED_SHORT,
            data.len(),
            "SCALAR",
        )
    }

    /// Adds a mesh and a node placing it at `translation`.
    pub fn mesh(&mut self, primitives: Vec<Primitive>, translation: [f32; 3]) -> usize {
        self.document.meshes.push(Mesh {
            primitives,
            ..Default::default()
        });
        let mesh = self.document.meshes.len() - 1;
        self.document.nodes.push(Node {
            mesh: Some(mesh),
            translation: Some(translation),
            ..Default::default()
        });
        mesh
    }

    pub fn finish(mut self) -> (Document, Vec<Vec<u8>>) {
        self.document.buffers = vec![Buffer {
            byte_length: self.bin.len(),
            ..Default::default()
        }];
        (self.document, vec![self.bin])
    }
}

/// Source attribute values of one primitive, for comparing against baked output.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

impl PrimitiveData {
    pub fn triangle() -> Self {
        Self {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            tangents: vec![[1.0, 0.0, 0.0, 1.0]; 3],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
        }
    }

    /// Writes every non-empty stream and returns the primitive referencing them.
    pub fn add_to(&self, builder: &mut SceneBuilder) -> Primitive {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            ATTR_POSITION.to_string(),
            builder.floats(&self.positions, true),
        );
        if !self.normals.is_empty() {
            attributes.insert(ATTR_NORMAL.to_string(), builder.floats(&self.normals, false));
        }
        if !self.tangents.is_empty() {
            attributes.insert(ATTR_TANGENT.to_string(), builder.floats(&self.tangents, false));
        }
        if !self.texcoords.is_empty() {
            attributes.insert(
                ATTR_TEXCOORD_0.to_string(),
                builder.floats(&self.texcoords, true),
            );
        }
        let indices = if self.indices.is_empty() {
            None
        } else {
            Some(builder.short_indices(&self.indices))
        };
        Primitive {
            attributes,
            indices,
            ..Default::default()
        }
    }
}

/// One mesh holding a single fully attributed triangle.
pub fn single_triangle_scene() -> (Document, Vec<Vec<u8>>) {
    let mut builder = SceneBuilder::new();
    let primitive = PrimitiveData::triangle().add_to(&mut builder);
    builder.mesh(vec![primitive], [0.0, 0.0, 0.0]);
    builder.finish()
}
