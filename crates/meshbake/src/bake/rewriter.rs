use log::warn;

use crate::{
    bake::{
        AccessorBound, RenderElement, TranscodedScene, NORMAL_OFFSET, POSITION_OFFSET,
        TANGENT_OFFSET, TEXCOORD_OFFSET, VERTEX_SIZE,
    },
    helpers::BakeError,
    scene::{
        Accessor, Buffer, BufferView, Document, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT,
        ATTR_TEXCOORD_0, COMPONENT_BYTE, COMPONENT_FLOAT, COMPONENT_UNSIGNED_INT,
        EXT_MESH_QUANTIZATION, TARGET_ARRAY_BUFFER, TARGET_ELEMENT_ARRAY_BUFFER,
    },
};

pub const INDEX_VIEW: usize = 0;
pub const VERTEX_VIEW: usize = 1;

/// Keys whose accessors index the dropped accessor list and cannot survive
/// the rewrite.
const STRIPPED_DOCUMENT_KEYS: [&str; 2] = ["skins", "animations"];
const STRIPPED_NODE_KEYS: [&str; 2] = ["skin", "weights"];
const STRIPPED_PRIMITIVE_KEYS: [&str; 1] = ["targets"];

/// Layout of one baked vertex attribute.
struct BakedAttribute {
    key: &'static str,
    offset: usize,
    component_type: u32,
    normalized: bool,
    kind: &'static str,
}

// sorted by key, the order accessors are emitted in
const BAKED_ATTRIBUTES: [BakedAttribute; 4] = [
    BakedAttribute {
        key: ATTR_NORMAL,
        offset: NORMAL_OFFSET,
        component_type: COMPONENT_BYTE,
        normalized: true,
        kind: "VEC3",
    },
    BakedAttribute {
        key: ATTR_POSITION,
        offset: POSITION_OFFSET,
        component_type: COMPONENT_FLOAT,
        normalized: false,
        kind: "VEC3",
    },
    BakedAttribute {
        key: ATTR_TANGENT,
        offset: TANGENT_OFFSET,
        component_type: COMPONENT_BYTE,
        normalized: true,
        kind: "VEC4",
    },
    BakedAttribute {
        key: ATTR_TEXCOORD_0,
        offset: TEXCOORD_OFFSET,
        component_type: COMPONENT_FLOAT,
        normalized: false,
        kind: "VEC2",
    },
];

impl BakedAttribute {
    fn present(&self, relem: &RenderElement) -> bool {
        match self.key {
            ATTR_POSITION => true,
            ATTR_NORMAL => relem.attributes.normal,
            ATTR_TANGENT => relem.attributes.tangent,
            _ => relem.attributes.texcoord,
        }
    }

    fn bound<'r>(&self, relem: &'r RenderElement) -> Option<&'r AccessorBound> {
        match self.key {
            ATTR_POSITION => Some(&relem.position_bound),
            ATTR_TEXCOORD_0 => relem.texcoord_bound.as_ref(),
            _ => None,
        }
    }

    fn accessor(&self, relem: &RenderElement) -> Accessor {
        let bound = self.bound(relem);
        Accessor {
            buffer_view: Some(VERTEX_VIEW),
            byte_offset: relem.vertex_offset as usize * VERTEX_SIZE + self.offset,
            component_type: self.component_type,
            normalized: self.normalized,
            count: relem.vertex_count as usize,
            kind: self.kind.to_string(),
            min: bound.map(|b| b.min.clone()),
            max: bound.map(|b| b.max.clone()),
            ..Default::default()
        }
    }
}

/// Concatenates the index region and the vertex region into one blob.
pub fn baked_blob(scene: &TranscodedScene) -> Vec<u8> {
    let index_bytes: &[u8] = bytemuck::cast_slice(&scene.indices);
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&scene.vertices);
    let mut blob = Vec::with_capacity(index_bytes.len() + vertex_bytes.len());
    blob.extend_from_slice(index_bytes);
    blob.extend_from_slice(vertex_bytes);
    blob
}

/// Rebuilds `document` around the baked buffer layout.
///
/// The result holds one buffer and two views (indices at offset 0, vertices
/// right after with a 32-byte stride). Every surviving primitive gets fresh
/// accessors into those views, non-triangle primitives are removed, and
/// attributes other than POSITION/NORMAL/TANGENT/TEXCOORD_0 are stripped.
pub fn rewrite_document(
    document: &Document,
    scene: &TranscodedScene,
    bin_uri: &str,
    buffer_name: Option<&str>,
) -> Result<Document, BakeError> {
    if document.meshes.len() != scene.meshes.len() {
        return Err(BakeError::Internal(format!(
            "{} meshes in document, {} transcoded",
            document.meshes.len(),
            scene.meshes.len()
        )));
    }

    let index_bytes = scene.indices.len() * std::mem::size_of::<u32>();
    let vertex_bytes = scene.vertices.len() * VERTEX_SIZE;

    let mut out = document.clone();

    out.buffers = vec![Buffer {
        byte_length: index_bytes + vertex_bytes,
        uri: Some(bin_uri.to_string()),
        name: buffer_name.map(str::to_string),
        ..Default::default()
    }];

    out.buffer_views = vec![
        BufferView {
            buffer: 0,
            byte_offset: 0,
            byte_length: index_bytes,
            target: Some(TARGET_ELEMENT_ARRAY_BUFFER),
            ..Default::default()
        },
        BufferView {
            buffer: 0,
            byte_offset: index_bytes,
            byte_length: vertex_bytes,
            byte_stride: Some(VERTEX_SIZE),
            target: Some(TARGET_ARRAY_BUFFER),
            ..Default::default()
        },
    ];

    out.accessors.clear();

    for key in STRIPPED_DOCUMENT_KEYS {
        if out.extra.remove(key).is_some() {
            warn!("Dropping '{}': baked scenes carry no animation data", key);
        }
    }
    for node in &mut out.nodes {
        for key in STRIPPED_NODE_KEYS {
            node.extra.remove(key);
        }
    }
    if let Some(images) = out.extra.get_mut("images").and_then(|v| v.as_array_mut()) {
        let mut dropped = 0;
        for image in images.iter_mut().filter_map(|i| i.as_object_mut()) {
            if image.remove("bufferView").is_some() {
                image.remove("mimeType");
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                "Dropping the embedded data of {} images: their buffer views are replaced",
                dropped
            );
        }
    }

    for (mesh, range) in out.meshes.iter_mut().zip(scene.meshes.iter()) {
        mesh.primitives.retain(|p| p.is_triangle_list());
        if mesh.primitives.len() != range.relem_count as usize {
            return Err(BakeError::Internal(format!(
                "mesh has {} triangle primitives, {} render elements",
                mesh.primitives.len(),
                range.relem_count
            )));
        }

        for (primitive, relem_index) in mesh.primitives.iter_mut().zip(range.relems()) {
            let relem = &scene.render_elements[relem_index];

            primitive
                .attributes
                .retain(|key, _| BAKED_ATTRIBUTES.iter().any(|a| a.key == key.as_str()));
            for key in STRIPPED_PRIMITIVE_KEYS {
                primitive.extra.remove(key);
            }

            primitive.indices = Some(out.accessors.len());
            out.accessors.push(Accessor {
                buffer_view: Some(INDEX_VIEW),
                byte_offset: relem.index_offset as usize * std::mem::size_of::<u32>(),
                component_type: COMPONENT_UNSIGNED_INT,
                count: relem.index_count as usize,
                kind: "SCALAR".to_string(),
                ..Default::default()
            });

            for attribute in BAKED_ATTRIBUTES.iter().filter(|a| a.present(relem)) {
                primitive
                    .attributes
                    .insert(attribute.key.to_string(), out.accessors.len());
                out.accessors.push(attribute.accessor(relem));
            }
        }
    }

    for list in [&mut out.extensions_used, &mut out.extensions_required] {
        if !list.iter().any(|e| e == EXT_MESH_QUANTIZATION) {
            list.push(EXT_MESH_QUANTIZATION.to_string());
        }
    }

    Ok(out)
}
