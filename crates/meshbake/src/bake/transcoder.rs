//! Flattens every triangle primitive of a scene into one vertex array and
//! one 32-bit index array.
//!
//! Work happens in two passes. The planning pass walks meshes and primitives,
//! resolves accessors, and assigns each surviving primitive its output ranges.
//! The copy pass then fills those disjoint ranges, optionally in parallel.

use log::{debug, warn};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::instrument;

use crate::{
    bake::{AccessorBound, AttributeSet, MeshRange, RenderElement, TranscodedScene, Vertex},
    helpers::BakeError,
    scene::{
        AccessorView, Document, Primitive, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT,
        ATTR_TEXCOORD_0, COMPONENT_UNSIGNED_BYTE, COMPONENT_UNSIGNED_INT,
        COMPONENT_UNSIGNED_SHORT,
    },
};

/// Source streams of one primitive. Absent optional attributes read as zero.
#[derive(Debug, Clone, Copy)]
struct AttributeStreams<'a> {
    position: AccessorView<'a>,
    normal: Option<AccessorView<'a>>,
    tangent: Option<AccessorView<'a>>,
    texcoord: Option<AccessorView<'a>>,
}

impl AttributeStreams<'_> {
    #[inline]
    fn vertex(&self, i: usize) -> Vertex {
        Vertex::new(
            self.position.read_f32::<3>(i),
            self.normal.map(|a| a.read_f32::<3>(i)).unwrap_or([0.0; 3]),
            self.texcoord.map(|a| a.read_f32::<2>(i)).unwrap_or([0.0; 2]),
            self.tangent.map(|a| a.read_f32::<4>(i)).unwrap_or([0.0; 4]),
        )
    }
}

#[derive(Debug)]
struct PrimitivePlan<'a> {
    streams: AttributeStreams<'a>,
    indices: Option<AccessorView<'a>>,
    vertex_count: usize,
    index_count: usize,
}

impl PrimitivePlan<'_> {
    fn fill(&self, vertices: &mut [Vertex], indices: &mut [u32]) -> Result<(), BakeError> {
        for (i, v) in vertices.iter_mut().enumerate() {
            *v = self.streams.vertex(i);
        }

        // Index values stay relative to the primitive; the draw call's base
        // vertex supplies the offset.
        match &self.indices {
            Some(view) => view.copy_indices(indices)?,
            None => {
                for (i, o) in indices.iter_mut().enumerate() {
                    *o = i as u32;
                }
            }
        }
        Ok(())
    }
}

fn optional_view<'a>(
    document: &'a Document,
    buffers: &'a [Vec<u8>],
    primitive: &Primitive,
    key: &str,
) -> Result<Option<AccessorView<'a>>, BakeError> {
    primitive
        .attribute(key)
        .map(|index| AccessorView::new(document, buffers, index))
        .transpose()
}

fn computed_bound(view: &AccessorView) -> AccessorBound {
    let mut min = [f64::MAX; 3];
    let mut max = [f64::MIN; 3];
    for i in 0..view.count {
        let p = view.read_f32::<3>(i);
        for c in 0..3 {
            min[c] = min[c].min(p[c] as f64);
            max[c] = max[c].max(p[c] as f64);
        }
    }
    if view.count == 0 {
        min = [0.0; 3];
        max = [0.0; 3];
    }
    AccessorBound {
        min: min.to_vec(),
        max: max.to_vec(),
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32, BakeError> {
    u32::try_from(value)
        .map_err(|_| BakeError::InvalidInput(format!("{what} {value} does not fit in 32 bits")))
}

/// Transcodes every triangle-list primitive of `document`.
///
/// Non-triangle primitives are skipped and do not get a render element.
/// A primitive without POSITION or with an index type other than unsigned
/// 8/16/32-bit rejects the whole scene.
#[instrument(skip_all, fields(meshes = document.meshes.len()))]
pub fn transcode(
    document: &Document,
    buffers: &[Vec<u8>],
    parallel: bool,
) -> Result<TranscodedScene, BakeError> {
    let mut plans = Vec::new();
    let mut render_elements = Vec::new();
    let mut meshes = Vec::with_capacity(document.meshes.len());
    let mut vertex_total = 0usize;
    let mut index_total = 0usize;

    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        let first_relem = to_u32(render_elements.len(), "render element index")?;
        let mut relem_count = 0u32;

        for (prim_index, primitive) in mesh.primitives.iter().enumerate() {
            if !primitive.is_triangle_list() {
                warn!(
                    "Skipping mesh {} primitive {}: mode {} is not a triangle list",
                    mesh_index, prim_index, primitive.mode
                );
                continue;
            }

            let position_index =
                primitive
                    .attribute(ATTR_POSITION)
                    .ok_or(BakeError::MissingPosition {
                        mesh: mesh_index,
                        primitive: prim_index,
                    })?;
            let position = AccessorView::new(document, buffers, position_index)?;

            let streams = AttributeStreams {
                position,
                normal: optional_view(document, buffers, primitive, ATTR_NORMAL)?,
                tangent: optional_view(document, buffers, primitive, ATTR_TANGENT)?,
                texcoord: optional_view(document, buffers, primitive, ATTR_TEXCOORD_0)?,
            };

            let indices = match primitive.indices {
                Some(index) => {
                    let component_type = document
                        .accessors
                        .get(index)
                        .map(|a| a.component_type)
                        .ok_or_else(|| {
                            BakeError::InvalidInput(format!("accessor {index} does not exist"))
                        })?;
                    if !matches!(
                        component_type,
                        COMPONENT_UNSIGNED_BYTE | COMPONENT_UNSIGNED_SHORT | COMPONENT_UNSIGNED_INT
                    ) {
                        return Err(BakeError::UnsupportedIndexType {
                            mesh: mesh_index,
                            primitive: prim_index,
                            component_type,
                        });
                    }
                    Some(AccessorView::new(document, buffers, index)?)
                }
                None => None,
            };

            let vertex_count = position.count;
            let index_count = indices.map(|v| v.count).unwrap_or(vertex_count);
            let relem_vertex_count = to_u32(vertex_count, "vertex count")?;
            let relem_index_count = to_u32(index_count, "index count")?;

            let source = &document.accessors[position_index];
            let position_bound = AccessorBound::from_accessor(&source.min, &source.max)
                .unwrap_or_else(|| {
                    debug!(
                        "mesh {} primitive {}: POSITION has no min/max, computing it",
                        mesh_index, prim_index
                    );
                    computed_bound(&position)
                });
            let texcoord_bound = streams.texcoord.and_then(|view| {
                let source = &document.accessors[view.index];
                AccessorBound::from_accessor(&source.min, &source.max)
            });

            render_elements.push(RenderElement {
                vertex_offset: to_u32(vertex_total, "vertex offset")?,
                vertex_count: relem_vertex_count,
                index_offset: to_u32(index_total, "index offset")?,
                index_count: relem_index_count,
                position_bound,
                texcoord_bound,
                attributes: AttributeSet {
                    normal: streams.normal.is_some(),
                    tangent: streams.tangent.is_some(),
                    texcoord: streams.texcoord.is_some(),
                },
            });
            relem_count += 1;

            vertex_total = vertex_total
                .checked_add(vertex_count)
                .ok_or_else(|| BakeError::InvalidInput("vertex total overflows".to_string()))?;
            index_total = index_total
                .checked_add(index_count)
                .ok_or_else(|| BakeError::InvalidInput("index total overflows".to_string()))?;
            plans.push(PrimitivePlan {
                streams,
                indices,
                vertex_count,
                index_count,
            });
        }

        meshes.push(MeshRange {
            first_relem,
            relem_count,
        });
    }

    // Output is sized exactly once; the copy loop never reallocates.
    to_u32(vertex_total, "vertex total")?;
    to_u32(index_total, "index total")?;
    let mut vertices = vec![Vertex::default(); vertex_total];
    let mut indices = vec![0u32; index_total];

    let mut jobs = Vec::with_capacity(plans.len());
    {
        let mut vertex_rest: &mut [Vertex] = &mut vertices;
        let mut index_rest: &mut [u32] = &mut indices;
        for plan in &plans {
            let (v, vr) = std::mem::take(&mut vertex_rest).split_at_mut(plan.vertex_count);
            let (i, ir) = std::mem::take(&mut index_rest).split_at_mut(plan.index_count);
            vertex_rest = vr;
            index_rest = ir;
            jobs.push((plan, v, i));
        }
    }

    if parallel {
        jobs.into_par_iter()
            .try_for_each(|(plan, v, i)| plan.fill(v, i))?;
    } else {
        for (plan, v, i) in jobs {
            plan.fill(v, i)?;
        }
    }

    debug!(
        "Transcoded {} render elements ({} vertices, {} indices)",
        render_elements.len(),
        vertices.len(),
        indices.len()
    );

    let scene = TranscodedScene {
        vertices,
        indices,
        render_elements,
        meshes,
    };
    scene.check_ranges()?;
    Ok(scene)
}
