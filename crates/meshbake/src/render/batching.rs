use std::ops::Range;

use bytemuck::Zeroable;
use cgmath::Matrix4;
use log::warn;
use tracing::instrument;

use crate::{
    helpers::{BakeError, InstanceMatrix},
    render::{is_visible, BakedScene, InstanceBuffer},
};

/// Receiver of indexed draw calls.
pub trait DrawSink {
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

impl DrawSink for wgpu::RenderPass<'_> {
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        wgpu::RenderPass::draw_indexed(self, indices, base_vertex, instances);
    }
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Instances run through the frustum test.
    pub tested: usize,
    /// Instances that passed it.
    pub visible: usize,
    /// Visible instances left out because the instance buffer was full.
    pub dropped: usize,
    /// Instance buffer slots written, one per (instance, render element).
    pub drawn_instances: usize,
    pub draw_calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Counted,
}

/// Frustum-culls instances and draws them batched per render element.
///
/// A frame is [`cull`](Self::cull), then [`upload`](Self::upload) of the
/// staged matrices, then [`draw`](Self::draw). The per-relem counters are
/// zeroed again by `draw`.
#[derive(Debug)]
pub struct CullingRenderer {
    max_drawn_instances: usize,
    counts: Vec<u32>,
    cursors: Vec<u32>,
    accepted: Vec<usize>,
    staging: Vec<InstanceMatrix>,
    stats: FrameStats,
    phase: Phase,
}

impl CullingRenderer {
    pub fn new(max_drawn_instances: usize) -> Self {
        Self {
            max_drawn_instances,
            counts: vec![0; max_drawn_instances],
            cursors: vec![0; max_drawn_instances],
            accepted: Vec::with_capacity(max_drawn_instances),
            staging: Vec::with_capacity(max_drawn_instances),
            stats: FrameStats::default(),
            phase: Phase::Idle,
        }
    }

    pub fn max_drawn_instances(&self) -> usize {
        self.max_drawn_instances
    }

    /// Sizes the scratch tables for `scene`. Call once per scene load,
    /// never between `cull` and `draw`.
    pub fn prepare(&mut self, scene: &BakedScene) {
        let needed = scene.relem_count().max(self.max_drawn_instances);
        if self.counts.len() < needed {
            self.counts.resize(needed, 0);
            self.cursors.resize(needed, 0);
        }
        self.counts.fill(0);
        self.phase = Phase::Idle;
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Matrices staged by the last `cull`, grouped by render element.
    pub fn staged(&self) -> &[InstanceMatrix] {
        &self.staging
    }

    /// Instance count per render element for the pending draw.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Tests every instance of `scene` and stages the visible ones.
    ///
    /// An instance takes one staging slot per render element of its mesh and
    /// is accepted only when all of them fit within `max_drawn_instances`.
    #[instrument(skip_all, fields(instances = scene.instance_count()))]
    pub fn cull(&mut self, scene: &BakedScene, proj_view: &Matrix4<f32>) -> FrameStats {
        if self.counts.len() < scene.relem_count() {
            warn!(
                "Scratch table holds {} render elements, scene has {}; skipping frame until prepare",
                self.counts.len(),
                scene.relem_count()
            );
            self.counts.fill(0);
            self.accepted.clear();
            self.staging.clear();
            self.stats = FrameStats::default();
            self.phase = Phase::Idle;
            return self.stats;
        }
        if self.phase == Phase::Counted {
            // previous frame was culled but never drawn
            self.counts.fill(0);
        }

        let mut stats = FrameStats::default();
        let mut unresolved = 0usize;
        self.accepted.clear();

        for (instance, (&mesh, matrix)) in scene
            .instance_meshes
            .iter()
            .zip(scene.instance_matrices.iter())
            .enumerate()
        {
            stats.tested += 1;
            let resolved = scene
                .meshes
                .get(mesh)
                .zip(scene.mesh_bounds.get(mesh))
                .filter(|(range, _)| range.relems().end <= scene.relem_count());
            let Some((range, bound)) = resolved else {
                unresolved += 1;
                continue;
            };
            if range.relem_count == 0 {
                continue;
            }

            let transform = proj_view * Matrix4::from(*matrix);
            if !is_visible(bound, &transform) {
                continue;
            }
            stats.visible += 1;

            let slots = range.relem_count as usize;
            if stats.drawn_instances + slots > self.max_drawn_instances {
                stats.dropped += 1;
                continue;
            }
            stats.drawn_instances += slots;

            for relem in range.relems() {
                self.counts[relem] += 1;
            }
            self.accepted.push(instance);
        }

        // scatter accepted matrices into per-relem runs
        let mut offset = 0u32;
        for (count, cursor) in self
            .counts
            .iter()
            .zip(self.cursors.iter_mut())
            .take(scene.relem_count())
        {
            *cursor = offset;
            offset += count;
        }
        self.staging.clear();
        self.staging
            .resize(stats.drawn_instances, InstanceMatrix::zeroed());
        for &instance in &self.accepted {
            let matrix = scene.instance_matrices[instance];
            for relem in scene.meshes[scene.instance_meshes[instance]].relems() {
                let slot = &mut self.cursors[relem];
                self.staging[*slot as usize] = matrix;
                *slot += 1;
            }
        }

        if unresolved > 0 {
            warn!(
                "Skipped {} instances whose mesh has no bounds or render elements",
                unresolved
            );
        }
        if stats.dropped > 0 {
            warn!(
                "Instance capacity {} reached, dropped {} of {} visible instances",
                self.max_drawn_instances, stats.dropped, stats.visible
            );
        }

        self.phase = Phase::Counted;
        self.stats = stats;
        stats
    }

    /// Writes the staged matrices to `buffer`.
    pub fn upload(&self, queue: &wgpu::Queue, buffer: &InstanceBuffer) -> Result<(), BakeError> {
        buffer.upload(queue, &self.staging)
    }

    /// Issues one draw per render element with a non-zero count and resets
    /// the counts. Returns the number of draw calls.
    #[instrument(skip_all)]
    pub fn draw<S: DrawSink + ?Sized>(&mut self, scene: &BakedScene, sink: &mut S) -> usize {
        let mut first_instance = 0u32;
        let mut draw_calls = 0;

        for (relem, count) in scene
            .render_elements
            .iter()
            .zip(self.counts.iter_mut())
        {
            if *count == 0 {
                continue;
            }
            sink.draw_indexed(
                relem.index_offset..relem.index_offset + relem.index_count,
                relem.vertex_offset as i32,
                first_instance..first_instance + *count,
            );
            first_instance += *count;
            *count = 0;
            draw_calls += 1;
        }

        self.stats.draw_calls = draw_calls;
        self.phase = Phase::Idle;
        draw_calls
    }
}
