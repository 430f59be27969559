use std::path::Path;

use cgmath::{Point3, Vector3};
use log::info;

use crate::{
    dynamics::Camera,
    helpers::{frame_mark, init_profiling, BakeError},
    render::{BakedScene, CullingRenderer, FrameStats, GpuScene, InstanceBuffer},
    world::Config,
};

struct LoadedScene {
    cpu: BakedScene,
    gpu: GpuScene,
}

/// Owns the scene, the camera and the per-frame culling state.
///
/// The caller owns the window, surface and pipeline: it binds
/// [`instance_buffer`](Self::instance_buffer) in its pipeline layout, calls
/// [`update`](Self::update) before encoding and [`render`](Self::render)
/// inside its render pass.
pub struct WorldRenderer {
    config: Config,
    camera: Camera,
    renderer: CullingRenderer,
    instance_buffer: InstanceBuffer,
    scene: Option<LoadedScene>,
    viewport: (u32, u32),
    frame_ready: bool,
}

impl WorldRenderer {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, config: &Config) -> Self {
        init_profiling();

        let mut camera = Camera::new(
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            &config.camera,
        );
        camera.set_viewport(width, height);

        Self {
            config: config.clone(),
            camera,
            renderer: CullingRenderer::new(config.max_drawn_instances),
            instance_buffer: InstanceBuffer::new(device, config.max_drawn_instances),
            scene: None,
            viewport: (width, height),
            frame_ready: false,
        }
    }

    pub fn load_scene(&mut self, device: &wgpu::Device, path: &Path) -> Result<(), BakeError> {
        let scene = BakedScene::open(path, self.config.parallel_transcode)?;
        self.set_scene(device, scene);
        Ok(())
    }

    pub fn set_scene(&mut self, device: &wgpu::Device, scene: BakedScene) {
        info!(
            "Uploading scene: {} vertices, {} indices, {} instances",
            scene.vertices.len(),
            scene.indices.len(),
            scene.instance_count()
        );
        self.renderer.prepare(&scene);
        let gpu = GpuScene::upload(device, &scene);
        self.scene = Some(LoadedScene { cpu: scene, gpu });
        self.frame_ready = false;
    }

    pub fn scene(&self) -> Option<&BakedScene> {
        self.scene.as_ref().map(|s| &s.cpu)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera_position(
        &mut self,
        eye: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
    ) {
        self.camera.set_position(eye, target, up);
    }

    pub fn instance_buffer(&self) -> &InstanceBuffer {
        &self.instance_buffer
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.viewport = (new_width, new_height);
        self.camera.set_viewport(new_width, new_height);
    }

    /// Culls the scene and uploads the visible instance matrices.
    ///
    /// Returns `None` when there is nothing to draw this frame (no scene, or
    /// a zero-sized viewport).
    pub fn update(&mut self, queue: &wgpu::Queue) -> Result<Option<FrameStats>, BakeError> {
        self.frame_ready = false;
        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            return Ok(None);
        }
        let Some(scene) = self.scene.as_ref() else {
            return Ok(None);
        };

        let stats = self.renderer.cull(&scene.cpu, &self.camera.proj_view());
        self.renderer.upload(queue, &self.instance_buffer)?;
        self.frame_ready = true;
        Ok(Some(stats))
    }

    /// Draws what the last [`update`](Self::update) staged. The pass must
    /// already have the pipeline and instance bind group set.
    pub fn render(&mut self, render_pass: &mut wgpu::RenderPass<'_>) -> FrameStats {
        if !self.frame_ready {
            return FrameStats::default();
        }
        let Some(scene) = self.scene.as_ref() else {
            return FrameStats::default();
        };

        scene.gpu.bind(render_pass);
        self.renderer.draw(&scene.cpu, render_pass);
        self.frame_ready = false;
        frame_mark();
        self.renderer.stats()
    }
}
