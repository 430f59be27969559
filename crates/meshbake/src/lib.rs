pub mod bake;
pub mod dynamics;
pub mod helpers;
pub mod render;
pub mod scene;
pub mod world;

#[cfg(test)]
mod tests;

pub use bake::{bake, bake_document, BakeOutput, BakedAsset, RenderElement, Vertex};
pub use dynamics::Camera;
pub use helpers::BakeError;
pub use render::{BakedScene, CullingRenderer, DrawSink, FrameStats, GpuScene, InstanceBuffer};
pub use scene::{load_scene, LoadedScene};
pub use world::{load_config, CameraConfig, Config, WorldRenderer};
