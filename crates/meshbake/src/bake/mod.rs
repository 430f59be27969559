pub mod rewriter;
pub use rewriter::*;

pub mod transcoder;
pub use transcoder::*;

pub mod types;
pub use types::*;

pub mod vertex;
pub use vertex::*;

use std::path::{Path, PathBuf};

use log::info;
use tracing::instrument;

use crate::{
    helpers::{BakeContext, BakeError},
    scene::{load_scene, Document},
    world::Config,
};

/// A baked document together with its binary blob.
#[derive(Debug, Clone)]
pub struct BakedAsset {
    pub document: Document,
    pub blob: Vec<u8>,
    pub scene: TranscodedScene,
}

/// Files written by [`bake`].
#[derive(Debug, Clone)]
pub struct BakeOutput {
    pub gltf_path: PathBuf,
    pub bin_path: PathBuf,
    pub render_elements: usize,
    pub meshes: usize,
    pub vertices: usize,
    pub indices: usize,
}

/// Transcodes and rewrites a loaded document without touching the
/// filesystem. The result depends only on the inputs.
pub fn bake_document(
    document: &Document,
    buffers: &[Vec<u8>],
    bin_uri: &str,
    buffer_name: Option<&str>,
    parallel: bool,
) -> Result<BakedAsset, BakeError> {
    let scene = transcode(document, buffers, parallel)?;
    let document = rewrite_document(document, &scene, bin_uri, buffer_name)?;
    let blob = baked_blob(&scene);
    Ok(BakedAsset {
        document,
        blob,
        scene,
    })
}

/// `<dir>/<stem><suffix>.gltf` and `<dir>/<stem><suffix>.bin` for `source`.
pub fn output_paths(source: &Path, suffix: &str) -> Result<(PathBuf, PathBuf), BakeError> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BakeError::InvalidInput(format!("{} has no file name", source.display())))?;
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let base = format!("{stem}{suffix}");
    Ok((
        dir.join(format!("{base}.gltf")),
        dir.join(format!("{base}.bin")),
    ))
}

/// Bakes the scene at `path` and writes the baked pair next to it.
///
/// Nothing is written unless loading, transcoding and rewriting all succeed.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn bake(path: &Path, config: &Config) -> Result<BakeOutput, BakeError> {
    let loaded = load_scene(path)?;
    let (gltf_path, bin_path) = output_paths(path, &config.output_suffix)?;

    let bin_uri = bin_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BakeError::Internal("output bin path has no file name".to_string()))?
        .to_string();

    let asset = bake_document(
        &loaded.document,
        &loaded.buffers,
        &bin_uri,
        None,
        config.parallel_transcode,
    )?;

    let json = if config.pretty_json {
        serde_json::to_vec_pretty(&asset.document)?
    } else {
        serde_json::to_vec(&asset.document)?
    };

    std::fs::write(&bin_path, &asset.blob)
        .bake_context(&format!("writing {}", bin_path.display()))?;
    std::fs::write(&gltf_path, json).bake_context(&format!("writing {}", gltf_path.display()))?;

    info!(
        "Baked {} -> {} ({} meshes, {} render elements, {} vertices, {} indices)",
        path.display(),
        gltf_path.display(),
        asset.scene.meshes.len(),
        asset.scene.render_elements.len(),
        asset.scene.vertices.len(),
        asset.scene.indices.len()
    );

    Ok(BakeOutput {
        gltf_path,
        bin_path,
        render_elements: asset.scene.render_elements.len(),
        meshes: asset.scene.meshes.len(),
        vertices: asset.scene.vertices.len(),
        indices: asset.scene.indices.len(),
    })
}
