use cgmath::{Matrix4, One};
use log::warn;

use crate::{
    helpers::{matrix_from_gltf, matrix_from_trs},
    scene::{Document, Node},
};

/// One placement of a mesh in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneInstance {
    pub mesh: usize,
    pub transform: Matrix4<f32>,
}

pub fn local_transform(node: &Node) -> Matrix4<f32> {
    if let Some(matrix) = &node.matrix {
        return matrix_from_gltf(matrix);
    }
    matrix_from_trs(
        node.translation.unwrap_or([0.0, 0.0, 0.0]),
        node.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]),
        node.scale.unwrap_or([1.0, 1.0, 1.0]),
    )
}

/// Root nodes of the default scene, or every parentless node when the
/// document declares no scenes.
pub fn root_nodes(document: &Document) -> Vec<usize> {
    let scene = document.scene.unwrap_or(0);
    if let Some(scene) = document.scenes.get(scene) {
        return scene.nodes.clone();
    }

    let mut has_parent = vec![false; document.nodes.len()];
    for node in &document.nodes {
        for &child in &node.children {
            if let Some(flag) = has_parent.get_mut(child) {
                *flag = true;
            }
        }
    }
    (0..document.nodes.len())
        .filter(|&i| !has_parent[i])
        .collect()
}

/// Walks the node hierarchy and emits one instance per node with a mesh,
/// in depth-first order.
pub fn collect_instances(document: &Document) -> Vec<SceneInstance> {
    let mut instances = Vec::new();
    let mut stack: Vec<(usize, Matrix4<f32>, usize)> = root_nodes(document)
        .into_iter()
        .rev()
        .map(|n| (n, Matrix4::one(), 0))
        .collect();

    while let Some((index, parent, depth)) = stack.pop() {
        let Some(node) = document.nodes.get(index) else {
            warn!("Scene references missing node {}", index);
            continue;
        };
        // malformed files can contain cycles
        if depth > document.nodes.len() {
            warn!("Node hierarchy deeper than node count, stopping at {}", index);
            continue;
        }

        let world = parent * local_transform(node);
        if let Some(mesh) = node.mesh {
            if mesh < document.meshes.len() {
                instances.push(SceneInstance {
                    mesh,
                    transform: world,
                });
            } else {
                warn!("Node {} references missing mesh {}", index, mesh);
            }
        }

        for &child in node.children.iter().rev() {
            stack.push((child, world, depth + 1));
        }
    }

    instances
}
