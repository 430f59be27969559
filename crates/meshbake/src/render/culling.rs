use cgmath::{Matrix4, Vector4};

use crate::{helpers::to_clip, render::BoundingBox};

#[inline]
fn within(clip: Vector4<f32>, leeway: f32) -> bool {
    let lo = -clip.w - leeway;
    let hi = clip.w + leeway;
    (lo..=hi).contains(&clip.x) && (lo..=hi).contains(&clip.y) && (lo..=hi).contains(&clip.z)
}

/// Loose clip-space test of a model-space box under `transform`
/// (projection * view * model).
///
/// Each corner and the center are taken to clip space and accepted when all
/// three coordinates lie within `w` widened by the sum of the box extents.
/// The box is visible if any tested point is accepted, so boxes that are
/// on screen are never rejected while some near misses are kept.
pub fn is_visible(bound: &BoundingBox, transform: &Matrix4<f32>) -> bool {
    let leeway = bound.extent_sum();
    bound
        .corners()
        .into_iter()
        .chain(std::iter::once(bound.center()))
        .any(|p| within(to_clip(transform, p), leeway))
}
