use glam::{Mat4, Vec3};
use gltf::Document;
use lumberjack::resource_system::file_formats::modelfile;

fn accumulate_node_bounds(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    bounds: &mut Option<(Vec3, Vec3)>,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            for position in positions {
                let p = transform.transform_point3(Vec3::from(position));
                *bounds = Some(match *bounds {
                    Some((min, max)) => (min.min(p), max.max(p)),
                    None => (p, p),
                });
            }
        }
    }
    for child in node.children() {
        accumulate_node_bounds(&child, transform, buffers, bounds);
    }
}

/// Bind pose bounds of every mesh instance in the default scene.
pub fn calculate_aabb(gltf: &Document, buffers: &[gltf::buffer::Data]) -> modelfile::Aabb {
    // TODO: grow the box by the extent of the baked clips
    let mut bounds = None;
    if let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) {
        for node in scene.nodes() {
            accumulate_node_bounds(&node, Mat4::IDENTITY, buffers, &mut bounds);
        }
    }
    let (min, max) = bounds.unwrap_or((Vec3::ZERO, Vec3::ZERO));
    modelfile::Aabb { min: min.to_array(), max: max.to_array() }
}
