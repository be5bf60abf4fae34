use std::collections::{HashMap, HashSet};

use gltf::{Document, Node};
use lumberjack::resource_system::file_formats::skeletonfile;
use tracing::warn;

/// Reads the first skin into an importer skeleton in joint order.
/// Returns it with the joint reindexing map (gltf node index -> bone index).
pub fn read_skeletonfile(
    gltf: &Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Option<(skeletonfile::Skeleton, HashMap<usize, u32>)>, Box<dyn std::error::Error>> {
    let mut skins = gltf.skins();
    let Some(skin) = skins.next() else {
        return Ok(None);
    };
    if skins.next().is_some() {
        warn!(skin = skin.index(), "model has several skins, only the first is baked");
    }

    let joints: Vec<Node> = skin.joints().collect();
    let reindex: HashMap<usize, u32> = joints
        .iter()
        .enumerate()
        .map(|(bone, joint)| (joint.index(), bone as u32))
        .collect();

    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let inverse_bind_matrices: Option<Vec<[[f32; 4]; 4]>> =
        reader.read_inverse_bind_matrices().map(|ibms| ibms.collect());
    if let Some(ibms) = &inverse_bind_matrices {
        if ibms.len() != joints.len() {
            return Err(format!(
                "inverseBindMatrices count ({}) does not match joint count ({}) for skin {}",
                ibms.len(),
                joints.len(),
                skin.index()
            )
            .into());
        }
    }

    let mut names = HashSet::with_capacity(joints.len());
    let mut is_child = vec![false; joints.len()];
    let mut bones = Vec::with_capacity(joints.len());
    for (bone, joint) in joints.iter().enumerate() {
        // children outside the skin (attachments, meshes) are not bones
        let children: Vec<u32> = joint
            .children()
            .filter_map(|child| reindex.get(&child.index()).copied())
            .collect();
        for child in &children {
            is_child[*child as usize] = true;
        }
        let mut name = joint
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("joint_{}", joint.index()));
        // repeated gltf joint names get the node index appended
        if !names.insert(name.clone()) {
            let unique = format!("{}_{}", name, joint.index());
            warn!(joint = joint.index(), %name, renamed = %unique, "duplicate joint name");
            name = unique;
            names.insert(name.clone());
        }
        bones.push(skeletonfile::Bone {
            name,
            children,
            transform: joint.transform().matrix(),
            inverse_bind_matrix: inverse_bind_matrices.as_ref().map(|ibms| ibms[bone]),
        });
    }

    let roots: Vec<usize> = (0..bones.len()).filter(|bone| !is_child[*bone]).collect();
    let root = match roots.as_slice() {
        [root] => *root as u32,
        _ => {
            return Err(format!(
                "skin {} must have exactly one root joint, found {}",
                skin.index(),
                roots.len()
            )
            .into())
        }
    };

    Ok(Some((skeletonfile::Skeleton { root, bones }, reindex)))
}
