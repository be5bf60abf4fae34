use std::collections::HashSet;
use std::fs;
use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AssetBuildError, MAX_BONES};
use crate::resource_system::file_formats::skeletonfile;
use crate::utils::ensure_parent_dir_exists;

/// Bind pose of a skinned model. Shared read-only by every controller animating that model.
///
/// Bones are stored parent-first: bone 0 is the root and every other bone's parent has a
/// smaller index, so a single forward pass can propagate world transforms.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkeletonPose {
    names: Vec<String>,
    /// local bind transforms
    bind_pose: Vec<Mat4>,
    /// world to bone space at bind time
    inverse_bind_pose: Vec<Mat4>,
    /// None only for the root
    parents: Vec<Option<usize>>,
}

impl SkeletonPose {
    pub fn new(
        names: Vec<String>,
        bind_pose: Vec<Mat4>,
        inverse_bind_pose: Vec<Mat4>,
        parents: Vec<Option<usize>>,
    ) -> Result<Self, AssetBuildError> {
        let pose = Self { names, bind_pose, inverse_bind_pose, parents };
        pose.validate()?;
        Ok(pose)
    }

    fn validate(&self) -> Result<(), AssetBuildError> {
        let count = self.bind_pose.len();
        if count == 0 {
            return Err(AssetBuildError::construction("skeleton has no bones"));
        }
        if count > MAX_BONES {
            return Err(AssetBuildError::TooManyBones { count, max: MAX_BONES });
        }
        if self.names.len() != count
            || self.inverse_bind_pose.len() != count
            || self.parents.len() != count
        {
            return Err(AssetBuildError::construction(format!(
                "skeleton arrays disagree: {} bind, {} inverse bind, {} parents, {} names",
                count,
                self.inverse_bind_pose.len(),
                self.parents.len(),
                self.names.len()
            )));
        }
        // channels address bones by name
        let mut seen = HashSet::with_capacity(count);
        if let Some(duplicate) = self.names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(AssetBuildError::construction(format!(
                "bone name '{}' is used more than once",
                duplicate
            )));
        }
        for (idx, parent) in self.parents.iter().enumerate() {
            match (idx, parent) {
                (0, None) => {}
                (_, Some(p)) if idx > 0 && *p < idx => {}
                _ => {
                    return Err(AssetBuildError::construction(format!(
                        "bone {} has parent {:?}; only bone 0 may be a root and parents must precede children",
                        idx, parent
                    )))
                }
            }
        }
        Ok(())
    }

    /// Flattens the importer's bone tree depth-first from its root.
    pub fn from_skeletonfile(skeleton: &skeletonfile::Skeleton) -> Result<Self, AssetBuildError> {
        let bone_count = skeleton.bones.len();
        let root = skeleton.root as usize;
        if root >= bone_count {
            return Err(AssetBuildError::construction(format!(
                "root bone {} out of range for {} bones",
                root, bone_count
            )));
        }

        // (source index, flattened parent index)
        let mut order: Vec<(usize, Option<usize>)> = Vec::with_capacity(bone_count);
        let mut visited = vec![false; bone_count];
        let mut stack = vec![(root, None)];
        while let Some((idx, parent)) = stack.pop() {
            if idx >= bone_count {
                return Err(AssetBuildError::construction(format!(
                    "bone {} is referenced as a child but does not exist",
                    idx
                )));
            }
            if visited[idx] {
                return Err(AssetBuildError::construction(format!(
                    "bone '{}' is reachable twice, the hierarchy is not a tree",
                    skeleton.bones[idx].name
                )));
            }
            visited[idx] = true;
            let flat_idx = order.len();
            order.push((idx, parent));
            // reversed so siblings keep their authored order after popping
            for child in skeleton.bones[idx].children.iter().rev() {
                stack.push((*child as usize, Some(flat_idx)));
            }
        }

        if order.len() > MAX_BONES {
            return Err(AssetBuildError::TooManyBones { count: order.len(), max: MAX_BONES });
        }
        if order.len() < bone_count {
            warn!(
                dropped = bone_count - order.len(),
                "bones not reachable from the skeleton root were skipped"
            );
        }

        let mut names = Vec::with_capacity(order.len());
        let mut bind_pose = Vec::with_capacity(order.len());
        let mut absolute: Vec<Mat4> = Vec::with_capacity(order.len());
        let mut inverse_bind_pose = Vec::with_capacity(order.len());
        let mut parents = Vec::with_capacity(order.len());
        for (source_idx, parent) in order {
            let bone = &skeleton.bones[source_idx];
            let local = Mat4::from_cols_array_2d(&bone.transform);
            let world = match parent {
                Some(p) => absolute[p] * local,
                None => local,
            };
            names.push(bone.name.clone());
            bind_pose.push(local);
            absolute.push(world);
            inverse_bind_pose.push(
                bone.inverse_bind_matrix
                    .map(|m| Mat4::from_cols_array_2d(&m))
                    .unwrap_or_else(|| world.inverse()),
            );
            parents.push(parent);
        }

        debug!(bones = names.len(), "skeleton flattened");
        Self::new(names, bind_pose, inverse_bind_pose, parents)
    }

    pub fn bone_count(&self) -> usize {
        self.bind_pose.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn bind_pose(&self) -> &[Mat4] {
        &self.bind_pose
    }

    pub fn inverse_bind_pose(&self) -> &[Mat4] {
        &self.inverse_bind_pose
    }

    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetBuildError> {
        let json = fs::read_to_string(path)?;
        let pose: Self = serde_json::from_str(&json)?;
        pose.validate()?;
        Ok(pose)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetBuildError> {
        let path = path.as_ref();
        ensure_parent_dir_exists(path)?;
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn bone(name: &str, children: Vec<u32>, translation: Vec3) -> skeletonfile::Bone {
        skeletonfile::Bone {
            name: name.to_string(),
            children,
            transform: Mat4::from_translation(translation).to_cols_array_2d(),
            inverse_bind_matrix: None,
        }
    }

    fn shuffled_skeleton() -> skeletonfile::Skeleton {
        skeletonfile::Skeleton {
            root: 1,
            bones: vec![
                bone("hand", vec![], Vec3::new(0.0, 0.0, 1.0)),
                bone("hips", vec![2, 3], Vec3::new(0.0, 1.0, 0.0)),
                bone("spine", vec![0], Vec3::new(0.0, 0.5, 0.0)),
                bone("leg", vec![], Vec3::new(0.2, -0.5, 0.0)),
            ],
        }
    }

    #[test]
    fn flattens_parents_before_children() {
        let pose = SkeletonPose::from_skeletonfile(&shuffled_skeleton()).unwrap();
        assert_eq!(pose.names(), &["hips", "spine", "hand", "leg"]);
        assert_eq!(pose.parents(), &[None, Some(0), Some(1), Some(0)]);
        assert_eq!(pose.bone_index("hand"), Some(2));
        assert_eq!(pose.bone_index("tail"), None);
    }

    #[test]
    fn inverse_bind_uses_absolute_transform() {
        let pose = SkeletonPose::from_skeletonfile(&shuffled_skeleton()).unwrap();
        let hand_world = Mat4::from_translation(Vec3::new(0.0, 1.5, 1.0));
        assert!(pose.inverse_bind_pose()[2].abs_diff_eq(hand_world.inverse(), 1e-6));
        assert!(pose.bind_pose()[2]
            .abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)), 1e-6));
    }

    #[test]
    fn explicit_inverse_bind_is_kept() {
        let mut skeleton = shuffled_skeleton();
        let custom = Mat4::from_scale(Vec3::splat(2.0));
        skeleton.bones[3].inverse_bind_matrix = Some(custom.to_cols_array_2d());
        let pose = SkeletonPose::from_skeletonfile(&skeleton).unwrap();
        assert_eq!(pose.inverse_bind_pose()[3], custom);
    }

    #[test]
    fn too_many_bones() {
        let count = MAX_BONES + 1;
        let bones = (0..count)
            .map(|i| {
                let children = if i + 1 < count { vec![i as u32 + 1] } else { vec![] };
                bone(&format!("b{}", i), children, Vec3::X)
            })
            .collect();
        let skeleton = skeletonfile::Skeleton { root: 0, bones };
        assert!(matches!(
            SkeletonPose::from_skeletonfile(&skeleton),
            Err(AssetBuildError::TooManyBones { count: 73, max: 72 })
        ));
    }

    #[test]
    fn cycles_and_bad_links_are_rejected() {
        let mut skeleton = shuffled_skeleton();
        skeleton.bones[0].children.push(1);
        assert!(matches!(
            SkeletonPose::from_skeletonfile(&skeleton),
            Err(AssetBuildError::Construction(_))
        ));

        let mut skeleton = shuffled_skeleton();
        skeleton.bones[3].children.push(9);
        assert!(SkeletonPose::from_skeletonfile(&skeleton).is_err());

        let mut skeleton = shuffled_skeleton();
        skeleton.root = 4;
        assert!(SkeletonPose::from_skeletonfile(&skeleton).is_err());
    }

    #[test]
    fn new_enforces_parent_order() {
        let two = || vec![Mat4::IDENTITY; 2];
        let names = || vec!["a".to_string(), "b".to_string()];
        assert!(SkeletonPose::new(names(), two(), two(), vec![None, Some(0)]).is_ok());
        assert!(SkeletonPose::new(names(), two(), two(), vec![None, Some(1)]).is_err());
        assert!(SkeletonPose::new(names(), two(), two(), vec![Some(1), None]).is_err());
        assert!(SkeletonPose::new(names(), two(), two(), vec![None, None]).is_err());
        assert!(SkeletonPose::new(names(), two(), vec![Mat4::IDENTITY], vec![None, Some(0)]).is_err());
    }

    #[test]
    fn duplicate_bone_names_are_rejected() {
        let twins = || vec!["Bone".to_string(), "Bone".to_string()];
        assert!(matches!(
            SkeletonPose::new(
                twins(),
                vec![Mat4::IDENTITY; 2],
                vec![Mat4::IDENTITY; 2],
                vec![None, Some(0)]
            ),
            Err(AssetBuildError::Construction(_))
        ));

        let mut skeleton = shuffled_skeleton();
        skeleton.bones[3].name = "hand".to_string();
        assert!(matches!(
            SkeletonPose::from_skeletonfile(&skeleton),
            Err(AssetBuildError::Construction(_))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumberjack/lumberjack.pose.json");
        let pose = SkeletonPose::from_skeletonfile(&shuffled_skeleton()).unwrap();
        pose.save(&path).unwrap();
        assert_eq!(SkeletonPose::load(&path).unwrap(), pose);
    }
}
