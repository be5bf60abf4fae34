use std::fs;
use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AssetBuildError, SkeletonPose};
use crate::resource_system::file_formats::animationfile;
use crate::utils::ensure_parent_dir_exists;

/// Target local transform of one bone at one point in time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub bone: usize,
    /// seconds from the start of the clip
    pub time: f32,
    pub transform: Mat4,
}

/// Immutable keyframe sequence for every bone, merged and sorted by time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnimationClip {
    name: String,
    duration: f32,
    keyframes: Vec<Keyframe>,
}

impl AnimationClip {
    /// Sorts `keyframes` by time. Keyframes sharing a timestamp keep their given order.
    pub fn new(
        name: impl Into<String>,
        duration: f32,
        mut keyframes: Vec<Keyframe>,
    ) -> Result<Self, AssetBuildError> {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        let clip = Self { name: name.into(), duration, keyframes };
        clip.validate()?;
        Ok(clip)
    }

    fn validate(&self) -> Result<(), AssetBuildError> {
        if self.keyframes.is_empty() {
            return Err(AssetBuildError::NoKeyframes(self.name.clone()));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(AssetBuildError::ZeroDuration {
                clip: self.name.clone(),
                duration: self.duration,
            });
        }
        if let Some(bad) = self.keyframes.iter().find(|k| !k.time.is_finite()) {
            return Err(AssetBuildError::construction(format!(
                "clip '{}' has a keyframe at time {} for bone {}",
                self.name, bad.time, bad.bone
            )));
        }
        if self.keyframes.windows(2).any(|w| w[0].time > w[1].time) {
            return Err(AssetBuildError::construction(format!(
                "clip '{}' keyframes are not sorted by time",
                self.name
            )));
        }
        Ok(())
    }

    /// Merges the importer's per-bone channels into one time-ordered sequence.
    pub fn from_animationfile(
        animation: &animationfile::Animation,
        skeleton: &SkeletonPose,
    ) -> Result<Self, AssetBuildError> {
        let mut keyframes = vec![];
        for channel in &animation.channels {
            let bone = skeleton.bone_index(&channel.bone).ok_or_else(|| {
                AssetBuildError::UnmappedBone {
                    clip: animation.name.clone(),
                    bone: channel.bone.clone(),
                }
            })?;
            keyframes.extend(channel.keyframes.iter().map(|k| Keyframe {
                bone,
                time: k.time,
                transform: Mat4::from_cols_array_2d(&k.transform),
            }));
        }

        let clip = Self::new(animation.name.clone(), animation.duration, keyframes)?;
        debug!(
            clip = %clip.name,
            channels = animation.channels.len(),
            keyframes = clip.keyframes.len(),
            duration = clip.duration,
            "animation clip merged"
        );
        Ok(clip)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Highest bone index any keyframe writes to.
    pub fn max_bone(&self) -> usize {
        self.keyframes.iter().map(|k| k.bone).max().unwrap_or(0)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetBuildError> {
        let json = fs::read_to_string(path)?;
        let clip: Self = serde_json::from_str(&json)?;
        clip.validate()?;
        Ok(clip)
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

    fn skeleton() -> SkeletonPose {
        SkeletonPose::new(
            vec!["root".to_string(), "arm".to_string()],
            vec![Mat4::IDENTITY; 2],
            vec![Mat4::IDENTITY; 2],
            vec![None, Some(0)],
        )
        .unwrap()
    }

    fn key(time: f32, x: f32) -> animationfile::Keyframe {
        animationfile::Keyframe {
            time,
            transform: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)).to_cols_array_2d(),
        }
    }

    fn swing() -> animationfile::Animation {
        animationfile::Animation {
            name: "swing".to_string(),
            duration: 1.0,
            channels: vec![
                animationfile::Channel {
                    bone: "arm".to_string(),
                    keyframes: vec![key(0.0, 1.0), key(0.5, 2.0), key(0.9, 3.0)],
                },
                animationfile::Channel {
                    bone: "root".to_string(),
                    keyframes: vec![key(0.0, 4.0), key(0.5, 5.0)],
                },
            ],
        }
    }

    #[test]
    fn merges_channels_in_time_order() {
        let clip = AnimationClip::from_animationfile(&swing(), &skeleton()).unwrap();
        let order: Vec<(f32, usize)> = clip.keyframes().iter().map(|k| (k.time, k.bone)).collect();
        // equal timestamps keep channel order
        assert_eq!(order, vec![(0.0, 1), (0.0, 0), (0.5, 1), (0.5, 0), (0.9, 1)]);
        assert_eq!(clip.max_bone(), 1);
        assert_eq!(clip.name(), "swing");
    }

    #[test]
    fn unmapped_bone() {
        let mut animation = swing();
        animation.channels[1].bone = "Armature".to_string();
        match AnimationClip::from_animationfile(&animation, &skeleton()) {
            Err(AssetBuildError::UnmappedBone { clip, bone }) => {
                assert_eq!(clip, "swing");
                assert_eq!(bone, "Armature");
            }
            other => panic!("expected UnmappedBone, got {:?}", other),
        }
    }

    #[test]
    fn empty_and_zero_length_clips() {
        let mut animation = swing();
        animation.channels.clear();
        assert!(matches!(
            AnimationClip::from_animationfile(&animation, &skeleton()),
            Err(AssetBuildError::NoKeyframes(_))
        ));

        let mut animation = swing();
        animation.duration = 0.0;
        assert!(matches!(
            AnimationClip::from_animationfile(&animation, &skeleton()),
            Err(AssetBuildError::ZeroDuration { .. })
        ));
    }

    #[test]
    fn unsorted_file_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swing.clip.json");
        let clip = AnimationClip::from_animationfile(&swing(), &skeleton()).unwrap();
        clip.save(&path).unwrap();
        assert_eq!(AnimationClip::load(&path).unwrap(), clip);

        let mut tampered = clip.clone();
        tampered.keyframes.reverse();
        fs::write(&path, serde_json::to_string(&tampered).unwrap()).unwrap();
        assert!(matches!(
            AnimationClip::load(&path),
            Err(AssetBuildError::Construction(_))
        ));
    }
}
