use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use glam::Mat4;
use tracing::info;

use super::WorldError;
use crate::animation::{AnimationClip, AnimationController, AnimationError, AssetBuildError, SkeletonPose};
use crate::resource_system::file_formats::modelfile::{self, Deformation};

/// One skinned model instance: shared pose and clips, private playback state.
pub struct AnimatedModel {
    mesh: String,
    clips: HashMap<String, Arc<AnimationClip>>,
    controller: AnimationController,
}

impl AnimatedModel {
    pub fn new(
        mesh: impl Into<String>,
        skeleton: Arc<SkeletonPose>,
        clips: impl IntoIterator<Item = Arc<AnimationClip>>,
    ) -> Self {
        Self {
            mesh: mesh.into(),
            clips: clips
                .into_iter()
                .map(|clip| (clip.name().to_string(), clip))
                .collect(),
            controller: AnimationController::new(skeleton),
        }
    }

    /// Loads the baked pose and clips a skinned model descriptor points at.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let model_path = model_path.as_ref();
        let model: modelfile::Model = serde_json::from_str(&fs::read_to_string(model_path)?)?;
        let Deformation::Skinned { skeleton, animations } = &model.deformation else {
            return Err(AssetBuildError::construction(format!(
                "{} is not a skinned model",
                model_path.display()
            ))
            .into());
        };
        let skeleton = Arc::new(SkeletonPose::load(skeleton)?);
        let clips = animations
            .iter()
            .map(|path| AnimationClip::load(path).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            model = %model_path.display(),
            bones = skeleton.bone_count(),
            clips = clips.len(),
            "animated model loaded"
        );
        Ok(Self::new(model.mesh, skeleton, clips))
    }

    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }

    pub fn clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.get(name)
    }

    /// Starts the named clip from its first frame. Unknown names report `NullClip`.
    pub fn play(&mut self, name: &str) -> Result<(), AnimationError> {
        self.controller.start_clip(self.clips.get(name).cloned())
    }

    /// Advances looping playback by `dt` seconds with the node transform as root.
    pub fn update(&mut self, dt: f32, root: Mat4) -> Result<(), AnimationError> {
        self.controller.advance(dt, true, root)
    }

    pub fn controller(&self) -> &AnimationController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AnimationController {
        &mut self.controller
    }
}
