use thiserror::Error;

pub mod clip;
pub mod controller;
pub mod skeleton;

pub use clip::{AnimationClip, Keyframe};
pub use controller::{AnimationController, BoneMat34};
pub use skeleton::SkeletonPose;

/// Size of the skinning palette the renderer can bind per draw.
pub const MAX_BONES: usize = 72;

/// Raised while turning imported art into runtime assets. Aborts the build.
#[derive(Error, Debug)]
pub enum AssetBuildError {
    #[error("skeleton has {count} bones, the skinning limit is {max}")]
    TooManyBones { count: usize, max: usize },

    #[error("animation clip '{0}' has no keyframes")]
    NoKeyframes(String),

    #[error("animation clip '{clip}' has non-positive duration {duration}")]
    ZeroDuration { clip: String, duration: f32 },

    /// Usually a channel authored on the root or another bone that is not part of the skin.
    #[error("animation clip '{clip}' targets bone '{bone}' which is not in the skeleton")]
    UnmappedBone { clip: String, bone: String },

    #[error("malformed asset: {0}")]
    Construction(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AssetBuildError {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }
}

/// Controller misuse at runtime. The caller has to fix its call pattern.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    #[error("advance called before a clip was started")]
    NotStarted,

    #[error("no clip given to start")]
    NullClip,

    #[error("animation time {time} is outside [0, {duration})")]
    OutOfRange { time: f32, duration: f32 },

    #[error("clip '{clip}' animates bone {bone} but the skeleton only has {bone_count}")]
    SkeletonMismatch { clip: String, bone: usize, bone_count: usize },
}
