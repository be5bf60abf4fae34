use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    /// column-major local bone transform
    pub transform: [[f32; 4]; 4],
}

/// All keyframes authored for one bone, addressed by name.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Channel {
    pub bone: String,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}
