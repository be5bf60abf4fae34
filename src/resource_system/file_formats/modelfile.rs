use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Deformation {
    None,
    Skinned {
        /// baked `SkeletonPose` json
        skeleton: String,
        /// baked `AnimationClip` json files
        animations: Vec<String>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Model {
    /// source mesh handed to the renderer
    pub mesh: String,
    pub deformation: Deformation,
    pub aabb: Aabb,
}
