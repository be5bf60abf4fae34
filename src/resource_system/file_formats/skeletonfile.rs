use serde::{Deserialize, Serialize};

/// Bone as handed over by the model importer, in whatever order the source file used.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub children: Vec<u32>,
    /// column-major local bind transform
    pub transform: [[f32; 4]; 4],
    /// column-major; derived from the absolute bind transform when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_bind_matrix: Option<[[f32; 4]; 4]>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Skeleton {
    /// index into `bones`
    pub root: u32,
    pub bones: Vec<Bone>,
}
