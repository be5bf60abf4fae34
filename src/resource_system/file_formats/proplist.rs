use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Serialized as a plain integer tag. Append new kinds with fresh values, never reuse one.
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum PropKind {
    Pine = 0,
    Birch = 1,
    Oak = 2,
    Boulder = 3,
    Stone = 4,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropDescriptor {
    pub kind: PropKind,
    pub position: [f32; 3],
    /// radians around +Y
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PropList {
    pub props: Vec<PropDescriptor>,
}
