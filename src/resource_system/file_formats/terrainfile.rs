use serde::{Deserialize, Serialize};

use crate::terrain::TerrainConfig;

/// Descriptor written next to the baked terrain buffers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Terrain {
    /// `TerrainVertex` records, tightly packed
    pub vertex_buffer: String,
    /// u32 triangle list
    pub index_buffer: String,
    pub vertex_count: u32,
    pub index_count: u32,
    /// binary height field sidecar
    pub height_field: String,
    pub config: TerrainConfig,
}
