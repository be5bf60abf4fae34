use thiserror::Error;

pub mod generator;
pub mod height_field;

pub use generator::{generate_terrain, ChannelGrid, ChannelSource, TerrainConfig, TerrainMesh, TerrainVertex};
pub use height_field::{HeightField, HeightSample};

#[derive(Error, Debug)]
pub enum TerrainError {
    /// Malformed grid dimensions, sample counts or a missing source.
    #[error("terrain construction error: {0}")]
    Construction(String),

    #[error("terrain io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerrainError {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }
}
