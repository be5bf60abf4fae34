use thiserror::Error;

use crate::animation::AssetBuildError;
use crate::terrain::TerrainError;

pub mod animated_model;
pub mod props;
pub mod world;

pub use animated_model::AnimatedModel;
pub use props::{Prop, PropCategory};
pub use world::{Actor, ActorId, PropId, Terrain, World};

#[derive(Error, Debug)]
pub enum WorldError {
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error(transparent)]
    Asset(#[from] AssetBuildError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
