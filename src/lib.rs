pub mod animation;
pub mod game;
pub mod resource_system;
pub mod terrain;
pub mod utils;
