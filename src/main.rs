use std::env;
use std::time::Duration;

use glam::Vec3;
use lumberjack::game::{AnimatedModel, Terrain, World};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(100);
const TICKS: u32 = 50;
const WALK_SPEED: f32 = 1.5;

/// Headless simulation run over baked assets:
/// `lumberjack <terrain.json> [props.json] [model.json] [clip]`
pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let terrain_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("assets/local/valley/valley.json");
    let mut world = World::with_terrain(Terrain::load(terrain_path)?);

    if let Some(props_path) = args.get(2) {
        let ids = world.load_prop_file(props_path)?;
        info!(props = ids.len(), "props placed");
    }

    let actor = match args.get(3) {
        Some(model_path) => {
            let mut model = AnimatedModel::load(model_path)?;
            let clip = match args.get(4) {
                Some(clip) => clip.clone(),
                None => model.clip_names().next().unwrap_or_default().to_string(),
            };
            model.play(&clip)?;
            Some(world.spawn_actor(model, Vec3::ZERO, 0.0))
        }
        None => None,
    };

    let dt = TICK.as_secs_f32();
    for tick in 0..TICKS {
        if let Some(id) = actor {
            let heading = world.actor(id).map(|a| a.heading).unwrap_or(0.0);
            let forward = Vec3::new(heading.sin(), 0.0, heading.cos());
            if let Some(position) = world.actor(id).map(|a| a.position) {
                world.move_actor(id, position + forward * WALK_SPEED * dt);
            }
        }
        world.update(dt)?;

        if let Some(actor) = actor.and_then(|id| world.actor(id)) {
            let sample = world.sample_terrain(actor.position);
            info!(
                tick,
                x = actor.position.x,
                y = actor.position.y,
                z = actor.position.z,
                on_map = sample.on_map,
                time = actor.model.controller().current_time(),
                "actor"
            );
        }
    }

    Ok(())
}
