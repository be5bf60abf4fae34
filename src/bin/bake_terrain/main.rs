use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use lumberjack::resource_system::file_formats::terrainfile;
use lumberjack::terrain::{generate_terrain, TerrainConfig};
use lumberjack::utils::filename_without_extension;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bakes an RGBA terrain bitmap into vertex/index buffers, a height field sidecar
/// and a descriptor under `assets/local/<name>/`.
///
/// `bake_terrain <bitmap> [config.json]`
fn bake(input_path: &str, config: &TerrainConfig) -> Result<(), Box<dyn std::error::Error>> {
    let terrain_name = filename_without_extension(input_path)
        .ok_or_else(|| format!("cannot derive a terrain name from {}", input_path))?;
    let directory_path = format!("assets/local/{}", terrain_name);
    let vertex_file = format!("{}.vertices.bin", terrain_name);
    let index_file = format!("{}.indices.bin", terrain_name);
    let height_field_file = format!("{}.heightfield", terrain_name);
    let json_path = format!("{}/{}.json", directory_path, terrain_name);

    let bitmap = image::open(input_path)?.to_rgba32f();
    let mesh = generate_terrain(&bitmap, config)?;

    fs::create_dir_all(&directory_path)?;
    let directory = Path::new(&directory_path);
    File::create(directory.join(&vertex_file))?.write_all(bytemuck::cast_slice(&mesh.vertices))?;
    File::create(directory.join(&index_file))?.write_all(bytemuck::cast_slice(&mesh.indices))?;
    mesh.height_field.save(directory.join(&height_field_file))?;

    let terrain = terrainfile::Terrain {
        vertex_buffer: vertex_file,
        index_buffer: index_file,
        vertex_count: mesh.vertices.len() as u32,
        index_count: mesh.indices.len() as u32,
        height_field: height_field_file,
        config: *config,
    };
    let json = serde_json::to_string_pretty(&terrain)?;
    fs::write(&json_path, json)?;

    info!(
        terrain = terrain_name,
        vertices = terrain.vertex_count,
        indices = terrain.index_count,
        output = %json_path,
        "terrain baked"
    );
    Ok(())
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("assets/terrain/valley.png");
    let config = match args.get(2) {
        Some(config_path) => serde_json::from_str(&fs::read_to_string(config_path)?)?,
        None => TerrainConfig::default(),
    };
    bake(path, &config)?;

    Ok(())
}
