use std::env;
use std::fs;

use gltf::Document;
use lumberjack::animation::{AnimationClip, AssetBuildError, SkeletonPose};
use lumberjack::resource_system::file_formats::modelfile::{self, Deformation};
use lumberjack::utils::filename_without_extension;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod aabb;
mod animations;
mod skeletons;

use aabb::calculate_aabb;
use animations::bake_animation;
use skeletons::read_skeletonfile;

/// Bakes the skin and animations of a gltf model into runtime pose and clip files
/// plus a model descriptor under `assets/local/<name>/`.
fn bake(
    gltf: &Document,
    buffers: &[gltf::buffer::Data],
    input_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let model_name = filename_without_extension(input_path)
        .ok_or_else(|| format!("cannot derive a model name from {}", input_path))?;
    let directory_path = format!("assets/local/{}", model_name);
    let json_path = format!("{}/{}.json", directory_path, model_name);
    fs::create_dir_all(&directory_path)?;

    let deformation = match read_skeletonfile(gltf, buffers)? {
        None => Deformation::None,
        Some((skeletonfile, joint_reindex)) => {
            let skeletonfile_path = format!("{}/{}.skeleton.json", directory_path, model_name);
            fs::write(&skeletonfile_path, serde_json::to_string_pretty(&skeletonfile)?)?;

            let pose = SkeletonPose::from_skeletonfile(&skeletonfile)?;
            let pose_path = format!("{}/{}.pose.json", directory_path, model_name);
            pose.save(&pose_path)?;

            let mut clip_paths = vec![];
            for animation in gltf.animations() {
                let Some(baked) = bake_animation(&animation, buffers, &skeletonfile, &joint_reindex)
                else {
                    warn!(animation = animation.index(), "animation drives no skin joints, skipped");
                    continue;
                };
                let clip = match AnimationClip::from_animationfile(&baked, &pose) {
                    Ok(clip) => clip,
                    Err(err @ AssetBuildError::ZeroDuration { .. }) => {
                        warn!(%err, "single pose animation skipped");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };
                let clip_path = format!(
                    "{}/{}_{}.clip.json",
                    directory_path,
                    model_name,
                    animation.index()
                );
                clip.save(&clip_path)?;
                info!(clip = clip.name(), duration = clip.duration(), path = %clip_path, "clip baked");
                clip_paths.push(clip_path);
            }

            Deformation::Skinned { skeleton: pose_path, animations: clip_paths }
        }
    };

    let model = modelfile::Model {
        mesh: input_path.to_string(),
        deformation,
        aabb: calculate_aabb(gltf, buffers),
    };
    let json = serde_json::to_string_pretty(&model)?;
    fs::write(&json_path, json)?;
    info!(model = model_name, output = %json_path, "model baked");

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
        .unwrap_or("assets/lumberjack.glb");
    let (gltf, buffers, _images) = gltf::import(path)?;
    bake(&gltf, &buffers, path)?;

    Ok(())
}
