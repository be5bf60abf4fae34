use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::Interpolation;
use lumberjack::resource_system::file_formats::{animationfile, skeletonfile};
use tracing::{debug, warn};

struct Track<T> {
    interpolation: Interpolation,
    times: Vec<f32>,
    values: Vec<T>,
}

impl<T: Copy> Track<T> {
    fn new(interpolation: Interpolation, times: Vec<f32>, values: Vec<T>) -> Option<Self> {
        // cubic samplers store (in tangent, value, out tangent) triples
        let values = match interpolation {
            Interpolation::CubicSpline => values.chunks_exact(3).map(|triple| triple[1]).collect(),
            Interpolation::Linear | Interpolation::Step => values,
        };
        if times.is_empty() || times.len() != values.len() {
            warn!(
                times = times.len(),
                values = values.len(),
                "animation sampler has mismatched input and output counts, skipped"
            );
            return None;
        }
        Some(Self { interpolation, times, values })
    }

    fn sample(&self, time: f32, mix: impl Fn(T, T, f32) -> T) -> T {
        let next = self.times.partition_point(|t| *t <= time);
        if next == 0 {
            return self.values[0];
        }
        if next == self.times.len() {
            return self.values[next - 1];
        }
        let prev = next - 1;
        match self.interpolation {
            Interpolation::Step => self.values[prev],
            Interpolation::Linear | Interpolation::CubicSpline => {
                let span = self.times[next] - self.times[prev];
                let t = if span > 0.0 { (time - self.times[prev]) / span } else { 0.0 };
                mix(self.values[prev], self.values[next], t)
            }
        }
    }
}

#[derive(Default)]
struct JointTracks {
    translation: Option<Track<Vec3>>,
    rotation: Option<Track<Quat>>,
    scale: Option<Track<Vec3>>,
}

impl JointTracks {
    fn key_times(&self) -> Vec<f32> {
        let mut times: Vec<f32> = [
            self.translation.as_ref().map(|t| t.times.as_slice()),
            self.rotation.as_ref().map(|t| t.times.as_slice()),
            self.scale.as_ref().map(|t| t.times.as_slice()),
        ]
        .into_iter()
        .flatten()
        .flatten()
        .copied()
        .collect();
        times.sort_by(f32::total_cmp);
        times.dedup();
        times
    }

    /// Local transform at `time`; properties without a track keep their bind value.
    fn local_transform(&self, time: f32, bind: Mat4) -> Mat4 {
        let (bind_scale, bind_rotation, bind_translation) = bind.to_scale_rotation_translation();
        let translation = self
            .translation
            .as_ref()
            .map_or(bind_translation, |track| track.sample(time, Vec3::lerp));
        let rotation = self
            .rotation
            .as_ref()
            .map_or(bind_rotation, |track| track.sample(time, Quat::slerp));
        let scale = self
            .scale
            .as_ref()
            .map_or(bind_scale, |track| track.sample(time, Vec3::lerp));
        Mat4::from_scale_rotation_translation(scale, rotation.normalize(), translation)
    }
}

/// Resamples one gltf animation into per-bone keyframes at every authored key time.
/// Returns None when no channel drives a bone of the skin.
pub fn bake_animation(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
    skeleton: &skeletonfile::Skeleton,
    joint_reindex: &HashMap<usize, u32>,
) -> Option<animationfile::Animation> {
    let mut tracks = BTreeMap::<u32, JointTracks>::new();
    for channel in animation.channels() {
        let node = channel.target().node();
        let Some(&bone) = joint_reindex.get(&node.index()) else {
            debug!(node = node.index(), "channel targets a node outside the skin, skipped");
            continue;
        };
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        let interpolation = channel.sampler().interpolation();
        let joint = tracks.entry(bone).or_default();
        match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                joint.translation = Track::new(interpolation, times, values.map(Vec3::from).collect());
            }
            Some(ReadOutputs::Rotations(values)) => {
                joint.rotation =
                    Track::new(interpolation, times, values.into_f32().map(Quat::from_array).collect());
            }
            Some(ReadOutputs::Scales(values)) => {
                joint.scale = Track::new(interpolation, times, values.map(Vec3::from).collect());
            }
            _ => debug!(node = node.index(), "morph target weights are not baked"),
        }
    }

    let mut duration = 0f32;
    let mut channels = vec![];
    for (bone, joint) in tracks {
        let times = joint.key_times();
        if times.is_empty() {
            continue;
        }
        let bone = &skeleton.bones[bone as usize];
        let bind = Mat4::from_cols_array_2d(&bone.transform);
        duration = times.iter().copied().fold(duration, f32::max);
        channels.push(animationfile::Channel {
            bone: bone.name.clone(),
            keyframes: times
                .into_iter()
                .map(|time| animationfile::Keyframe {
                    time,
                    transform: joint.local_transform(time, bind).to_cols_array_2d(),
                })
                .collect(),
        });
    }

    if channels.is_empty() {
        return None;
    }
    Some(animationfile::Animation {
        name: animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index())),
        duration,
        channels,
    })
}
