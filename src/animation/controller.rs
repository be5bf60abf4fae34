use std::sync::Arc;

use glam::Mat4;

use super::{AnimationClip, AnimationError, SkeletonPose};

/// Row-major 3x4 bone matrix as uploaded to the skinning palette.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BoneMat34 {
    pub mat: [[f32; 4]; 3],
}
impl Default for BoneMat34 {
    fn default() -> Self {
        Self::from(Mat4::IDENTITY)
    }
}
impl From<Mat4> for BoneMat34 {
    fn from(m: Mat4) -> Self {
        Self {
            mat: [m.row(0).to_array(), m.row(1).to_array(), m.row(2).to_array()],
        }
    }
}

enum Playback {
    Unbound,
    Playing {
        clip: Arc<AnimationClip>,
        /// seconds into the clip, always in [0, duration)
        time: f32,
        /// index of the next keyframe to apply
        cursor: usize,
    },
}

/// Plays one clip at a time on one model instance.
///
/// Keyframes are applied without interpolation: each bone holds the transform of the last
/// keyframe at or before the current time. Seeking backwards replays the clip from the bind
/// pose instead of searching the keyframe list.
pub struct AnimationController {
    skeleton: Arc<SkeletonPose>,
    playback: Playback,
    bone_transforms: Vec<Mat4>,
    world_transforms: Vec<Mat4>,
    skin_transforms: Vec<Mat4>,
}

impl AnimationController {
    pub fn new(skeleton: Arc<SkeletonPose>) -> Self {
        let bone_count = skeleton.bone_count();
        let mut controller = Self {
            bone_transforms: skeleton.bind_pose().to_vec(),
            world_transforms: vec![Mat4::IDENTITY; bone_count],
            skin_transforms: vec![Mat4::IDENTITY; bone_count],
            playback: Playback::Unbound,
            skeleton,
        };
        controller.update_world_transforms(Mat4::IDENTITY);
        controller.update_skin_transforms();
        controller
    }

    /// Rewinds to the start of `clip` with every bone back in its bind pose.
    pub fn start_clip(&mut self, clip: Option<Arc<AnimationClip>>) -> Result<(), AnimationError> {
        let clip = clip.ok_or(AnimationError::NullClip)?;
        let bone_count = self.skeleton.bone_count();
        if clip.max_bone() >= bone_count {
            return Err(AnimationError::SkeletonMismatch {
                clip: clip.name().to_string(),
                bone: clip.max_bone(),
                bone_count,
            });
        }
        tracing::trace!(clip = clip.name(), "clip started");
        self.playback = Playback::Playing { clip, time: 0.0, cursor: 0 };
        self.reset_to_bind_pose();
        Ok(())
    }

    /// Moves playback to a new time and recomputes every transform array.
    ///
    /// With `relative` the time advances by `delta` and loops around the clip duration,
    /// otherwise `delta` is the absolute clip time and must already lie in [0, duration).
    pub fn advance(&mut self, delta: f32, relative: bool, root: Mat4) -> Result<(), AnimationError> {
        self.update_bone_transforms(delta, relative)?;
        self.update_world_transforms(root);
        self.update_skin_transforms();
        Ok(())
    }

    pub fn update_bone_transforms(&mut self, delta: f32, relative: bool) -> Result<(), AnimationError> {
        let Playback::Playing { clip, time, cursor } = &mut self.playback else {
            return Err(AnimationError::NotStarted);
        };
        let duration = clip.duration();

        let mut target = delta;
        if relative {
            target += *time;
            if target.is_finite() && target >= duration {
                target %= duration;
            }
        }
        if !(target >= 0.0 && target < duration) {
            return Err(AnimationError::OutOfRange { time: target, duration });
        }

        if target < *time {
            *cursor = 0;
            self.bone_transforms.copy_from_slice(self.skeleton.bind_pose());
        }
        *time = target;

        let keyframes = clip.keyframes();
        while let Some(keyframe) = keyframes.get(*cursor) {
            if keyframe.time > target {
                break;
            }
            self.bone_transforms[keyframe.bone] = keyframe.transform;
            *cursor += 1;
        }
        Ok(())
    }

    /// Parents are always earlier in the array, so one forward pass suffices.
    pub fn update_world_transforms(&mut self, root: Mat4) {
        for (idx, parent) in self.skeleton.parents().iter().enumerate() {
            let parent_world = match parent {
                Some(p) => self.world_transforms[*p],
                None => root,
            };
            self.world_transforms[idx] = parent_world * self.bone_transforms[idx];
        }
    }

    pub fn update_skin_transforms(&mut self) {
        for ((skin, world), inverse_bind) in self
            .skin_transforms
            .iter_mut()
            .zip(&self.world_transforms)
            .zip(self.skeleton.inverse_bind_pose())
        {
            *skin = *world * *inverse_bind;
        }
    }

    fn reset_to_bind_pose(&mut self) {
        self.bone_transforms.copy_from_slice(self.skeleton.bind_pose());
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.playback, Playback::Playing { .. })
    }

    pub fn current_clip(&self) -> Option<&Arc<AnimationClip>> {
        match &self.playback {
            Playback::Playing { clip, .. } => Some(clip),
            Playback::Unbound => None,
        }
    }

    pub fn current_time(&self) -> f32 {
        match self.playback {
            Playback::Playing { time, .. } => time,
            Playback::Unbound => 0.0,
        }
    }

    /// Number of keyframes already applied in the current pass.
    pub fn keyframe_cursor(&self) -> usize {
        match self.playback {
            Playback::Playing { cursor, .. } => cursor,
            Playback::Unbound => 0,
        }
    }

    pub fn skeleton(&self) -> &Arc<SkeletonPose> {
        &self.skeleton
    }

    /// Current local transform of every bone.
    pub fn bone_transforms(&self) -> &[Mat4] {
        &self.bone_transforms
    }

    pub fn world_transforms(&self) -> &[Mat4] {
        &self.world_transforms
    }

    pub fn skin_transforms(&self) -> &[Mat4] {
        &self.skin_transforms
    }

    pub fn skin_palette(&self) -> Vec<BoneMat34> {
        self.skin_transforms.iter().map(|m| BoneMat34::from(*m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use glam::{Quat, Vec3, Vec4};

    fn two_bone_skeleton() -> Arc<SkeletonPose> {
        Arc::new(
            SkeletonPose::new(
                vec!["root".to_string(), "child".to_string()],
                vec![Mat4::IDENTITY; 2],
                vec![Mat4::IDENTITY; 2],
                vec![None, Some(0)],
            )
            .unwrap(),
        )
    }

    fn translation(x: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    fn key(bone: usize, time: f32, transform: Mat4) -> Keyframe {
        Keyframe { bone, time, transform }
    }

    /// Root slides along x at t = 0, 0.25, 0.5 and 0.75; the child bends at 0.5.
    fn walk() -> Arc<AnimationClip> {
        Arc::new(
            AnimationClip::new(
                "walk",
                1.0,
                vec![
                    key(0, 0.0, Mat4::IDENTITY),
                    key(1, 0.0, Mat4::IDENTITY),
                    key(0, 0.25, translation(1.0)),
                    key(0, 0.5, translation(2.0)),
                    key(1, 0.5, Mat4::from_quat(Quat::from_rotation_z(0.5))),
                    key(0, 0.75, translation(3.0)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn unbound_controller_rejects_advance() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        assert!(!controller.is_playing());
        assert_eq!(controller.advance(0.1, true, Mat4::IDENTITY), Err(AnimationError::NotStarted));
        assert_eq!(controller.start_clip(None), Err(AnimationError::NullClip));
        assert!(!controller.is_playing());
    }

    #[test]
    fn arrays_match_bone_count() {
        let controller = AnimationController::new(two_bone_skeleton());
        assert_eq!(controller.bone_transforms().len(), 2);
        assert_eq!(controller.world_transforms().len(), 2);
        assert_eq!(controller.skin_transforms().len(), 2);
        assert_eq!(controller.skin_palette(), vec![BoneMat34::default(); 2]);
    }

    #[test]
    fn hierarchy_propagation() {
        let clip = AnimationClip::new(
            "lift",
            1.0,
            vec![key(0, 0.0, translation(4.0)), key(1, 0.0, Mat4::IDENTITY)],
        )
        .unwrap();
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(Arc::new(clip))).unwrap();
        controller.advance(0.0, false, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.world_transforms()[1], translation(4.0));
        assert_eq!(controller.skin_transforms()[1], translation(4.0));
    }

    #[test]
    fn root_transform_is_applied_first() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(walk())).unwrap();
        let root = Mat4::from_scale(Vec3::splat(2.0));
        controller.advance(0.3, false, root).unwrap();
        let tip = controller.world_transforms()[1] * Vec4::W;
        assert!(tip.abs_diff_eq(Vec4::new(2.0, 0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn last_keyframe_wins_without_interpolation() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(walk())).unwrap();
        controller.advance(0.26, false, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.bone_transforms()[0], translation(1.0));
        assert_eq!(controller.keyframe_cursor(), 3);

        let before = controller.bone_transforms().to_vec();
        for _ in 0..10 {
            controller.advance(0.02, true, Mat4::IDENTITY).unwrap();
            assert_eq!(controller.bone_transforms(), before.as_slice());
        }
        assert_eq!(controller.keyframe_cursor(), 3);

        controller.advance(0.1, true, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.bone_transforms()[0], translation(2.0));
        assert_eq!(controller.keyframe_cursor(), 5);
    }

    #[test]
    fn looping_closes_the_cycle() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        let clip = walk();
        controller.start_clip(Some(clip.clone())).unwrap();
        let after_start = controller.bone_transforms().to_vec();

        controller.advance(clip.duration(), true, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.current_time(), 0.0);
        assert_eq!(controller.bone_transforms(), after_start.as_slice());
    }

    #[test]
    fn loop_replays_first_frame_over_a_non_bind_pose() {
        let skeleton = Arc::new(
            SkeletonPose::new(
                vec!["root".to_string()],
                vec![translation(1.0)],
                vec![translation(-1.0)],
                vec![None],
            )
            .unwrap(),
        );
        let clip = Arc::new(
            AnimationClip::new(
                "chop",
                1.0,
                vec![key(0, 0.0, translation(5.0)), key(0, 0.5, translation(6.0))],
            )
            .unwrap(),
        );

        // starting leaves the bind pose; the t = 0 keyframe lands on the first advance
        let mut controller = AnimationController::new(skeleton);
        controller.start_clip(Some(clip.clone())).unwrap();
        assert_eq!(controller.bone_transforms()[0], translation(1.0));
        controller.advance(0.0, false, Mat4::IDENTITY).unwrap();
        let first_frame = controller.bone_transforms().to_vec();
        assert_eq!(first_frame[0], translation(5.0));

        controller.advance(0.5, true, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.bone_transforms()[0], translation(6.0));

        // wrapping to t = 0 resets to bind and replays the t = 0 keyframe
        controller.advance(0.5, true, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.current_time(), 0.0);
        assert_eq!(controller.keyframe_cursor(), 1);
        assert_eq!(controller.bone_transforms(), first_frame.as_slice());

        // a full cycle straight after starting lands on the same first frame
        controller.start_clip(Some(clip.clone())).unwrap();
        controller.advance(clip.duration(), true, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.bone_transforms(), first_frame.as_slice());
        assert_ne!(controller.bone_transforms()[0], translation(1.0));
    }

    #[test]
    fn wrapping_past_the_end_replays_from_bind_pose() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(walk())).unwrap();
        controller.advance(0.8, true, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.bone_transforms()[0], translation(3.0));
        assert_eq!(controller.keyframe_cursor(), 6);

        controller.advance(0.3, true, Mat4::IDENTITY).unwrap();
        assert!((controller.current_time() - 0.1).abs() < 1e-5);
        assert_eq!(controller.bone_transforms()[0], Mat4::IDENTITY);
        assert_eq!(controller.bone_transforms()[1], Mat4::IDENTITY);
        assert_eq!(controller.keyframe_cursor(), 2);
    }

    #[test]
    fn absolute_seek_backwards_resets() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(walk())).unwrap();
        controller.advance(0.6, false, Mat4::IDENTITY).unwrap();
        controller.advance(0.3, false, Mat4::IDENTITY).unwrap();
        assert_eq!(controller.bone_transforms()[0], translation(1.0));
        assert_eq!(controller.bone_transforms()[1], Mat4::IDENTITY);
    }

    #[test]
    fn out_of_range_times() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(walk())).unwrap();
        assert!(matches!(
            controller.advance(1.0, false, Mat4::IDENTITY),
            Err(AnimationError::OutOfRange { .. })
        ));
        assert!(matches!(
            controller.advance(-0.1, false, Mat4::IDENTITY),
            Err(AnimationError::OutOfRange { .. })
        ));
        assert!(matches!(
            controller.advance(-0.5, true, Mat4::IDENTITY),
            Err(AnimationError::OutOfRange { .. })
        ));
        assert!(matches!(
            controller.advance(f32::INFINITY, true, Mat4::IDENTITY),
            Err(AnimationError::OutOfRange { .. })
        ));
        assert!(matches!(
            controller.advance(f32::NAN, false, Mat4::IDENTITY),
            Err(AnimationError::OutOfRange { .. })
        ));
        // failed calls leave playback where it was
        assert_eq!(controller.current_time(), 0.0);
    }

    #[test]
    fn restarting_resets_state() {
        let mut controller = AnimationController::new(two_bone_skeleton());
        controller.start_clip(Some(walk())).unwrap();
        controller.advance(0.7, false, Mat4::IDENTITY).unwrap();
        controller.start_clip(Some(walk())).unwrap();
        assert_eq!(controller.current_time(), 0.0);
        assert_eq!(controller.keyframe_cursor(), 0);
        assert_eq!(controller.bone_transforms(), &[Mat4::IDENTITY; 2]);
    }

    #[test]
    fn clip_for_a_bigger_skeleton_is_rejected() {
        let clip = AnimationClip::new("wave", 1.0, vec![key(5, 0.0, Mat4::IDENTITY)]).unwrap();
        let mut controller = AnimationController::new(two_bone_skeleton());
        assert!(matches!(
            controller.start_clip(Some(Arc::new(clip))),
            Err(AnimationError::SkeletonMismatch { bone: 5, bone_count: 2, .. })
        ));
    }

    #[test]
    fn skin_uses_inverse_bind_pose() {
        let bind = vec![translation(1.0), translation(2.0)];
        let inverse = vec![translation(-1.0), translation(-3.0)];
        let skeleton = Arc::new(
            SkeletonPose::new(
                vec!["a".to_string(), "b".to_string()],
                bind,
                inverse,
                vec![None, Some(0)],
            )
            .unwrap(),
        );
        let controller = AnimationController::new(skeleton);
        // bind pose in, identity skin out
        for skin in controller.skin_transforms() {
            assert!(skin.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        }
    }

    #[test]
    fn palette_rows_carry_translation() {
        let palette = BoneMat34::from(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            palette.mat,
            [[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 2.0], [0.0, 0.0, 1.0, 3.0]]
        );
        assert_eq!(bytemuck::bytes_of(&palette).len(), 48);
    }
}
