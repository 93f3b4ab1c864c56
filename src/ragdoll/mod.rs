//! Switching between the animated skeleton and a physical ragdoll.
//!
//! A character carries two skeletons: the animated one the host's animation
//! graph poses, and a physical one made of jointed rigid bodies. Only one is
//! shown at a time. In plain ragdoll mode the joints go limp. In active
//! ragdoll mode every joint servos toward the animated pose each physics
//! step, so the body fights to keep playing the animation.

mod rig;

pub use rig::{
    JointDrive, JointFrame, ModelActive, RagdollBinding, RagdollJoint, RagdollRig, WorldRagdollRig,
};

use bevy::prelude::*;

use crate::animation::{AnimationParameters, HURT_AMOUNT, RAGDOLL};
use crate::config::{sanitize_fraction, RagdollConfig};

/// The bones that carry ragdoll joints.
///
/// Variants are ordered parents first, so walking [`RagdollBone::ALL`] never
/// visits a bone before the bone it hangs from.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RagdollBone {
    Spine,
    Chest,
    Neck,
    Head,
    LeftUpperArm,
    LeftLowerArm,
    RightUpperArm,
    RightLowerArm,
    LeftUpperLeg,
    LeftLowerLeg,
    RightUpperLeg,
    RightLowerLeg,
}

impl RagdollBone {
    pub const COUNT: usize = 12;

    pub const ALL: [RagdollBone; Self::COUNT] = [
        RagdollBone::Spine,
        RagdollBone::Chest,
        RagdollBone::Neck,
        RagdollBone::Head,
        RagdollBone::LeftUpperArm,
        RagdollBone::LeftLowerArm,
        RagdollBone::RightUpperArm,
        RagdollBone::RightLowerArm,
        RagdollBone::LeftUpperLeg,
        RagdollBone::LeftLowerLeg,
        RagdollBone::RightUpperLeg,
        RagdollBone::RightLowerLeg,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One optional value per [`RagdollBone`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneMap<T>([Option<T>; RagdollBone::COUNT]);

impl<T> Default for BoneMap<T> {
    fn default() -> Self {
        Self(std::array::from_fn(|_| None))
    }
}

impl<T> BoneMap<T> {
    pub fn get(&self, bone: RagdollBone) -> Option<&T> {
        self.0[bone.index()].as_ref()
    }

    pub fn insert(&mut self, bone: RagdollBone, value: T) -> Option<T> {
        self.0[bone.index()].replace(value)
    }

    pub fn with(mut self, bone: RagdollBone, value: T) -> Self {
        self.insert(bone, value);
        self
    }

    pub fn contains(&self, bone: RagdollBone) -> bool {
        self.0[bone.index()].is_some()
    }

    /// Mapped bones, parents first.
    pub fn iter(&self) -> impl Iterator<Item = (RagdollBone, &T)> {
        RagdollBone::ALL
            .into_iter()
            .filter_map(|bone| self.get(bone).map(|value| (bone, value)))
    }
}

/// Which skeleton owns the pose.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimatorState {
    Ragdoll,
    ActiveRagdoll,
    Animated,
    /// Not yet initialised.
    #[default]
    None,
}

/// Per-character ragdoll state machine.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct RagdollBlend {
    state: AnimatorState,
    #[reflect(ignore)]
    rest: BoneMap<Quat>,
}

impl RagdollBlend {
    pub fn state(&self) -> AnimatorState {
        self.state
    }

    /// Rest local rotation captured for `bone`, if it has a joint.
    pub fn rest_rotation(&self, bone: RagdollBone) -> Option<Quat> {
        self.rest.get(bone).copied()
    }

    /// Capture every jointed bone's rest rotation once and settle into
    /// `Animated`. Later calls do nothing.
    pub fn initialize(&mut self, rig: &mut dyn RagdollRig, params: &mut AnimationParameters) {
        if self.state != AnimatorState::None {
            return;
        }
        for bone in RagdollBone::ALL {
            if rig.joint_frame(bone).is_none() {
                continue;
            }
            if let Some(rest) = rig.physical_local_rotation(bone) {
                self.rest.insert(bone, rest);
            }
        }
        self.end_ragdoll(rig, params);
    }

    /// Go limp. Only from `Animated`; returns whether the switch happened.
    pub fn begin_ragdoll(
        &mut self,
        rig: &mut dyn RagdollRig,
        params: &mut AnimationParameters,
    ) -> bool {
        self.begin(rig, params, AnimatorState::Ragdoll, 0.0, 1.0)
    }

    /// Hand the pose to the physical skeleton with joints servoing toward
    /// the animation. Only from `Animated`.
    pub fn begin_active_ragdoll(
        &mut self,
        rig: &mut dyn RagdollRig,
        params: &mut AnimationParameters,
        config: &RagdollConfig,
    ) -> bool {
        let strength = config.active_strength.max(0.0);
        self.begin(rig, params, AnimatorState::ActiveRagdoll, strength, 0.0)
    }

    fn begin(
        &mut self,
        rig: &mut dyn RagdollRig,
        params: &mut AnimationParameters,
        next: AnimatorState,
        max_force: f32,
        hurt: f32,
    ) -> bool {
        if self.state != AnimatorState::Animated {
            debug!("ignoring {next:?} request while {:?}", self.state);
            return false;
        }
        match_pose(rig, 1.0);
        rig.set_model_visibility(false, true);
        for bone in RagdollBone::ALL {
            if rig.joint_frame(bone).is_some() {
                rig.set_joint_max_force(bone, max_force);
            }
        }
        self.state = next;
        params.set_float(HURT_AMOUNT, hurt);
        params.set_bool(RAGDOLL, true);
        info!("animator {:?} -> {next:?}", AnimatorState::Animated);
        true
    }

    /// Back to the animated skeleton. Does nothing while already `Animated`.
    pub fn end_ragdoll(&mut self, rig: &mut dyn RagdollRig, params: &mut AnimationParameters) {
        if self.state == AnimatorState::Animated {
            return;
        }
        rig.set_model_visibility(true, false);
        params.set_bool(RAGDOLL, false);
        info!("animator {:?} -> {:?}", self.state, AnimatorState::Animated);
        self.state = AnimatorState::Animated;
    }

    /// Per physics step: point every joint of an active ragdoll at the
    /// animated bone's local rotation. Bones without a joint, a rest
    /// rotation or an animated counterpart are skipped.
    pub fn servo(&self, rig: &mut dyn RagdollRig, config: &RagdollConfig) {
        if self.state != AnimatorState::ActiveRagdoll || !config.use_active_ragdoll {
            return;
        }
        for (bone, rest) in self.rest.iter() {
            let (Some(frame), Some(animated)) =
                (rig.joint_frame(bone), rig.animated_local_rotation(bone))
            else {
                continue;
            };
            let target = joint_target_rotation(frame, animated, *rest);
            rig.set_joint_target(bone, target, animated);
        }
    }
}

/// Copy the animated pose onto the physical skeleton, blended by `weight`.
///
/// The body goes first, then each bone parents first. Bones missing on
/// either skeleton are skipped.
pub fn match_pose(rig: &mut dyn RagdollRig, weight: f32) {
    let weight = sanitize_fraction(weight);
    if let (Some(animated), Some(physical)) = (rig.animated_body(), rig.physical_body()) {
        rig.set_physical_body(
            physical.translation.lerp(animated.translation, weight),
            physical.rotation.slerp(animated.rotation, weight),
        );
    }
    for bone in RagdollBone::ALL {
        let (Some(animated), Some(physical)) = (rig.animated_bone(bone), rig.physical_bone(bone))
        else {
            continue;
        };
        rig.set_physical_bone(
            bone,
            physical.translation.lerp(animated.translation, weight),
            physical.rotation.slerp(animated.rotation, weight),
        );
    }
}

/// Joint-space target rotation that makes a joint hold `target_local`,
/// given the bone's local rotation `rest_local` when the joint was built.
///
/// The joint frame has `axis` as its primary axis and `secondary_axis` as
/// its second. A degenerate frame falls back to the bone's own axes.
pub fn joint_target_rotation(frame: JointFrame, target_local: Quat, rest_local: Quat) -> Quat {
    let to_joint = frame.basis();
    (to_joint.inverse() * target_local.inverse() * rest_local * to_joint).normalize()
}
