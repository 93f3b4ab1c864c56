//! The two skeletons a ragdoll blend reads and writes.

use bevy::prelude::*;

use crate::config::RagdollConfig;
use crate::error::LocomotionError;
use crate::hierarchy::{set_world_pose, world_transform};

use super::{BoneMap, RagdollBlend, RagdollBone};

/// Orientation of a joint relative to its bone: `axis` is the joint's
/// primary axis, `secondary_axis` its second.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct JointFrame {
    pub axis: Vec3,
    pub secondary_axis: Vec3,
}

impl Default for JointFrame {
    fn default() -> Self {
        Self {
            axis: Vec3::X,
            secondary_axis: Vec3::Y,
        }
    }
}

impl JointFrame {
    /// Rotation from joint space into bone space. Identity when the axes
    /// are zero or parallel.
    pub fn basis(&self) -> Quat {
        let right = self.axis;
        let Some(forward) = right.cross(self.secondary_axis).try_normalize() else {
            return Quat::IDENTITY;
        };
        let Some(up) = forward.cross(right).try_normalize() else {
            return Quat::IDENTITY;
        };
        let Some(x) = up.cross(forward).try_normalize() else {
            return Quat::IDENTITY;
        };
        Quat::from_mat3(&Mat3::from_cols(x, forward.cross(x), forward))
    }
}

/// Access to the animated and physical skeletons of one character.
///
/// Getters return `None` for bones the rig does not have; callers skip
/// those bones.
pub trait RagdollRig {
    /// World pose of the animated body (hips).
    fn animated_body(&self) -> Option<Transform>;
    /// World pose of the physical body (pelvis).
    fn physical_body(&self) -> Option<Transform>;
    fn set_physical_body(&mut self, position: Vec3, rotation: Quat);

    /// World pose of an animated bone.
    fn animated_bone(&self, bone: RagdollBone) -> Option<Transform>;
    /// World pose of a physical bone.
    fn physical_bone(&self, bone: RagdollBone) -> Option<Transform>;
    fn set_physical_bone(&mut self, bone: RagdollBone, position: Vec3, rotation: Quat);

    /// Rotation of an animated bone relative to its parent.
    fn animated_local_rotation(&self, bone: RagdollBone) -> Option<Quat>;
    /// Rotation of a physical bone relative to its parent.
    fn physical_local_rotation(&self, bone: RagdollBone) -> Option<Quat>;

    /// Frame of the joint driving `bone`, `None` if it has none.
    fn joint_frame(&self, bone: RagdollBone) -> Option<JointFrame>;
    fn set_joint_max_force(&mut self, bone: RagdollBone, force: f32);
    /// Set a joint's drive target, both in joint space and as the parent
    /// relative rotation it stands for.
    fn set_joint_target(&mut self, bone: RagdollBone, target: Quat, local: Quat);

    fn set_model_visibility(&mut self, animated: bool, physical: bool);
}

/// Whether a model is the one currently in use. Physics backends keep the
/// bodies of an inactive model asleep; hosts map it onto visibility.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub struct ModelActive(pub bool);

impl Default for ModelActive {
    fn default() -> Self {
        Self(true)
    }
}

/// Joint of a physical bone, placed on the bone's entity.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
#[require(JointDrive)]
pub struct RagdollJoint {
    pub frame: JointFrame,
}

/// Drive state of a joint, written by the blend and read by the physics
/// backend.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct JointDrive {
    /// Target in joint space, relative to the rest pose.
    pub target_rotation: Quat,
    /// The parent-relative rotation the target stands for.
    pub target_local_rotation: Quat,
    /// Force limit. Zero leaves the joint limp.
    pub max_force: f32,
}

impl Default for JointDrive {
    fn default() -> Self {
        Self {
            target_rotation: Quat::IDENTITY,
            target_local_rotation: Quat::IDENTITY,
            max_force: 0.0,
        }
    }
}

/// Entities of both skeletons of a character.
#[derive(Component, Debug, Clone)]
#[require(RagdollBlend, RagdollConfig)]
pub struct RagdollBinding {
    pub animated_model: Entity,
    pub physical_model: Entity,
    pub animated_body: Entity,
    pub physical_body: Entity,
    pub animated_bones: BoneMap<Entity>,
    pub physical_bones: BoneMap<Entity>,
}

impl RagdollBinding {
    /// Check that every bound entity exists with a `Transform`.
    pub fn validate(&self, world: &World) -> Result<(), LocomotionError> {
        let models = [
            self.animated_model,
            self.physical_model,
            self.animated_body,
            self.physical_body,
        ];
        let bones = self
            .animated_bones
            .iter()
            .chain(self.physical_bones.iter())
            .map(|(_, entity)| *entity);
        for entity in models.into_iter().chain(bones) {
            if world.get::<Transform>(entity).is_none() {
                return Err(LocomotionError::MissingComponent {
                    entity,
                    component: "Transform",
                });
            }
        }
        Ok(())
    }
}

/// [`RagdollRig`] over skeleton entities in the world.
pub struct WorldRagdollRig<'w> {
    world: &'w mut World,
    binding: RagdollBinding,
}

impl<'w> WorldRagdollRig<'w> {
    pub fn new(world: &'w mut World, binding: RagdollBinding) -> Self {
        Self { world, binding }
    }

    fn animated(&self, bone: RagdollBone) -> Option<Entity> {
        self.binding.animated_bones.get(bone).copied()
    }

    fn physical(&self, bone: RagdollBone) -> Option<Entity> {
        self.binding.physical_bones.get(bone).copied()
    }

    fn local_rotation(&self, entity: Entity) -> Option<Quat> {
        self.world.get::<Transform>(entity).map(|t| t.rotation)
    }

    fn set_active(&mut self, model: Entity, active: bool) {
        if let Ok(mut entity) = self.world.get_entity_mut(model) {
            entity.insert(ModelActive(active));
        }
    }
}

impl RagdollRig for WorldRagdollRig<'_> {
    fn animated_body(&self) -> Option<Transform> {
        world_transform(self.world, self.binding.animated_body)
    }

    fn physical_body(&self) -> Option<Transform> {
        world_transform(self.world, self.binding.physical_body)
    }

    fn set_physical_body(&mut self, position: Vec3, rotation: Quat) {
        set_world_pose(self.world, self.binding.physical_body, position, rotation);
    }

    fn animated_bone(&self, bone: RagdollBone) -> Option<Transform> {
        world_transform(self.world, self.animated(bone)?)
    }

    fn physical_bone(&self, bone: RagdollBone) -> Option<Transform> {
        world_transform(self.world, self.physical(bone)?)
    }

    fn set_physical_bone(&mut self, bone: RagdollBone, position: Vec3, rotation: Quat) {
        if let Some(entity) = self.physical(bone) {
            set_world_pose(self.world, entity, position, rotation);
        }
    }

    fn animated_local_rotation(&self, bone: RagdollBone) -> Option<Quat> {
        self.local_rotation(self.animated(bone)?)
    }

    fn physical_local_rotation(&self, bone: RagdollBone) -> Option<Quat> {
        self.local_rotation(self.physical(bone)?)
    }

    fn joint_frame(&self, bone: RagdollBone) -> Option<JointFrame> {
        let joint = self.world.get::<RagdollJoint>(self.physical(bone)?)?;
        Some(joint.frame)
    }

    fn set_joint_max_force(&mut self, bone: RagdollBone, force: f32) {
        let Some(entity) = self.physical(bone) else {
            return;
        };
        if let Some(mut drive) = self.world.get_mut::<JointDrive>(entity) {
            drive.max_force = force;
        }
    }

    fn set_joint_target(&mut self, bone: RagdollBone, target: Quat, local: Quat) {
        let Some(entity) = self.physical(bone) else {
            return;
        };
        if let Some(mut drive) = self.world.get_mut::<JointDrive>(entity) {
            drive.target_rotation = target;
            drive.target_local_rotation = local;
        }
    }

    fn set_model_visibility(&mut self, animated: bool, physical: bool) {
        self.set_active(self.binding.animated_model, animated);
        self.set_active(self.binding.physical_model, physical);
    }
}
