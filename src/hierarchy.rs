//! World-space transforms computed straight from the hierarchy.
//!
//! IK and ragdoll passes run between animation and transform propagation,
//! where `GlobalTransform` is a frame stale. These helpers compose local
//! `Transform`s up the `ChildOf` chain instead.

use bevy::prelude::*;

/// Guards against cycles in malformed hierarchies.
const MAX_DEPTH: usize = 64;

/// World transform of `entity`, or `None` if it has no `Transform`.
pub fn world_transform(world: &World, entity: Entity) -> Option<Transform> {
    let mut result = *world.get::<Transform>(entity)?;
    let mut current = entity;
    for _ in 0..MAX_DEPTH {
        let Some(parent) = world.get::<ChildOf>(current).map(ChildOf::parent) else {
            break;
        };
        let Some(parent_transform) = world.get::<Transform>(parent) else {
            break;
        };
        result = parent_transform.mul_transform(result);
        current = parent;
    }
    Some(result)
}

/// World transform of the parent of `entity`, identity at the root.
pub fn parent_world_transform(world: &World, entity: Entity) -> Transform {
    world
        .get::<ChildOf>(entity)
        .and_then(|child_of| world_transform(world, child_of.parent()))
        .unwrap_or(Transform::IDENTITY)
}

/// Move `entity` so its world position and rotation match `target`,
/// keeping its local scale.
pub fn set_world_pose(world: &mut World, entity: Entity, position: Vec3, rotation: Quat) {
    let parent = parent_world_transform(world, entity);
    let Some(mut transform) = world.get_mut::<Transform>(entity) else {
        return;
    };
    let inverse_rotation = parent.rotation.inverse();
    let local = inverse_rotation * (position - parent.translation);
    transform.translation = local / parent.scale;
    transform.rotation = (inverse_rotation * rotation).normalize();
}
