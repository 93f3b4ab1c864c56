//! Avian3D physics backend implementation.
//!
//! This module provides the physics backend for Avian3D (`avian3d`).
//! Enable with the `avian3d` feature.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::detection::{CollisionMask, SensorCast};
use crate::ragdoll::{JointDrive, ModelActive};
use crate::LocomotionSet;

/// Avian3D physics backend for the locomotion systems.
///
/// Scene queries go through avian's [`SpatialQueryPipeline`] resource, so
/// they see colliders as of the last physics step. Body sweeps use the
/// character's own [`Collider`].
pub struct Avian3dBackend;

/// Gains of the PD servo that pulls joints toward their drive targets.
#[derive(Resource, Reflect, Debug, Clone, Copy)]
#[reflect(Resource)]
pub struct JointDriveGains {
    /// Angular acceleration per radian of error.
    pub stiffness: f32,
    /// Angular acceleration per radian/second of relative spin.
    pub damping: f32,
}

impl Default for JointDriveGains {
    fn default() -> Self {
        Self {
            stiffness: 600.0,
            damping: 40.0,
        }
    }
}

fn filter(mask: CollisionMask, exclude: Entity) -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask(LayerMask(mask.0)).with_excluded_entities([exclude])
}

fn pipeline(world: &World) -> Option<&SpatialQueryPipeline> {
    world.get_resource::<SpatialQueryPipeline>()
}

/// Cast `shape` and convert the hit. The hit point is the contact on the
/// struck collider.
fn cast_collider(
    world: &World,
    shape: &Collider,
    origin: Vec3,
    rotation: Quat,
    direction: Vec3,
    max_distance: f32,
    filter: &SpatialQueryFilter,
) -> SensorCast {
    let (Some(pipeline), Ok(direction)) = (pipeline(world), Dir3::new(direction)) else {
        return SensorCast::miss();
    };
    let config = ShapeCastConfig {
        ignore_origin_penetration: true,
        ..ShapeCastConfig::from_max_distance(max_distance)
    };
    pipeline
        .cast_shape(shape, origin, rotation, direction, &config, filter)
        .map(|hit| SensorCast::hit(hit.distance, hit.normal1, hit.point1, Some(hit.entity)))
        .unwrap_or_default()
}

impl CharacterPhysicsBackend for Avian3dBackend {
    fn plugin() -> impl Plugin {
        Avian3dBackendPlugin
    }

    fn cast_ray(
        world: &World,
        exclude: Entity,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast {
        let (Some(pipeline), Ok(dir)) = (pipeline(world), Dir3::new(direction)) else {
            return SensorCast::miss();
        };
        pipeline
            .cast_ray(origin, dir, max_distance, true, &filter(mask, exclude))
            .map(|hit| {
                let point = origin + *dir * hit.distance;
                SensorCast::hit(hit.distance, hit.normal, point, Some(hit.entity))
            })
            .unwrap_or_default()
    }

    fn cast_sphere(
        world: &World,
        exclude: Entity,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast {
        cast_collider(
            world,
            &Collider::sphere(radius.max(f32::EPSILON)),
            origin,
            Quat::IDENTITY,
            direction,
            max_distance,
            &filter(mask, exclude),
        )
    }

    fn overlap_box(
        world: &World,
        exclude: Entity,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: CollisionMask,
    ) -> usize {
        let Some(pipeline) = pipeline(world) else {
            return 0;
        };
        let size = half_extents.abs() * 2.0;
        let shape = Collider::cuboid(size.x, size.y, size.z);
        pipeline
            .shape_intersections(&shape, center, rotation, &filter(mask, exclude))
            .len()
    }

    fn overlap_sphere(
        world: &World,
        exclude: Entity,
        center: Vec3,
        radius: f32,
        mask: CollisionMask,
    ) -> usize {
        let Some(pipeline) = pipeline(world) else {
            return 0;
        };
        let shape = Collider::sphere(radius.max(f32::EPSILON));
        pipeline
            .shape_intersections(&shape, center, Quat::IDENTITY, &filter(mask, exclude))
            .len()
    }

    fn sweep_body(
        world: &World,
        entity: Entity,
        direction: Vec3,
        distance: f32,
        mask: CollisionMask,
    ) -> SensorCast {
        let Some(collider) = world.get::<Collider>(entity) else {
            return SensorCast::miss();
        };
        let rotation = world
            .get::<Rotation>(entity)
            .map(|r| r.0)
            .or_else(|| world.get::<Transform>(entity).map(|t| t.rotation))
            .unwrap_or(Quat::IDENTITY);
        cast_collider(
            world,
            collider,
            Self::get_position(world, entity),
            rotation,
            direction,
            distance,
            &filter(mask, entity),
        )
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        // Position is the physics-authoritative value once avian has run.
        if let Some(position) = world.get::<Position>(entity) {
            return position.0;
        }
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut current) = world.get_mut::<Position>(entity) {
            current.0 = position;
        }
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<LinearVelocity>(entity)
            .map(|v| v.0)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<LinearVelocity>(entity) {
            vel.0 = velocity;
        }
    }

    fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool) {
        let Some(body) = world.get::<RigidBody>(entity).copied() else {
            return;
        };
        if kinematic {
            if body != RigidBody::Kinematic {
                world.entity_mut(entity).insert(RigidBody::Kinematic);
            }
            // Kinematic bodies still integrate their velocity.
            Self::set_velocity(world, entity, Vec3::ZERO);
        } else if body == RigidBody::Kinematic {
            world.entity_mut(entity).insert(RigidBody::Dynamic);
        }
    }

    fn get_gravity(world: &World, entity: Entity) -> Vec3 {
        let gravity = world
            .get_resource::<Gravity>()
            .map(|g| g.0)
            .unwrap_or(Vec3::ZERO);
        let scale = world.get::<GravityScale>(entity).map(|s| s.0).unwrap_or(1.0);
        gravity * scale
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Plugin that sets up Avian3D-specific systems for the locomotion systems.
pub struct Avian3dBackendPlugin;

impl Plugin for Avian3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<JointDriveGains>();
        app.init_resource::<JointDriveGains>();

        // Joint targets are written in Servo; drive them before the physics
        // step of the same tick.
        app.add_systems(
            FixedUpdate,
            apply_joint_drives.after(LocomotionSet::Servo),
        );
        app.add_systems(Update, sync_model_activity);
    }
}

/// Pull every driven joint toward its target with a clamped PD correction
/// of its angular velocity.
pub fn apply_joint_drives(
    time: Res<Time>,
    gains: Res<JointDriveGains>,
    parents: Query<&GlobalTransform>,
    mut joints: Query<(&JointDrive, &GlobalTransform, &mut AngularVelocity, Option<&ChildOf>)>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    for (drive, transform, mut angular_velocity, child_of) in &mut joints {
        if drive.max_force <= 0.0 {
            continue;
        }
        let parent_rotation = child_of
            .and_then(|c| parents.get(c.parent()).ok())
            .map(|t| t.rotation())
            .unwrap_or(Quat::IDENTITY);
        let desired = parent_rotation * drive.target_local_rotation;
        let current = transform.rotation();

        let (axis, mut angle) = (desired * current.inverse()).to_axis_angle();
        if angle > std::f32::consts::PI {
            angle -= std::f32::consts::TAU;
        }
        let error = if angle.is_finite() { axis * angle } else { Vec3::ZERO };

        let acceleration = error * gains.stiffness - angular_velocity.0 * gains.damping;
        let correction = (acceleration * dt).clamp_length_max(drive.max_force * dt);
        angular_velocity.0 += correction;
    }
}

/// Disable the rigid bodies of inactive models and wake those of active
/// ones.
pub fn sync_model_activity(
    mut commands: Commands,
    models: Query<(Entity, &ModelActive), Changed<ModelActive>>,
    children: Query<&Children>,
    bodies: Query<(), With<RigidBody>>,
) {
    for (model, active) in &models {
        let descendants = std::iter::once(model).chain(children.iter_descendants(model));
        for entity in descendants.filter(|e| bodies.contains(*e)) {
            if active.0 {
                commands.entity(entity).remove::<RigidBodyDisabled>();
            } else {
                commands.entity(entity).insert(RigidBodyDisabled);
            }
        }
    }
}
