//! Backend for worlds without a physics engine.
//!
//! Every query misses and moves are applied straight to [`Transform`].
//! Velocity lives in a [`NoOpBody`] component and is never integrated, which
//! keeps headless hosts and tests fully deterministic.

use bevy::prelude::*;

use super::CharacterPhysicsBackend;
use crate::detection::{CollisionMask, SensorCast};

/// Gravity reported by [`NoOpBackend`].
pub const NOOP_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Velocity bookkeeping for characters driven by [`NoOpBackend`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct NoOpBody {
    pub velocity: Vec3,
    pub kinematic: bool,
}

pub struct NoOpBackend;

impl CharacterPhysicsBackend for NoOpBackend {
    fn plugin() -> impl Plugin {
        NoOpBackendPlugin
    }

    fn cast_ray(
        _world: &World,
        _exclude: Entity,
        _origin: Vec3,
        _direction: Vec3,
        _max_distance: f32,
        _mask: CollisionMask,
    ) -> SensorCast {
        SensorCast::miss()
    }

    fn cast_sphere(
        _world: &World,
        _exclude: Entity,
        _origin: Vec3,
        _direction: Vec3,
        _radius: f32,
        _max_distance: f32,
        _mask: CollisionMask,
    ) -> SensorCast {
        SensorCast::miss()
    }

    fn overlap_box(
        _world: &World,
        _exclude: Entity,
        _center: Vec3,
        _half_extents: Vec3,
        _rotation: Quat,
        _mask: CollisionMask,
    ) -> usize {
        0
    }

    fn overlap_sphere(
        _world: &World,
        _exclude: Entity,
        _center: Vec3,
        _radius: f32,
        _mask: CollisionMask,
    ) -> usize {
        0
    }

    fn sweep_body(
        _world: &World,
        _entity: Entity,
        _direction: Vec3,
        _distance: f32,
        _mask: CollisionMask,
    ) -> SensorCast {
        SensorCast::miss()
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<NoOpBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<NoOpBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool) {
        if let Some(mut body) = world.get_mut::<NoOpBody>(entity) {
            body.kinematic = kinematic;
        }
    }

    fn get_gravity(_world: &World, _entity: Entity) -> Vec3 {
        NOOP_GRAVITY
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<NoOpBody>();
    }
}
