//! Physics backend abstraction.
//!
//! The locomotion systems never talk to a physics engine directly. They go
//! through [`CharacterPhysicsBackend`], a set of static functions over the
//! [`World`], so engines can be swapped behind a cargo feature. Pure solvers
//! see an even smaller surface: [`CollisionQuery`] and [`BodySweep`], which
//! are easy to mock in unit tests.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::detection::{CollisionMask, SensorCast};

/// Scene queries against static and dynamic colliders.
///
/// Directions are expected to be normalized. Every query returns a miss
/// rather than failing.
pub trait CollisionQuery {
    /// Cast a ray and report the first hit within `max_distance`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast;

    /// Sweep a sphere and report the first hit within `max_distance`.
    fn cast_sphere(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast;

    /// Count colliders overlapping an oriented box.
    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: CollisionMask,
    ) -> usize;

    /// Count colliders overlapping a sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: CollisionMask) -> usize;
}

/// Sweep of the character's own collision volume.
pub trait BodySweep {
    /// Report the first obstruction when moving the body `distance` along
    /// `direction`. Hit distances are in world units.
    fn sweep(&self, direction: Vec3, distance: f32) -> SensorCast;
}

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the locomotion
/// systems. Queries exclude the querying character's own colliders.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    fn cast_ray(
        world: &World,
        exclude: Entity,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast;

    fn cast_sphere(
        world: &World,
        exclude: Entity,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast;

    fn overlap_box(
        world: &World,
        exclude: Entity,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: CollisionMask,
    ) -> usize;

    fn overlap_sphere(
        world: &World,
        exclude: Entity,
        center: Vec3,
        radius: f32,
        mask: CollisionMask,
    ) -> usize;

    /// Sweep the body of `entity` along `direction`.
    fn sweep_body(
        world: &World,
        entity: Entity,
        direction: Vec3,
        distance: f32,
        mask: CollisionMask,
    ) -> SensorCast;

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Teleport an entity. Used by the movement solver, which has already
    /// resolved collisions.
    fn set_position(world: &mut World, entity: Entity, position: Vec3);

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an instantaneous velocity change, independent of mass.
    fn apply_velocity_change(world: &mut World, entity: Entity, delta: Vec3) {
        let velocity = Self::get_velocity(world, entity);
        Self::set_velocity(world, entity, velocity + delta);
    }

    /// Apply an acceleration over one step of length `dt`, independent of
    /// mass.
    fn apply_acceleration(world: &mut World, entity: Entity, acceleration: Vec3, dt: f32) {
        Self::apply_velocity_change(world, entity, acceleration * dt);
    }

    /// Freeze (`true`) or release (`false`) the body.
    fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool);

    /// Get the gravity vector affecting an entity.
    fn get_gravity(world: &World, entity: Entity) -> Vec3;

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 64.0)
    }
}

/// Adapter exposing a backend as [`CollisionQuery`] and [`BodySweep`] for one
/// character.
pub struct BackendQuery<'w, B: CharacterPhysicsBackend> {
    world: &'w World,
    entity: Entity,
    sweep_mask: CollisionMask,
    _backend: PhantomData<B>,
}

impl<'w, B: CharacterPhysicsBackend> BackendQuery<'w, B> {
    pub fn new(world: &'w World, entity: Entity) -> Self {
        Self {
            world,
            entity,
            sweep_mask: CollisionMask::ALL,
            _backend: PhantomData,
        }
    }

    /// Layers the body sweep collides with.
    pub fn with_sweep_mask(mut self, mask: CollisionMask) -> Self {
        self.sweep_mask = mask;
        self
    }
}

impl<B: CharacterPhysicsBackend> CollisionQuery for BackendQuery<'_, B> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast {
        B::cast_ray(self.world, self.entity, origin, direction, max_distance, mask)
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> SensorCast {
        B::cast_sphere(
            self.world,
            self.entity,
            origin,
            direction,
            radius,
            max_distance,
            mask,
        )
    }

    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: CollisionMask,
    ) -> usize {
        B::overlap_box(self.world, self.entity, center, half_extents, rotation, mask)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: CollisionMask) -> usize {
        B::overlap_sphere(self.world, self.entity, center, radius, mask)
    }
}

impl<B: CharacterPhysicsBackend> BodySweep for BackendQuery<'_, B> {
    fn sweep(&self, direction: Vec3, distance: f32) -> SensorCast {
        B::sweep_body(self.world, self.entity, direction, distance, self.sweep_mask)
    }
}
