//! Scripted collision scene for unit tests.

use std::cell::Cell;

use bevy::prelude::*;

use crate::backend::{BodySweep, CollisionQuery};
use crate::detection::{CollisionMask, SensorCast};

/// A tiny world of planes and scripted answers.
#[derive(Default)]
pub(crate) struct MockScene {
    /// Horizontal ground plane at this height, hit by downward rays.
    pub ground: Option<f32>,
    /// Normal reported by ground hits. Zero means `Vec3::Y`.
    pub ground_normal: Vec3,
    /// Ground only visible to sphere casts.
    pub sphere_ground: Option<f32>,
    /// Walls as (direction, distance, normal); rays along `direction` hit.
    pub walls: Vec<(Vec3, f32, Vec3)>,
    pub box_overlaps: usize,
    pub sphere_overlaps: usize,
    /// Body sweep obstruction as (distance, normal).
    pub sweep: Option<(f32, Vec3)>,
    pub sweep_calls: Cell<usize>,
}

impl MockScene {
    pub fn with_ground(height: f32) -> Self {
        Self {
            ground: Some(height),
            ..default()
        }
    }

    fn normal(&self) -> Vec3 {
        if self.ground_normal == Vec3::ZERO {
            Vec3::Y
        } else {
            self.ground_normal
        }
    }

    fn hit_plane(&self, height: f32, origin: Vec3, direction: Vec3, max: f32) -> SensorCast {
        if direction.y >= -0.5 {
            return SensorCast::miss();
        }
        let distance = (origin.y - height) / -direction.y;
        if distance < 0.0 || distance > max {
            return SensorCast::miss();
        }
        SensorCast::hit(distance, self.normal(), origin + direction * distance, None)
    }
}

impl CollisionQuery for MockScene {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _mask: CollisionMask,
    ) -> SensorCast {
        for &(wall_direction, distance, normal) in &self.walls {
            if direction.dot(wall_direction.normalize()) > 0.99 && distance <= max_distance {
                return SensorCast::hit(distance, normal, origin + direction * distance, None);
            }
        }
        match self.ground {
            Some(height) => self.hit_plane(height, origin, direction, max_distance),
            None => SensorCast::miss(),
        }
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        _mask: CollisionMask,
    ) -> SensorCast {
        match self.sphere_ground.or(self.ground) {
            Some(height) => {
                let mut cast = self.hit_plane(height + radius, origin, direction, max_distance);
                if cast.hit {
                    cast.point.y -= radius;
                }
                cast
            }
            None => SensorCast::miss(),
        }
    }

    fn overlap_box(
        &self,
        _center: Vec3,
        _half_extents: Vec3,
        _rotation: Quat,
        _mask: CollisionMask,
    ) -> usize {
        self.box_overlaps
    }

    fn overlap_sphere(&self, _center: Vec3, _radius: f32, _mask: CollisionMask) -> usize {
        self.sphere_overlaps
    }
}

impl BodySweep for MockScene {
    fn sweep(&self, _direction: Vec3, distance: f32) -> SensorCast {
        self.sweep_calls.set(self.sweep_calls.get() + 1);
        match self.sweep {
            Some((hit_distance, normal)) if hit_distance <= distance => {
                SensorCast::hit(hit_distance, normal, Vec3::ZERO, None)
            }
            _ => SensorCast::miss(),
        }
    }
}

/// Whether two rotations agree up to sign and float noise.
pub fn same_rotation(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - 1e-5
}
