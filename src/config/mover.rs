//! Configuration for collision-aware movement.

use bevy::prelude::*;

use crate::detection::CollisionMask;

/// Configuration for [`resolve_move`](crate::mover::resolve_move).
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MoverConfig {
    /// Distance the body is pushed out along a hit normal after an obstructed
    /// sweep, so the next sweep does not start in contact.
    pub normal_offset: f32,

    /// Highest ledge the body may step onto.
    pub max_step_height: f32,

    /// Fraction (0.0-1.0) of the blocked displacement that slides along the
    /// obstruction.
    pub slide_amount: f32,

    /// Whether obstructed moves try stepping up before sliding.
    pub step_enabled: bool,

    /// Layers the body sweep collides with.
    pub collision_mask: CollisionMask,

    /// Layers the step probe treats as walkable.
    pub ground_mask: CollisionMask,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            normal_offset: 0.005,
            max_step_height: 0.1,
            slide_amount: 1.0,
            step_enabled: false,
            collision_mask: CollisionMask::ALL,
            ground_mask: CollisionMask::ALL,
        }
    }
}

impl MoverConfig {
    pub fn with_normal_offset(mut self, offset: f32) -> Self {
        self.normal_offset = offset;
        self
    }

    pub fn with_slide_amount(mut self, amount: f32) -> Self {
        self.slide_amount = amount;
        self
    }

    pub fn with_step(mut self, max_step_height: f32) -> Self {
        self.step_enabled = true;
        self.max_step_height = max_step_height;
        self
    }
}
