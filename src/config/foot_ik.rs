//! Configuration for foot placement.

use bevy::prelude::*;

use crate::detection::CollisionMask;

/// Configuration for [`FootIkSolver`](crate::foot_ik::FootIkSolver).
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct FootIkConfig {
    /// Master switch. When off, foot goal weights are held at zero.
    pub enabled: bool,

    /// Fall back to a sphere cast when the foot ray misses.
    pub thick_probe: bool,

    /// Height above the animated foot the ground ray starts from.
    pub height_from_ground: f32,

    /// How far below the foot ground is still considered.
    pub max_ground_distance: f32,

    /// Smoothing rate of the body offset (1/second).
    pub body_rate: f32,

    /// Smoothing rate of each foot offset (1/second).
    pub foot_rate: f32,

    /// Radius of the thick probe.
    pub foot_radius: f32,

    /// Upward bias added to a thick probe contact.
    pub thick_offset: f32,

    /// Layers feet can stand on.
    pub mask: CollisionMask,

    /// Write a look-at goal toward the camera's forward point.
    pub look_at: bool,

    /// Look-at weight of the body.
    pub body_weight: f32,

    /// Look-at weight of the head.
    pub head_weight: f32,
}

impl Default for FootIkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thick_probe: true,
            height_from_ground: 0.5,
            max_ground_distance: 0.5,
            body_rate: 0.3,
            foot_rate: 1.0,
            foot_radius: 0.2,
            thick_offset: 0.1,
            mask: CollisionMask::ALL,
            look_at: true,
            body_weight: 0.6,
            head_weight: 1.0,
        }
    }
}

impl FootIkConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..default()
        }
    }

    pub fn with_rates(mut self, foot_rate: f32, body_rate: f32) -> Self {
        self.foot_rate = foot_rate;
        self.body_rate = body_rate;
        self
    }

    pub fn with_thick_probe(mut self, enabled: bool) -> Self {
        self.thick_probe = enabled;
        self
    }

    pub fn with_mask(mut self, mask: CollisionMask) -> Self {
        self.mask = mask;
        self
    }

    /// Length of the foot ray.
    pub fn ray_length(&self) -> f32 {
        (self.max_ground_distance + self.height_from_ground).max(0.0)
    }

    /// Length of the thick probe, shortened so the sphere stops where the
    /// ray would.
    pub fn sphere_length(&self) -> f32 {
        (self.ray_length() - self.foot_radius * 2.0).max(0.0)
    }
}
