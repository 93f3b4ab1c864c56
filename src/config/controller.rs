//! Configuration for player-driven movement and look.

use bevy::prelude::*;

use crate::detection::CollisionMask;

/// Movement, look and grounding tuning for a character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct ControllerConfig {
    /// Top speed before the active stance's speed multiplier (units/second).
    pub movement_speed: f32,

    /// How quickly the current speed eases toward the target speed (1/second).
    pub speed_response: f32,

    /// Degrees of camera rotation per unit of look input.
    pub rotation_speed: f32,

    /// How quickly the camera eases toward its target rotation (1/second).
    pub camera_response: f32,

    /// How quickly the visible model turns toward the camera heading
    /// (1/second).
    pub model_turn_rate: f32,

    /// Height of the look origin above the body when no camera entity is
    /// bound.
    pub eye_height: f32,

    /// Upward velocity change of a plain jump (units/second).
    pub jump_force: f32,

    /// Blend between camera-facing (0.0) and model-facing (1.0) movement.
    pub movement_smoothness: f32,

    /// Radius of the feet. The grounded probe uses twice this.
    pub foot_radius: f32,

    /// Layers that count as ground for the grounded probe.
    pub ground_mask: CollisionMask,

    /// Lower (pitch, yaw, roll) bound in degrees of the camera relative to
    /// the model.
    pub rotation_min: Vec3,

    /// Upper (pitch, yaw, roll) bound in degrees of the camera relative to
    /// the model.
    pub rotation_max: Vec3,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            movement_speed: 2.0,
            speed_response: 5.0,
            rotation_speed: 3.0,
            camera_response: 100.0,
            model_turn_rate: 10.0,
            eye_height: 1.6,
            jump_force: 4.0,
            movement_smoothness: 0.5,
            foot_radius: 0.2,
            ground_mask: CollisionMask::ALL,
            rotation_min: Vec3::new(-80.0, -130.0, -360.0),
            rotation_max: Vec3::new(80.0, 130.0, 360.0),
        }
    }
}

impl ControllerConfig {
    pub fn with_movement_speed(mut self, speed: f32) -> Self {
        self.movement_speed = speed;
        self
    }

    pub fn with_speed_response(mut self, response: f32) -> Self {
        self.speed_response = response;
        self
    }

    pub fn with_rotation_speed(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }

    pub fn with_jump_force(mut self, force: f32) -> Self {
        self.jump_force = force;
        self
    }

    pub fn with_movement_smoothness(mut self, smoothness: f32) -> Self {
        self.movement_smoothness = smoothness;
        self
    }

    pub fn with_foot_radius(mut self, radius: f32) -> Self {
        self.foot_radius = radius;
        self
    }

    pub fn with_ground_mask(mut self, mask: CollisionMask) -> Self {
        self.ground_mask = mask;
        self
    }

    /// Radius of the grounded overlap probe.
    pub fn ground_probe_radius(&self) -> f32 {
        self.foot_radius.max(0.0) * 2.0
    }
}
