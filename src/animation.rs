//! Animation parameters written for the host's animation graph.
//!
//! The controller never plays clips itself. It fills an
//! [`AnimationParameters`] table that host systems read to drive their own
//! animation graphs.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::config::{sanitize_fraction, smoothing_factor, AnimationConfig};
use crate::rotation::shortest_yaw;
use crate::stance::StanceMachine;

pub const GROUNDED: &str = "Grounded";
pub const Y_ROT: &str = "YRot";
pub const X_SPEED: &str = "XSpeed";
pub const Y_SPEED: &str = "YSpeed";
pub const Z_SPEED: &str = "ZSpeed";
pub const RAGDOLL: &str = "Ragdoll";
pub const HURT_AMOUNT: &str = "HurtAmount";

/// Named float and bool parameters.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct AnimationParameters {
    floats: HashMap<String, f32>,
    bools: HashMap<String, bool>,
}

impl AnimationParameters {
    pub fn set_float(&mut self, name: &str, value: f32) {
        if let Some(slot) = self.floats.get_mut(name) {
            *slot = value;
        } else {
            self.floats.insert(name.to_owned(), value);
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        if let Some(slot) = self.bools.get_mut(name) {
            *slot = value;
        } else {
            self.bools.insert(name.to_owned(), value);
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }
}

/// What the driver samples from the character each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationSample {
    pub on_ground: bool,
    /// Heading of the model, in degrees.
    pub model_yaw: f32,
    /// Heading of the camera, in degrees.
    pub camera_yaw: f32,
    /// Last fixed-step displacement in character space.
    pub local_displacement: Vec3,
    pub vertical_velocity: f32,
    pub fixed_dt: f32,
    pub movement_speed: f32,
}

/// Eased state behind the `YRot` and speed parameters.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct AnimatorDriver {
    pub yaw: f32,
    pub displacement: Vec3,
}

impl AnimatorDriver {
    /// Write `Grounded`, `YRot`, `XSpeed`, `ZSpeed` and, airborne only,
    /// `YSpeed`.
    pub fn update(
        &mut self,
        params: &mut AnimationParameters,
        config: &AnimationConfig,
        sample: &AnimationSample,
        dt: f32,
    ) {
        params.set_bool(GROUNDED, sample.on_ground);

        let target = yaw_bucket(shortest_yaw(sample.model_yaw, sample.camera_yaw));
        self.yaw += (target - self.yaw) * smoothing_factor(config.yaw_response, dt);
        params.set_float(Y_ROT, self.yaw * config.yaw_scale);

        let t = smoothing_factor(config.velocity_response, dt);
        self.displacement = self.displacement.lerp(sample.local_displacement, t);
        let scale = sample.fixed_dt * sample.movement_speed;
        let (x, z) = if scale > 0.0 {
            (self.displacement.x / scale, -self.displacement.z / scale)
        } else {
            (0.0, 0.0)
        };
        params.set_float(X_SPEED, x);
        params.set_float(Z_SPEED, z);

        if !sample.on_ground {
            params.set_float(Y_SPEED, sample.vertical_velocity);
        }
    }
}

/// Raise the active stance's flag and lower every other stance's.
pub fn write_stance_flags(params: &mut AnimationParameters, machine: &StanceMachine) {
    let active = machine.active_name();
    for stance in machine.stances() {
        params.set_bool(stance.name(), Some(stance.name()) == active);
    }
}

/// Snap a yaw delta to 30 degree steps, then out to the next 20 degree step.
pub fn yaw_bucket(delta: f32) -> f32 {
    let rounded = (delta / 30.0).round() * 30.0;
    if rounded > 0.0 {
        (rounded / 20.0).ceil() * 20.0
    } else {
        (rounded / 20.0).floor() * 20.0
    }
}

/// Express a world displacement in character space, blending between the
/// camera heading and the model heading.
pub fn local_displacement(displacement: Vec3, facing: Quat, model: Quat, blend: f32) -> Vec3 {
    let by_facing = facing.inverse() * displacement;
    let by_model = model.inverse() * displacement;
    by_facing.lerp(by_model, sanitize_fraction(blend))
}
