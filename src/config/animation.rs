//! Configuration for the animation parameter driver.

use bevy::prelude::*;

#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct AnimationConfig {
    /// Whether parameters are written at all.
    pub enabled: bool,

    /// Easing rate of `YRot` (1/second).
    pub yaw_response: f32,

    /// Scale applied to the eased yaw before it is written.
    pub yaw_scale: f32,

    /// Easing rate of the local velocity behind `XSpeed`/`ZSpeed` (1/second).
    pub velocity_response: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            yaw_response: 2.0,
            yaw_scale: 1.5,
            velocity_response: 5.0,
        }
    }
}
