//! Configuration for ragdoll blending.

use bevy::prelude::*;

#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RagdollConfig {
    /// Servo joints toward the animated pose while in active ragdoll.
    pub use_active_ragdoll: bool,

    /// Joint drive force limit in active ragdoll.
    pub active_strength: f32,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            use_active_ragdoll: true,
            active_strength: 500.0,
        }
    }
}

impl RagdollConfig {
    pub fn with_active_strength(mut self, strength: f32) -> Self {
        self.active_strength = strength;
        self
    }
}
