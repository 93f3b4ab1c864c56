//! Ledge grab: hang in place while a grabbable collider is in reach.

use bevy::prelude::*;

use crate::backend::CollisionQuery;
use crate::config::GrabbingConfig;
use crate::debug::DebugDraw;
use crate::error::LocomotionError;

use super::{BodyEffects, CharacterState};

#[derive(Debug, Clone, PartialEq)]
pub struct Grabbing {
    pub config: GrabbingConfig,
}

impl Grabbing {
    pub fn new(config: GrabbingConfig) -> Self {
        Self { config }
    }

    /// World-space center of the grab box, which rides on the camera.
    pub fn box_center(&self, state: &CharacterState) -> Vec3 {
        state.camera_position + state.camera_rotation * self.config.box_offset
    }

    fn in_reach(&self, state: &CharacterState, query: &dyn CollisionQuery) -> bool {
        query.overlap_box(
            self.box_center(state),
            self.config.box_size.abs() * 0.5,
            Quat::IDENTITY,
            self.config.grabbable_mask,
        ) > 0
    }

    pub(super) fn can_enter(&self, state: &CharacterState, query: &dyn CollisionQuery) -> bool {
        !state.on_ground && self.in_reach(state, query)
    }

    pub(super) fn validate(&self, state: &CharacterState, query: &dyn CollisionQuery) -> bool {
        !state.on_ground && self.in_reach(state, query)
    }

    pub(super) fn on_enter(&self, effects: &mut BodyEffects) {
        effects.kinematic = Some(true);
    }

    pub(super) fn on_exit(&self, effects: &mut BodyEffects) {
        effects.kinematic = Some(false);
    }

    pub(super) fn draw_debug(
        &self,
        state: &CharacterState,
        draw: &mut dyn DebugDraw,
    ) -> Result<(), LocomotionError> {
        draw.wire_box(
            self.box_center(state),
            self.config.box_size.abs() * 0.5,
            Quat::IDENTITY,
            Color::srgb(0.2, 0.8, 1.0),
        )
    }
}
