//! Wall running.
//!
//! Entry casts a ray to the left of the facing direction, then to the right;
//! the first hit picks the side, which then sticks for the whole run. While
//! running, movement is flattened onto the wall, most of gravity is
//! cancelled and the camera rolls away from the wall. A run that times out
//! cannot restart on the same wall until the character lands.

use bevy::prelude::*;

use crate::backend::CollisionQuery;
use crate::config::{sanitize_fraction, WallRunningConfig};
use crate::debug::DebugDraw;
use crate::error::LocomotionError;
use crate::rotation::{angle_between_degrees, project_on_plane};

use super::{BodyEffects, CharacterState};

/// Side of the character a wall is on.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    Left,
    Right,
}

impl WallSide {
    /// Direction of this side in the facing frame.
    pub fn local_direction(self) -> Vec3 {
        match self {
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
        }
    }
}

/// A wall found by a side ray.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WallContact {
    side: WallSide,
    normal: Vec3,
    point: Vec3,
}

/// Normals closer than this count as the same wall.
const SAME_WALL_DOT: f32 = 0.99;

#[derive(Debug, Clone, PartialEq)]
pub struct WallRunning {
    pub config: WallRunningConfig,
    /// Wall picked by the last successful `can_enter`, committed on enter.
    candidate: Option<WallContact>,
    side: Option<WallSide>,
    wall_normal: Vec3,
    wall_point: Vec3,
    /// Normal of the wall a run timed out on. Cleared on landing.
    spent_wall: Option<Vec3>,
}

impl WallRunning {
    pub fn new(config: WallRunningConfig) -> Self {
        Self {
            config,
            candidate: None,
            side: None,
            wall_normal: Vec3::ZERO,
            wall_point: Vec3::ZERO,
            spent_wall: None,
        }
    }

    pub fn side(&self) -> Option<WallSide> {
        self.side
    }

    pub fn wall_normal(&self) -> Vec3 {
        self.wall_normal
    }

    /// Whether a timed-out run blocks re-entry on the same wall.
    pub fn is_spent(&self) -> bool {
        self.spent_wall.is_some()
    }

    fn ray_origin(&self, state: &CharacterState) -> Vec3 {
        state.position + self.config.character_center
    }

    fn cast_side(
        &self,
        side: WallSide,
        state: &CharacterState,
        query: &dyn CollisionQuery,
    ) -> Option<WallContact> {
        let direction = state.facing * side.local_direction();
        let cast = query.cast_ray(
            self.ray_origin(state),
            direction,
            self.config.max_wall_distance,
            self.config.wall_mask,
        );
        cast.hit.then_some(WallContact {
            side,
            normal: cast.normal,
            point: cast.point,
        })
    }

    fn vertical_speed_ok(&self, state: &CharacterState) -> bool {
        state.velocity.y.abs() < self.config.max_vertical_velocity
    }

    fn approach_ok(&self, state: &CharacterState, normal: Vec3) -> bool {
        angle_between_degrees(state.velocity, -normal) < self.config.max_angle
    }

    fn is_spent_wall(&self, normal: Vec3) -> bool {
        self.spent_wall.is_some_and(|spent| spent.dot(normal) > SAME_WALL_DOT)
    }

    /// Landing re-arms a wall that timed out.
    pub(super) fn observe(&mut self, state: &CharacterState) {
        if state.on_ground {
            self.spent_wall = None;
        }
    }

    pub(super) fn can_enter(&mut self, state: &CharacterState, query: &dyn CollisionQuery) -> bool {
        self.candidate = None;
        if state.on_ground || !self.vertical_speed_ok(state) {
            return false;
        }
        let contact = [WallSide::Left, WallSide::Right]
            .into_iter()
            .find_map(|side| self.cast_side(side, state, query));
        let Some(contact) = contact else {
            return false;
        };
        if self.is_spent_wall(contact.normal) || !self.approach_ok(state, contact.normal) {
            return false;
        }
        self.candidate = Some(contact);
        true
    }

    pub(super) fn validate(
        &mut self,
        state: &CharacterState,
        query: &dyn CollisionQuery,
        elapsed: f32,
    ) -> bool {
        let Some(side) = self.side else {
            return false;
        };
        if elapsed >= self.config.max_wallrun_time {
            self.spent_wall = Some(self.wall_normal);
            return false;
        }
        if state.on_ground || !self.vertical_speed_ok(state) {
            return false;
        }
        let Some(contact) = self.cast_side(side, state, query) else {
            return false;
        };
        self.wall_normal = contact.normal;
        self.wall_point = contact.point;
        let side_world = state.facing * side.local_direction();
        angle_between_degrees(side_world, -self.wall_normal) < self.config.max_angle
            && self.approach_ok(state, self.wall_normal)
    }

    pub(super) fn on_enter(&mut self, state: &CharacterState, effects: &mut BodyEffects) {
        if let Some(contact) = self.candidate.take() {
            self.side = Some(contact.side);
            self.wall_normal = contact.normal;
            self.wall_point = contact.point;
        }
        let mut velocity = state.velocity;
        velocity.y *= self.config.gravity;
        effects.velocity = Some(velocity.clamp_length_max(self.config.entrance_speed.max(0.0)));
    }

    pub(super) fn on_exit(&mut self) {
        self.side = None;
        self.candidate = None;
    }

    pub(super) fn on_move(
        &mut self,
        intent: Vec3,
        state: &CharacterState,
        effects: &mut BodyEffects,
    ) -> Vec3 {
        effects.acceleration += -(1.0 - self.config.gravity) * state.gravity;
        project_on_plane(intent, self.wall_normal) - self.wall_normal * self.config.wall_pull
    }

    /// Roll in degrees applied on top of the camera rotation. Positive rolls
    /// the camera's up vector toward its left.
    pub fn camera_roll(&self, state: &CharacterState) -> f32 {
        let Some(side) = self.side else {
            return 0.0;
        };
        let side_world = state.facing * side.local_direction();
        let tilt = self.config.camera_angle * side_world.dot(self.wall_normal);
        match side {
            WallSide::Right => -tilt,
            WallSide::Left => tilt,
        }
    }

    pub(super) fn on_rotate(&self, rotation: Quat, state: &CharacterState) -> Quat {
        rotation * Quat::from_rotation_z(self.camera_roll(state).to_radians())
    }

    pub(super) fn on_jump(&self, force: f32, state: &CharacterState) -> Vec3 {
        let control = sanitize_fraction(self.config.jump_control);
        force
            * self.config.jump_multiplier
            * self.wall_normal.lerp(state.camera_forward(), control)
    }

    pub(super) fn draw_debug(
        &self,
        state: &CharacterState,
        draw: &mut dyn DebugDraw,
    ) -> Result<(), LocomotionError> {
        let origin = self.ray_origin(state);
        for side in [WallSide::Left, WallSide::Right] {
            let direction = state.facing * side.local_direction();
            draw.ray(
                origin,
                direction * self.config.max_wall_distance,
                Color::srgb(1.0, 0.2, 0.2),
            )?;
        }
        if self.side.is_some() {
            draw.line(origin, self.wall_point, Color::WHITE)?;
        }
        Ok(())
    }
}
