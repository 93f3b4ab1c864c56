//! The character controller component and its movement and look math.

use bevy::prelude::*;

use crate::animation::{AnimationParameters, AnimatorDriver};
use crate::config::{
    sanitize_fraction, smoothing_factor, AnimationConfig, ControllerConfig, MoverConfig,
};
use crate::intent::{InputHistory, InputState};
use crate::rotation::{clamp_relative, euler_degrees, from_euler_degrees};
use crate::stance::{CharacterState, StanceMachine};

/// Runtime state of a stance-driven character.
///
/// Lives on the physics body entity, whose origin is at the feet. The
/// camera and the visible model are optional separate entities; without
/// them the controller keeps their rotations to itself.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(
    Transform,
    ControllerConfig,
    MoverConfig,
    InputState,
    InputHistory,
    StanceMachine,
    AnimationConfig,
    AnimationParameters,
    AnimatorDriver
)]
pub struct CharacterController {
    /// Camera entity whose rotation is driven by look input.
    pub camera: Option<Entity>,
    /// Visible model entity, turned toward the camera heading.
    pub model: Option<Entity>,

    /// Whether the grounded probe found ground this frame.
    pub on_ground: bool,
    /// Body velocity as of the last sensor pass.
    pub velocity: Vec3,
    /// Displacement actually made by the last fixed step.
    pub last_displacement: Vec3,
    /// Speed eased toward the stance's target speed.
    pub current_speed: f32,
    /// Alignment of the model's forward with the velocity (-1.0 to 1.0).
    pub movement_direction: f32,

    /// Accumulated look rotation, without roll.
    pub look_rotation: Quat,
    /// Rotation written to the camera, eased toward the stance-adjusted look.
    pub camera_rotation: Quat,
    /// Rotation of the visible model.
    pub model_rotation: Quat,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            camera: None,
            model: None,
            on_ground: false,
            velocity: Vec3::ZERO,
            last_displacement: Vec3::ZERO,
            current_speed: 0.0,
            movement_direction: 0.0,
            look_rotation: Quat::IDENTITY,
            camera_rotation: Quat::IDENTITY,
            model_rotation: Quat::IDENTITY,
        }
    }
}

impl CharacterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(mut self, camera: Entity) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_model(mut self, model: Entity) -> Self {
        self.model = Some(model);
        self
    }

    /// Start looking along `rotation`.
    pub fn with_look(mut self, rotation: Quat) -> Self {
        self.look_rotation = strip_roll(rotation);
        self.camera_rotation = self.look_rotation;
        self.model_rotation = yaw_only(rotation);
        self
    }

    /// Heading the camera faces, without pitch or roll.
    pub fn facing(&self) -> Quat {
        yaw_only(self.camera_rotation)
    }

    /// Ease the current speed toward `target`.
    pub fn ease_speed(&mut self, target: f32, response: f32, dt: f32) -> f32 {
        let t = smoothing_factor(response, dt);
        self.current_speed += (target - self.current_speed) * t;
        self.current_speed
    }

    /// Accumulate look input into the roll-free look rotation, clamped
    /// relative to the model. Returns the clamped rotation for the stance's
    /// rotation hook.
    pub fn accumulate_look(&mut self, look: Vec2, config: &ControllerConfig) -> Quat {
        let target = apply_look(self.look_rotation, look, config.rotation_speed);
        clamp_relative(
            target,
            self.model_rotation,
            config.rotation_min,
            config.rotation_max,
        )
    }

    /// Store the stance-adjusted rotation: the accumulator keeps it minus
    /// roll, the camera eases toward it with roll.
    pub fn settle_camera(&mut self, adjusted: Quat, config: &ControllerConfig, dt: f32) {
        self.look_rotation = strip_roll(adjusted);
        let t = smoothing_factor(config.camera_response, dt);
        self.camera_rotation = self.camera_rotation.slerp(adjusted, t).normalize();
    }

    /// Ease the model's heading toward the camera's.
    pub fn turn_model(&mut self, rate: f32, dt: f32) {
        let t = smoothing_factor(rate, dt);
        self.model_rotation = self.model_rotation.slerp(self.facing(), t).normalize();
    }

    /// Snapshot handed to stance hooks.
    pub fn state(
        &self,
        position: Vec3,
        camera_position: Vec3,
        input: &InputState,
        fixed_dt: f32,
        gravity: Vec3,
    ) -> CharacterState {
        CharacterState {
            position,
            velocity: self.velocity,
            last_displacement: self.last_displacement,
            on_ground: self.on_ground,
            facing: self.facing(),
            camera_position,
            camera_rotation: self.camera_rotation,
            movement_input: input.movement,
            fixed_dt,
            gravity,
        }
    }
}

/// Yaw and pitch a look rotation by `look` scaled by `speed` degrees.
///
/// Yaw turns about the world up axis and pitch about the camera's own right
/// axis, so the horizon stays level. Positive `x` turns right and positive
/// `y` looks up.
pub fn apply_look(rotation: Quat, look: Vec2, speed: f32) -> Quat {
    if !look.is_finite() {
        return rotation;
    }
    let yaw = Quat::from_rotation_y((-look.x * speed).to_radians());
    let pitch = Quat::from_rotation_x((look.y * speed).to_radians());
    (yaw * rotation * pitch).normalize()
}

/// Desired movement direction for a stick input.
///
/// The stick maps to `(x, 0, -y)` in local space (Bevy's forward is -Z),
/// rotated by a blend of the facing and the model orientation, and clamped
/// to unit length.
pub fn movement_direction(input: Vec2, facing: Quat, model: Quat, smoothness: f32) -> Vec3 {
    if !input.is_finite() {
        return Vec3::ZERO;
    }
    let local = Vec3::new(input.x, 0.0, -input.y);
    let blended = (facing * local).lerp(model * local, sanitize_fraction(smoothness));
    blended.clamp_length_max(1.0)
}

/// Keep only the yaw of a rotation.
pub fn yaw_only(rotation: Quat) -> Quat {
    let euler = euler_degrees(rotation);
    from_euler_degrees(Vec3::new(0.0, euler.y, 0.0))
}

/// Drop the roll of a rotation.
pub fn strip_roll(rotation: Quat) -> Quat {
    let euler = euler_degrees(rotation);
    from_euler_degrees(Vec3::new(euler.x, euler.y, 0.0))
}
