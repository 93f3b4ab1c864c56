//! Configuration for stance templates.

use bevy::prelude::*;

use crate::detection::CollisionMask;

/// Settings shared by every stance.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct StanceSettings {
    /// Higher priorities pre-empt lower ones.
    pub priority: i32,

    /// Multiplier on the controller's movement speed.
    pub speed: f32,

    /// Whether jump commands are honoured in this stance.
    pub can_jump: bool,

    /// Only eligible (and only valid) while grounded.
    pub needs_grounded: bool,
}

impl Default for StanceSettings {
    fn default() -> Self {
        Self {
            priority: 0,
            speed: 1.0,
            can_jump: false,
            needs_grounded: false,
        }
    }
}

impl StanceSettings {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_jump(mut self, can_jump: bool) -> Self {
        self.can_jump = can_jump;
        self
    }

    pub fn grounded(mut self) -> Self {
        self.needs_grounded = true;
        self
    }

    /// Speed multiplier with negative and NaN values treated as zero.
    pub fn speed_multiplier(&self) -> f32 {
        crate::config::sanitize_rate(self.speed)
    }
}

/// How a button drives an input gate.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    /// Active while the button is held.
    #[default]
    Hold,
    /// Each press flips the gate. Letting go of the movement stick while the
    /// stance is active clears it.
    Toggle,
    /// Active for exactly one update after each press.
    Tap,
}

/// Binds a stance's eligibility to a named button.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct InputGateConfig {
    /// Button name as written into `InputState`.
    pub button: String,

    pub mode: GateMode,

    /// Squared movement magnitude under which a toggled gate clears.
    pub toggle_threshold: f32,
}

impl InputGateConfig {
    pub fn hold(button: impl Into<String>) -> Self {
        Self::new(button, GateMode::Hold)
    }

    pub fn toggle(button: impl Into<String>) -> Self {
        Self::new(button, GateMode::Toggle)
    }

    pub fn tap(button: impl Into<String>) -> Self {
        Self::new(button, GateMode::Tap)
    }

    pub fn new(button: impl Into<String>, mode: GateMode) -> Self {
        Self {
            button: button.into(),
            mode,
            toggle_threshold: 0.5,
        }
    }
}

/// Configuration for the ledge grab stance.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GrabbingConfig {
    /// Center of the grab box in camera space.
    pub box_offset: Vec3,

    /// Full extents of the grab box.
    pub box_size: Vec3,

    /// Layers that can be grabbed.
    pub grabbable_mask: CollisionMask,
}

impl Default for GrabbingConfig {
    fn default() -> Self {
        Self {
            box_offset: Vec3::new(0.0, 0.0, -0.5),
            box_size: Vec3::ONE,
            grabbable_mask: CollisionMask::ALL,
        }
    }
}

/// Configuration for the slide stance.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SlidingConfig {
    /// Fraction of slide velocity lost per second.
    pub friction: f32,

    /// Weight of steering input added on top of the slide.
    pub control: f32,

    /// Speed (units/second) needed to start and keep sliding.
    pub min_velocity: f32,
}

impl Default for SlidingConfig {
    fn default() -> Self {
        Self {
            friction: 0.2,
            control: 0.1,
            min_velocity: 3.0,
        }
    }
}

/// Configuration for the wall-run stance.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WallRunningConfig {
    /// Reach of the side rays.
    pub max_wall_distance: f32,

    /// Longest a single wall run may last (seconds).
    pub max_wallrun_time: f32,

    /// Vertical speed above which a wall run cannot start or continue.
    pub max_vertical_velocity: f32,

    /// Widest approach angle (degrees) between velocity and the wall.
    pub max_angle: f32,

    /// Fraction of gravity still applied while running.
    pub gravity: f32,

    /// Blend (0.0-1.0) of a wall jump from the wall normal toward the camera.
    pub jump_control: f32,

    /// Multiplier on jump force for wall jumps.
    pub jump_multiplier: f32,

    /// Speed the body is clamped to on entry.
    pub entrance_speed: f32,

    /// Camera roll (degrees) away from the wall.
    pub camera_angle: f32,

    /// Speed pulling the body into the wall while running.
    pub wall_pull: f32,

    /// Origin of the side rays relative to the body.
    pub character_center: Vec3,

    /// Layers that can be run along.
    pub wall_mask: CollisionMask,
}

impl Default for WallRunningConfig {
    fn default() -> Self {
        Self {
            max_wall_distance: 1.0,
            max_wallrun_time: 4.0,
            max_vertical_velocity: 2.0,
            max_angle: 120.0,
            gravity: 0.3,
            jump_control: 0.3,
            jump_multiplier: 1.5,
            entrance_speed: 4.0,
            camera_angle: 20.0,
            wall_pull: 2.0,
            character_center: Vec3::ZERO,
            wall_mask: CollisionMask::ALL,
        }
    }
}
