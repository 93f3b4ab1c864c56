//! Input snapshots and locomotion commands.
//!
//! The host writes raw input into [`InputState`] each frame; the locomotion
//! systems diff it against the previous frame ([`InputHistory`]) to find
//! button presses and releases. One-shot actions arrive as
//! [`LocomotionCommand`] messages.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

/// Button that triggers a jump when pressed.
pub const JUMP_BUTTON: &str = "Jump";

/// Raw player input for one character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use stance_controller::prelude::*;
///
/// let mut input = InputState::default();
/// input.set_movement(Vec2::new(0.0, 1.0));
/// input.press("Sprint");
/// assert!(input.is_pressed("Sprint"));
///
/// input.release("Sprint");
/// assert!(!input.is_pressed("Sprint"));
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct InputState {
    /// Movement stick. `y` is forward, `x` is right.
    pub movement: Vec2,
    /// Look delta for this frame. `x` is yaw, `y` is pitch.
    pub look: Vec2,
    buttons: HashMap<String, bool>,
}

impl InputState {
    /// Set the movement stick. Non-finite input is ignored.
    pub fn set_movement(&mut self, movement: Vec2) {
        if movement.is_finite() {
            self.movement = movement;
        }
    }

    /// Set the look delta. Non-finite input is ignored.
    pub fn set_look(&mut self, look: Vec2) {
        if look.is_finite() {
            self.look = look;
        }
    }

    pub fn press(&mut self, button: impl Into<String>) {
        self.set_button(button, true);
    }

    pub fn release(&mut self, button: impl Into<String>) {
        self.set_button(button, false);
    }

    pub fn set_button(&mut self, button: impl Into<String>, pressed: bool) {
        self.buttons.insert(button.into(), pressed);
    }

    pub fn is_pressed(&self, button: &str) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }
}

/// Transitions of one button between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEdge {
    /// Pressed this frame, released last frame.
    pub started: bool,
    /// Released this frame, pressed last frame.
    pub cancelled: bool,
    /// Pressed this frame.
    pub held: bool,
}

/// Button state as of the previous update, for edge detection.
#[derive(Component, Debug, Clone, Default)]
pub struct InputHistory {
    previous: HashMap<String, bool>,
}

impl InputHistory {
    /// Edge of `button` between the stored snapshot and `current`.
    pub fn edge(&self, current: &InputState, button: &str) -> ButtonEdge {
        let was = self.previous.get(button).copied().unwrap_or(false);
        let now = current.is_pressed(button);
        ButtonEdge {
            started: now && !was,
            cancelled: was && !now,
            held: now,
        }
    }

    /// Store `current` as the snapshot future edges are measured against.
    pub fn commit(&mut self, current: &InputState) {
        self.previous.clone_from(&current.buttons);
    }
}

/// One-shot requests addressed to a character.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocomotionCommand {
    /// Jump, if the active stance allows it.
    Jump(Entity),
    /// Go fully limp.
    BeginRagdoll(Entity),
    /// Go limp but keep servoing toward the animated pose.
    BeginActiveRagdoll(Entity),
    /// Return to the animated model.
    EndRagdoll(Entity),
}

impl LocomotionCommand {
    pub fn entity(&self) -> Entity {
        match *self {
            Self::Jump(entity)
            | Self::BeginRagdoll(entity)
            | Self::BeginActiveRagdoll(entity)
            | Self::EndRagdoll(entity) => entity,
        }
    }
}
