//! Stances: mutually exclusive movement modes.
//!
//! A character owns a [`StanceMachine`] holding one [`Stance`] per movement
//! mode it supports. Each update the machine picks the highest priority
//! stance that can be entered, and the active stance then shapes movement,
//! look and jumps through its hooks.
//!
//! Stances are built per character from [`StanceTemplate`]s, which are plain
//! data and can be shared between any number of characters.
//!
//! # Example
//!
//! ```rust
//! use stance_controller::prelude::*;
//!
//! let templates = [
//!     StanceTemplate::grounded("Walking", StanceSettings::default().with_jump(true)),
//!     StanceTemplate::sliding(
//!         "Sliding",
//!         StanceSettings::default().with_priority(2),
//!         InputGateConfig::hold("Slide"),
//!         SlidingConfig::default(),
//!     ),
//! ];
//!
//! let machine = StanceMachine::from_templates(&templates).unwrap();
//! assert_eq!(machine.stances().len(), 2);
//! assert!(machine.active().is_none());
//! ```

mod gate;
mod grabbing;
mod grounded;
mod machine;
mod sliding;
mod wall_running;

use bevy::prelude::*;

pub use gate::InputGate;
pub use grabbing::Grabbing;
pub use machine::{StanceMachine, StanceTransition};
pub use sliding::Sliding;
pub use wall_running::{WallRunning, WallSide};

use crate::backend::CollisionQuery;
use crate::config::{
    GrabbingConfig, InputGateConfig, SlidingConfig, StanceSettings, WallRunningConfig,
};
use crate::debug::DebugDraw;
use crate::error::LocomotionError;

/// Snapshot of a character handed to stance hooks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterState {
    pub position: Vec3,
    /// Velocity of the physics body.
    pub velocity: Vec3,
    /// Displacement actually made by the last fixed step.
    pub last_displacement: Vec3,
    pub on_ground: bool,
    /// Yaw-only heading derived from the camera.
    pub facing: Quat,
    pub camera_position: Vec3,
    pub camera_rotation: Quat,
    pub movement_input: Vec2,
    pub fixed_dt: f32,
    pub gravity: Vec3,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            last_displacement: Vec3::ZERO,
            on_ground: false,
            facing: Quat::IDENTITY,
            camera_position: Vec3::ZERO,
            camera_rotation: Quat::IDENTITY,
            movement_input: Vec2::ZERO,
            fixed_dt: 1.0 / 64.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

impl CharacterState {
    /// Velocity implied by the last fixed step's displacement.
    pub fn last_velocity(&self) -> Vec3 {
        if self.fixed_dt > 0.0 {
            self.last_displacement / self.fixed_dt
        } else {
            Vec3::ZERO
        }
    }

    pub fn camera_forward(&self) -> Vec3 {
        self.camera_rotation * Vec3::NEG_Z
    }
}

/// Side effects a stance requests on the physics body.
///
/// Stances never touch the body directly; the caller applies these after the
/// hook returns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyEffects {
    /// Freeze or release the body.
    pub kinematic: Option<bool>,
    /// Overwrite the body's velocity.
    pub velocity: Option<Vec3>,
    /// Acceleration to apply for this step.
    pub acceleration: Vec3,
}

impl BodyEffects {
    pub fn is_empty(&self) -> bool {
        self.kinematic.is_none() && self.velocity.is_none() && self.acceleration == Vec3::ZERO
    }
}

/// Behaviour of a stance template.
#[derive(Debug, Clone, PartialEq)]
pub enum StanceBehavior {
    /// No intent transform. Eligible while the grounded requirement holds.
    Grounded,
    Grabbing(GrabbingConfig),
    Sliding(SlidingConfig),
    WallRunning(WallRunningConfig),
}

/// Immutable description of a stance, instantiated per character.
#[derive(Debug, Clone, PartialEq)]
pub struct StanceTemplate {
    pub name: String,
    pub settings: StanceSettings,
    pub gate: Option<InputGateConfig>,
    pub behavior: StanceBehavior,
}

impl StanceTemplate {
    pub fn grounded(name: impl Into<String>, settings: StanceSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            gate: None,
            behavior: StanceBehavior::Grounded,
        }
    }

    pub fn grabbing(
        name: impl Into<String>,
        settings: StanceSettings,
        gate: InputGateConfig,
        config: GrabbingConfig,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            gate: Some(gate),
            behavior: StanceBehavior::Grabbing(config),
        }
    }

    pub fn sliding(
        name: impl Into<String>,
        settings: StanceSettings,
        gate: InputGateConfig,
        config: SlidingConfig,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            gate: Some(gate),
            behavior: StanceBehavior::Sliding(config),
        }
    }

    pub fn wall_running(
        name: impl Into<String>,
        settings: StanceSettings,
        gate: InputGateConfig,
        config: WallRunningConfig,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            gate: Some(gate),
            behavior: StanceBehavior::WallRunning(config),
        }
    }

    /// Gate any template behind a button.
    pub fn with_gate(mut self, gate: InputGateConfig) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Per-instance state of each stance variant.
#[derive(Debug, Clone)]
pub enum StanceKind {
    Grounded,
    Grabbing(Grabbing),
    Sliding(Sliding),
    WallRunning(WallRunning),
}

/// A stance owned by one character.
#[derive(Debug, Clone)]
pub struct Stance {
    name: String,
    settings: StanceSettings,
    gate: Option<InputGate>,
    elapsed: f32,
    kind: StanceKind,
}

impl Stance {
    pub fn from_template(template: &StanceTemplate) -> Self {
        let kind = match &template.behavior {
            StanceBehavior::Grounded => StanceKind::Grounded,
            StanceBehavior::Grabbing(config) => StanceKind::Grabbing(Grabbing::new(*config)),
            StanceBehavior::Sliding(config) => StanceKind::Sliding(Sliding::new(*config)),
            StanceBehavior::WallRunning(config) => {
                StanceKind::WallRunning(WallRunning::new(*config))
            }
        };
        Self {
            name: template.name.clone(),
            settings: template.settings,
            gate: template.gate.clone().map(InputGate::new),
            elapsed: 0.0,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &StanceSettings {
        &self.settings
    }

    pub fn priority(&self) -> i32 {
        self.settings.priority
    }

    pub fn can_jump(&self) -> bool {
        self.settings.can_jump
    }

    /// Seconds since this stance was last entered.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn kind(&self) -> &StanceKind {
        &self.kind
    }

    pub fn gate(&self) -> Option<&InputGate> {
        self.gate.as_ref()
    }

    pub(crate) fn gate_mut(&mut self) -> Option<&mut InputGate> {
        self.gate.as_mut()
    }

    /// Whether the button gate (if any) is open.
    pub fn input_active(&self) -> bool {
        self.gate.as_ref().map_or(true, InputGate::is_active)
    }

    fn grounded_ok(&self, state: &CharacterState) -> bool {
        grounded::grounded_ok(&self.settings, state)
    }

    pub fn can_enter(&mut self, state: &CharacterState, query: &dyn CollisionQuery) -> bool {
        if !self.grounded_ok(state) || !self.input_active() {
            return false;
        }
        match &mut self.kind {
            StanceKind::Grounded => true,
            StanceKind::Grabbing(grab) => grab.can_enter(state, query),
            StanceKind::Sliding(slide) => slide.can_enter(state),
            StanceKind::WallRunning(run) => run.can_enter(state, query),
        }
    }

    /// Whether the active stance may stay active. An idle stick releases a
    /// toggle gate here, so a toggle only clears while its stance runs.
    pub fn validate(&mut self, state: &CharacterState, query: &dyn CollisionQuery) -> bool {
        if let Some(gate) = self.gate.as_mut() {
            gate.release_if_idle(state.movement_input);
        }
        let input_active = self.input_active();
        if !self.grounded_ok(state) {
            return false;
        }
        let elapsed = self.elapsed;
        match &mut self.kind {
            StanceKind::Grounded => input_active,
            StanceKind::Grabbing(grab) => grab.validate(state, query),
            StanceKind::Sliding(slide) => input_active && slide.validate(state),
            StanceKind::WallRunning(run) => run.validate(state, query, elapsed),
        }
    }

    /// Transform the movement intent (units/second) for this fixed step.
    pub fn on_move(
        &mut self,
        intent: Vec3,
        state: &CharacterState,
        dt: f32,
        effects: &mut BodyEffects,
    ) -> Vec3 {
        match &mut self.kind {
            StanceKind::Grounded | StanceKind::Grabbing(_) => intent,
            StanceKind::Sliding(slide) => slide.on_move(intent, dt),
            StanceKind::WallRunning(run) => run.on_move(intent, state, effects),
        }
    }

    /// Adjust the target camera rotation.
    pub fn on_rotate(&self, rotation: Quat, state: &CharacterState) -> Quat {
        match &self.kind {
            StanceKind::WallRunning(run) => run.on_rotate(rotation, state),
            _ => rotation,
        }
    }

    /// Velocity change of a jump with the given force.
    pub fn on_jump(&self, force: f32, state: &CharacterState) -> Vec3 {
        match &self.kind {
            StanceKind::WallRunning(run) => run.on_jump(force, state),
            _ => Vec3::Y * force,
        }
    }

    pub fn on_enter(&mut self, state: &CharacterState, effects: &mut BodyEffects) {
        self.elapsed = 0.0;
        match &mut self.kind {
            StanceKind::Grounded => {}
            StanceKind::Grabbing(grab) => grab.on_enter(effects),
            StanceKind::Sliding(slide) => slide.on_enter(state),
            StanceKind::WallRunning(run) => run.on_enter(state, effects),
        }
    }

    pub fn on_exit(&mut self, effects: &mut BodyEffects) {
        self.elapsed = 0.0;
        match &mut self.kind {
            StanceKind::Grounded | StanceKind::Sliding(_) => {}
            StanceKind::Grabbing(grab) => grab.on_exit(effects),
            StanceKind::WallRunning(run) => run.on_exit(),
        }
    }

    /// Bookkeeping that runs every update, active or not.
    pub fn observe(&mut self, state: &CharacterState) {
        if let StanceKind::WallRunning(run) = &mut self.kind {
            run.observe(state);
        }
    }

    /// Advance the stance clock.
    pub fn on_update(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    pub fn draw_debug(
        &self,
        state: &CharacterState,
        draw: &mut dyn DebugDraw,
    ) -> Result<(), LocomotionError> {
        match &self.kind {
            StanceKind::Grounded => Ok(()),
            StanceKind::Grabbing(grab) => grab.draw_debug(state, draw),
            StanceKind::Sliding(slide) => slide.draw_debug(state, draw),
            StanceKind::WallRunning(run) => run.draw_debug(state, draw),
        }
    }
}

/// Sent whenever a character's active stance changes.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct StanceChanged {
    pub entity: Entity,
    pub from: Option<String>,
    pub to: Option<String>,
}
