//! # `stance_controller`
//!
//! A stance-driven 3D character locomotion core with physics backend
//! abstraction.
//!
//! This crate drives a playable character:
//! - Selects one movement stance per frame by priority (walking, sliding,
//!   grabbing, wall running, or any input-gated variant)
//! - Shapes movement, look and jumps through the active stance
//! - Resolves movement against the scene by sweeping, sliding and stepping
//! - Places feet on uneven ground and lowers the body to match
//! - Hands the pose to a physical ragdoll, limp or actively servoing toward
//!   the animation
//! - Abstracts the physics engine (Avian3D included behind a feature)
//!
//! ## System Order
//!
//! Systems run in clearly defined phases using [`LocomotionSet`]:
//!
//! 1. **Sensors** (`Update`) - Ground probe and velocity snapshot
//! 2. **Stance** (`Update`) - Input gates, stance selection and validation
//! 3. **Commands** (`Update`) - Jumps and ragdoll transitions
//! 4. **Rotation** (`Update`) - Look input, camera and model rotation
//! 5. **Animation** (`Update`) - Animation parameters
//! 6. **Movement** (`FixedUpdate`) - Stance-shaped movement, resolved
//! 7. **Servo** (`FixedUpdate`) - Active ragdoll joint targets
//! 8. **IkEvaluation** (`PostUpdate`) - Foot placement, after the host
//!    evaluates its animated pose
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use stance_controller::prelude::*;
//!
//! let mut app = App::new();
//! app.add_plugins(MinimalPlugins)
//!     .add_plugins(LocomotionPlugin::<NoOpBackend>::default());
//!
//! let machine = StanceMachine::from_templates(&[StanceTemplate::grounded(
//!     "Walking",
//!     StanceSettings::default().with_jump(true),
//! )])
//! .unwrap();
//! app.world_mut().spawn((CharacterController::new(), machine, NoOpBody::default()));
//! app.update();
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod config;
pub mod controller;
pub mod debug;
pub mod detection;
pub mod error;
pub mod foot_ik;
pub mod hierarchy;
pub mod intent;
pub mod mover;
pub mod ragdoll;
pub mod rotation;
pub mod stance;

// Systems are internal - they're added automatically by the plugin
pub(crate) mod systems;

#[cfg(feature = "avian3d")]
pub mod avian;

#[cfg(test)]
mod testing;

/// System sets for the locomotion phases.
///
/// `Update` runs Sensors, Stance, Commands, Rotation and Animation in that
/// order. `FixedUpdate` runs Movement then Servo. `PostUpdate` runs
/// IkEvaluation; order your pose evaluation before it.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Ground probe and velocity snapshot.
    Sensors,
    /// Input gates, stance selection and validation.
    Stance,
    /// Jump and ragdoll commands.
    Commands,
    /// Look input, camera and model rotation.
    Rotation,
    /// Animation parameter writes.
    Animation,
    /// Stance-shaped movement, resolved against the scene.
    Movement,
    /// Active ragdoll joint servoing.
    Servo,
    /// Foot IK, after the animated pose is known.
    IkEvaluation,
}

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{AnimationParameters, AnimatorDriver};
    pub use crate::backend::{
        BodySweep, CharacterPhysicsBackend, CollisionQuery, NoOpBackend, NoOpBody,
    };
    pub use crate::config::{
        AnimationConfig, ControllerConfig, FootIkConfig, GateMode, GrabbingConfig,
        InputGateConfig, MoverConfig, RagdollConfig, SlidingConfig, StanceSettings,
        WallRunningConfig,
    };
    pub use crate::controller::CharacterController;
    pub use crate::debug::{DebugDraw, DebugLines};
    pub use crate::detection::{CollisionMask, SensorCast};
    pub use crate::error::LocomotionError;
    pub use crate::foot_ik::{FootIkBinding, FootIkSolver, IkGoals, IkRig};
    pub use crate::intent::{InputState, LocomotionCommand, JUMP_BUTTON};
    pub use crate::mover::{resolve_move, MoveResult};
    pub use crate::ragdoll::{
        AnimatorState, BoneMap, JointDrive, JointFrame, ModelActive, RagdollBinding, RagdollBlend,
        RagdollBone, RagdollJoint, RagdollRig,
    };
    pub use crate::stance::{
        CharacterState, Stance, StanceChanged, StanceMachine, StanceTemplate,
    };
    pub use crate::{LocomotionPlugin, LocomotionSet};

    #[cfg(feature = "avian3d")]
    pub use crate::avian::Avian3dBackend;
}

/// Main plugin for the locomotion systems.
///
/// Generic over a physics backend `B` which provides scene queries and body
/// access. The backend's own plugin is added too.
///
/// # Examples
///
/// With Avian3D:
/// ```rust,ignore
/// use avian3d::prelude::*;
/// use bevy::prelude::*;
/// use stance_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(PhysicsPlugins::default())
///     .add_plugins(LocomotionPlugin::<Avian3dBackend>::default())
///     .run();
/// ```
pub struct LocomotionPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> LocomotionPlugin<B> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<controller::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::MoverConfig>();
        app.register_type::<config::FootIkConfig>();
        app.register_type::<config::RagdollConfig>();
        app.register_type::<config::AnimationConfig>();
        app.register_type::<intent::InputState>();
        app.register_type::<animation::AnimationParameters>();
        app.register_type::<animation::AnimatorDriver>();
        app.register_type::<foot_ik::FootIkSolver>();
        app.register_type::<foot_ik::FootIkBinding>();
        app.register_type::<foot_ik::IkGoals>();
        app.register_type::<ragdoll::RagdollBlend>();
        app.register_type::<ragdoll::RagdollJoint>();
        app.register_type::<ragdoll::JointDrive>();
        app.register_type::<ragdoll::ModelActive>();

        app.add_message::<intent::LocomotionCommand>();
        app.add_message::<stance::StanceChanged>();

        app.add_plugins(B::plugin());

        app.configure_sets(
            Update,
            (
                LocomotionSet::Sensors,
                LocomotionSet::Stance,
                LocomotionSet::Commands,
                LocomotionSet::Rotation,
                LocomotionSet::Animation,
            )
                .chain(),
        );
        app.configure_sets(
            FixedUpdate,
            (LocomotionSet::Movement, LocomotionSet::Servo).chain(),
        );

        app.add_systems(
            Update,
            (
                systems::sensor_system::<B>.in_set(LocomotionSet::Sensors),
                systems::stance_system::<B>.in_set(LocomotionSet::Stance),
                systems::command_system::<B>.in_set(LocomotionSet::Commands),
                systems::rotation_system::<B>.in_set(LocomotionSet::Rotation),
                systems::animation_system::<B>.in_set(LocomotionSet::Animation),
            ),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::movement_system::<B>.in_set(LocomotionSet::Movement),
                systems::servo_system.in_set(LocomotionSet::Servo),
            ),
        );
        app.add_systems(
            PostUpdate,
            systems::foot_ik_system::<B>.in_set(LocomotionSet::IkEvaluation),
        );
    }
}
