//! ECS systems driving every character.
//!
//! All systems are exclusive and generic over the physics backend, so they
//! can hand `&World` to the backend's queries while the per-character state
//! they mutate is taken out of the world and put back afterwards.

use bevy::ecs::component::Mutable;
use bevy::ecs::message::{MessageCursor, Messages};
use bevy::prelude::*;

use crate::animation::{
    local_displacement, write_stance_flags, AnimationParameters, AnimationSample, AnimatorDriver,
};
use crate::backend::{BackendQuery, CharacterPhysicsBackend, CollisionQuery};
use crate::config::{AnimationConfig, ControllerConfig, FootIkConfig, MoverConfig, RagdollConfig};
use crate::controller::{movement_direction, CharacterController};
use crate::debug::DebugLines;
use crate::foot_ik::{FootIkBinding, FootIkSolver, WorldIkRig};
use crate::hierarchy::{set_world_pose, world_transform};
use crate::intent::{InputHistory, InputState, LocomotionCommand, JUMP_BUTTON};
use crate::mover::resolve_move;
use crate::ragdoll::{AnimatorState, RagdollBinding, RagdollBlend, WorldRagdollRig};
use crate::rotation::euler_degrees;
use crate::stance::{BodyEffects, CharacterState, StanceChanged, StanceMachine};

fn characters(world: &mut World) -> Vec<Entity> {
    world
        .query_filtered::<Entity, With<CharacterController>>()
        .iter(world)
        .collect()
}

/// Move a component out of the world, leaving its default behind. Put it
/// back with `insert` when done.
fn take_component<T: Component<Mutability = Mutable> + Default>(
    world: &mut World,
    entity: Entity,
) -> Option<T> {
    world
        .get_mut::<T>(entity)
        .map(|mut component| std::mem::take(&mut *component))
}

fn frame_delta(world: &World) -> f32 {
    world
        .get_resource::<Time>()
        .map(|t| t.delta_secs())
        .unwrap_or(0.0)
}

/// Where the character looks from: the camera entity, or eye height above
/// the body when there is none.
fn camera_position(
    world: &World,
    controller: &CharacterController,
    position: Vec3,
    config: &ControllerConfig,
) -> Vec3 {
    controller
        .camera
        .and_then(|camera| world_transform(world, camera))
        .map(|t| t.translation)
        .unwrap_or(position + Vec3::Y * config.eye_height)
}

/// Snapshot of `entity` for stance hooks, or `None` if it is not a complete
/// character.
fn character_state<B: CharacterPhysicsBackend>(
    world: &World,
    entity: Entity,
) -> Option<CharacterState> {
    let controller = world.get::<CharacterController>(entity)?;
    let config = world.get::<ControllerConfig>(entity)?;
    let input = world.get::<InputState>(entity)?;
    let position = B::get_position(world, entity);
    Some(controller.state(
        position,
        camera_position(world, controller, position, config),
        input,
        B::get_fixed_timestep(world),
        B::get_gravity(world, entity),
    ))
}

fn apply_effects<B: CharacterPhysicsBackend>(
    world: &mut World,
    entity: Entity,
    effects: BodyEffects,
    dt: f32,
) {
    if let Some(kinematic) = effects.kinematic {
        B::set_kinematic(world, entity, kinematic);
    }
    if let Some(velocity) = effects.velocity {
        B::set_velocity(world, entity, velocity);
    }
    if effects.acceleration != Vec3::ZERO {
        B::apply_acceleration(world, entity, effects.acceleration, dt);
    }
}

/// Probe for ground and snapshot the body's velocity.
pub(crate) fn sensor_system<B: CharacterPhysicsBackend>(world: &mut World) {
    for entity in characters(world) {
        let Some(config) = world.get::<ControllerConfig>(entity) else {
            continue;
        };
        let position = B::get_position(world, entity);
        let query = BackendQuery::<B>::new(world, entity);
        let on_ground =
            query.overlap_sphere(position, config.ground_probe_radius(), config.ground_mask) > 0;
        let velocity = B::get_velocity(world, entity);

        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.on_ground = on_ground;
            controller.velocity = velocity;
            let forward = controller.model_rotation * Vec3::NEG_Z;
            controller.movement_direction = forward.dot(velocity.normalize_or_zero());
        }
    }
}

/// Update input gates, pick the stance and apply what it asks of the body.
pub(crate) fn stance_system<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = frame_delta(world);
    for entity in characters(world) {
        let Some(mut machine) = take_component::<StanceMachine>(world, entity) else {
            continue;
        };
        let (Some(input), Some(mut history)) = (
            world.get::<InputState>(entity).cloned(),
            world.get::<InputHistory>(entity).cloned(),
        ) else {
            world.entity_mut(entity).insert(machine);
            continue;
        };
        machine.update_gates(&input, &history);
        let jump = history.edge(&input, JUMP_BUTTON).started;
        history.commit(&input);
        world.entity_mut(entity).insert(history);
        if jump {
            world.write_message(LocomotionCommand::Jump(entity));
        }

        let mut effects = BodyEffects::default();
        let mut transitions = Vec::new();
        if let Some(state) = character_state::<B>(world, entity) {
            let query = BackendQuery::<B>::new(world, entity);
            transitions = machine.update(&state, &query, dt, &mut effects);

            if let Some(mut lines) = take_component::<DebugLines>(world, entity) {
                lines.clear();
                machine.draw_debug(&state, &mut lines);
                world.entity_mut(entity).insert(lines);
            }
        }

        world.entity_mut(entity).insert(machine);
        apply_effects::<B>(world, entity, effects, B::get_fixed_timestep(world));
        for transition in transitions {
            world.write_message(StanceChanged {
                entity,
                from: transition.from,
                to: transition.to,
            });
        }
    }
}

/// Initialise new ragdolls and run jump and ragdoll commands.
pub(crate) fn command_system<B: CharacterPhysicsBackend>(
    world: &mut World,
    mut cursor: Local<MessageCursor<LocomotionCommand>>,
) {
    let pending: Vec<Entity> = world
        .query_filtered::<(Entity, &RagdollBlend), With<RagdollBinding>>()
        .iter(world)
        .filter(|(_, blend)| blend.state() == AnimatorState::None)
        .map(|(entity, _)| entity)
        .collect();
    for entity in pending {
        with_ragdoll(world, entity, |blend, rig, params, _| blend.initialize(rig, params));
    }

    let Some(messages) = world.get_resource::<Messages<LocomotionCommand>>() else {
        return;
    };
    let commands: Vec<LocomotionCommand> = cursor.read(messages).copied().collect();
    for command in commands {
        match command {
            LocomotionCommand::Jump(entity) => jump::<B>(world, entity),
            LocomotionCommand::BeginRagdoll(entity) => {
                with_ragdoll(world, entity, |blend, rig, params, _| {
                    blend.begin_ragdoll(rig, params);
                });
            }
            LocomotionCommand::BeginActiveRagdoll(entity) => {
                with_ragdoll(world, entity, |blend, rig, params, config| {
                    blend.begin_active_ragdoll(rig, params, &config);
                });
            }
            LocomotionCommand::EndRagdoll(entity) => {
                with_ragdoll(world, entity, |blend, rig, params, _| blend.end_ragdoll(rig, params));
            }
        }
    }
}

fn jump<B: CharacterPhysicsBackend>(world: &mut World, entity: Entity) {
    let Some(state) = character_state::<B>(world, entity) else {
        return;
    };
    let (Some(machine), Some(config)) = (
        world.get::<StanceMachine>(entity),
        world.get::<ControllerConfig>(entity),
    ) else {
        return;
    };
    if let Some(impulse) = machine.on_jump(config.jump_force, &state) {
        B::apply_velocity_change(world, entity, impulse);
    }
}

/// Run `f` against the ragdoll of `entity`, with its blend and parameters
/// taken out of the world for the duration.
fn with_ragdoll(
    world: &mut World,
    entity: Entity,
    f: impl FnOnce(
        &mut RagdollBlend,
        &mut WorldRagdollRig<'_>,
        &mut AnimationParameters,
        RagdollConfig,
    ),
) {
    let Some(binding) = world.get::<RagdollBinding>(entity).cloned() else {
        warn!("ragdoll command for {entity} without a ragdoll binding");
        return;
    };
    if let Err(err) = binding.validate(world) {
        warn!("skipping ragdoll of {entity}: {err}");
        return;
    }
    let Some(mut blend) = take_component::<RagdollBlend>(world, entity) else {
        return;
    };
    let config = world.get::<RagdollConfig>(entity).copied().unwrap_or_default();
    let mut params = take_component::<AnimationParameters>(world, entity).unwrap_or_default();

    let mut rig = WorldRagdollRig::new(world, binding);
    f(&mut blend, &mut rig, &mut params, config);

    world.entity_mut(entity).insert((blend, params));
}

/// Turn look input into camera and model rotations.
pub(crate) fn rotation_system<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = frame_delta(world);
    for entity in characters(world) {
        let Some(state) = character_state::<B>(world, entity) else {
            continue;
        };
        let (Some(mut controller), Some(config), Some(input)) = (
            world.get::<CharacterController>(entity).cloned(),
            world.get::<ControllerConfig>(entity).cloned(),
            world.get::<InputState>(entity),
        ) else {
            continue;
        };

        let target = controller.accumulate_look(input.look, &config);
        let adjusted = world
            .get::<StanceMachine>(entity)
            .and_then(|machine| machine.on_rotate(target, &state))
            .unwrap_or(target);
        controller.settle_camera(adjusted, &config, dt);
        controller.turn_model(config.model_turn_rate, dt);

        if let Some(camera) = controller.camera {
            if let Some(current) = world_transform(world, camera) {
                set_world_pose(world, camera, current.translation, controller.camera_rotation);
            }
        }
        if let Some(model) = controller.model {
            if let Some(current) = world_transform(world, model) {
                set_world_pose(world, model, current.translation, controller.model_rotation);
            }
        }
        world.entity_mut(entity).insert(controller);
    }
}

/// Write animation parameters.
pub(crate) fn animation_system<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = frame_delta(world);
    let fixed_dt = B::get_fixed_timestep(world);
    for entity in characters(world) {
        let config = world.get::<AnimationConfig>(entity).copied().unwrap_or_default();
        if !config.enabled {
            continue;
        }
        let (Some(controller), Some(controller_config)) = (
            world.get::<CharacterController>(entity),
            world.get::<ControllerConfig>(entity),
        ) else {
            continue;
        };
        let sample = AnimationSample {
            on_ground: controller.on_ground,
            model_yaw: euler_degrees(controller.model_rotation).y,
            camera_yaw: euler_degrees(controller.camera_rotation).y,
            local_displacement: local_displacement(
                controller.last_displacement,
                controller.facing(),
                controller.model_rotation,
                controller_config.movement_smoothness,
            ),
            vertical_velocity: controller.velocity.y,
            fixed_dt,
            movement_speed: controller_config.movement_speed,
        };

        let mut params = take_component::<AnimationParameters>(world, entity).unwrap_or_default();
        if let Some(machine) = world.get::<StanceMachine>(entity) {
            write_stance_flags(&mut params, machine);
        }
        let mut driver = world.get::<AnimatorDriver>(entity).copied().unwrap_or_default();
        driver.update(&mut params, &config, &sample, dt);
        world.entity_mut(entity).insert((params, driver));
    }
}

/// Move every character by its stance-shaped intent, resolved against the
/// scene.
pub(crate) fn movement_system<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);
    for entity in characters(world) {
        let Some(state) = character_state::<B>(world, entity) else {
            continue;
        };
        let Some(mut machine) = take_component::<StanceMachine>(world, entity) else {
            continue;
        };
        let (Some(mut controller), Some(config), Some(mover), Some(input)) = (
            world.get::<CharacterController>(entity).cloned(),
            world.get::<ControllerConfig>(entity).cloned(),
            world.get::<MoverConfig>(entity).copied(),
            world.get::<InputState>(entity),
        ) else {
            world.entity_mut(entity).insert(machine);
            continue;
        };

        let stance_speed = machine
            .active()
            .map(|stance| stance.settings().speed_multiplier())
            .unwrap_or(1.0);
        let speed = controller.ease_speed(
            config.movement_speed * stance_speed,
            config.speed_response,
            dt,
        );
        let direction = movement_direction(
            input.movement,
            controller.facing(),
            controller.model_rotation,
            config.movement_smoothness,
        );

        let mut effects = BodyEffects::default();
        let velocity = machine.on_move(direction * speed, &state, dt, &mut effects);
        let query = BackendQuery::<B>::new(world, entity).with_sweep_mask(mover.collision_mask);
        let result = resolve_move(&query, state.position, velocity * dt, &mover);

        B::set_position(world, entity, state.position + result.displacement);
        controller.last_displacement = result.displacement;
        world.entity_mut(entity).insert((controller, machine));
        apply_effects::<B>(world, entity, effects, dt);
    }
}

/// Servo active ragdoll joints toward the animated pose.
pub(crate) fn servo_system(world: &mut World) {
    let active: Vec<(Entity, RagdollBinding, RagdollBlend, RagdollConfig)> = world
        .query::<(Entity, &RagdollBinding, &RagdollBlend, Option<&RagdollConfig>)>()
        .iter(world)
        .filter(|(_, _, blend, _)| blend.state() == AnimatorState::ActiveRagdoll)
        .map(|(entity, binding, blend, config)| {
            (entity, binding.clone(), blend.clone(), config.copied().unwrap_or_default())
        })
        .collect();
    for (_, binding, blend, config) in active {
        let mut rig = WorldRagdollRig::new(world, binding);
        blend.servo(&mut rig, &config);
    }
}

/// Place feet on the ground after the animated pose is evaluated.
pub(crate) fn foot_ik_system<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = frame_delta(world);
    let rigs: Vec<(Entity, FootIkBinding)> = world
        .query::<(Entity, &FootIkBinding)>()
        .iter(world)
        .map(|(entity, binding)| (entity, *binding))
        .collect();
    for (entity, binding) in rigs {
        if let Err(err) = binding.validate(world) {
            warn!("skipping foot IK of {entity}: {err}");
            continue;
        }
        let mut solver = world.get::<FootIkSolver>(entity).copied().unwrap_or_default();
        let config = world.get::<FootIkConfig>(entity).copied().unwrap_or_default();
        let state = character_state::<B>(world, entity);
        let on_ground = state.is_some_and(|s| s.on_ground);
        let look_target = state.map(|s| s.camera_position + s.camera_forward());

        let query = BackendQuery::<B>::new(world, entity);
        let mut rig = WorldIkRig::new(world, binding);
        solver.solve(&mut rig, &query, &config, on_ground, look_target, dt);
        let goals = rig.goals;

        world.entity_mut(entity).insert((solver, goals));
    }
}
