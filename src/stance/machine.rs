//! Priority-based stance selection.

use bevy::platform::collections::HashSet;
use bevy::prelude::*;

use crate::backend::CollisionQuery;
use crate::debug::DebugDraw;
use crate::error::LocomotionError;
use crate::intent::{InputHistory, InputState};

use super::{BodyEffects, CharacterState, Stance, StanceTemplate};

/// A change of active stance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StanceTransition {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// The stances of one character and which one is active.
///
/// Invariants:
/// * at most one stance is active;
/// * the old stance's `on_exit` always runs before the new one's `on_enter`;
/// * a still-eligible active stance is only replaced by a strictly higher
///   priority one. Among equal priorities the earliest in the set wins.
#[derive(Component, Debug, Clone, Default)]
pub struct StanceMachine {
    stances: Vec<Stance>,
    active: Option<usize>,
}

impl StanceMachine {
    /// Build a machine from stances with unique names.
    pub fn new(stances: Vec<Stance>) -> Result<Self, LocomotionError> {
        {
            let mut seen = HashSet::new();
            for stance in &stances {
                if !seen.insert(stance.name()) {
                    return Err(LocomotionError::DuplicateStance(stance.name().to_owned()));
                }
            }
        }
        Ok(Self {
            stances,
            active: None,
        })
    }

    pub fn from_templates(templates: &[StanceTemplate]) -> Result<Self, LocomotionError> {
        Self::new(templates.iter().map(Stance::from_template).collect())
    }

    pub fn stances(&self) -> &[Stance] {
        &self.stances
    }

    pub fn stance(&self, name: &str) -> Option<&Stance> {
        self.stances.iter().find(|s| s.name() == name)
    }

    pub fn active(&self) -> Option<&Stance> {
        self.active.map(|i| &self.stances[i])
    }

    pub fn active_mut(&mut self) -> Option<&mut Stance> {
        self.active.map(|i| &mut self.stances[i])
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active().map(Stance::name)
    }

    /// Feed button edges to every input gate.
    pub fn update_gates(&mut self, input: &InputState, history: &InputHistory) {
        for stance in &mut self.stances {
            if let Some(gate) = stance.gate_mut() {
                let edge = history.edge(input, gate.button());
                gate.update(edge);
            }
        }
    }

    /// Pick the best eligible stance, switching to it if it differs from
    /// the active one.
    pub fn select(
        &mut self,
        state: &CharacterState,
        query: &dyn CollisionQuery,
        effects: &mut BodyEffects,
    ) -> Option<StanceTransition> {
        self.select_skipping(state, query, effects, None)
    }

    /// Selection that never considers the stance at `skip`.
    fn select_skipping(
        &mut self,
        state: &CharacterState,
        query: &dyn CollisionQuery,
        effects: &mut BodyEffects,
        skip: Option<usize>,
    ) -> Option<StanceTransition> {
        let mut best = self.active;
        for i in 0..self.stances.len() {
            if Some(i) == skip {
                continue;
            }
            let outranks = match best {
                None => true,
                Some(b) => self.stances[i].priority() > self.stances[b].priority(),
            };
            if outranks && self.stances[i].can_enter(state, query) {
                best = Some(i);
            }
        }
        if best == self.active {
            return None;
        }
        Some(self.switch_to(best, state, effects))
    }

    /// One variable-rate update: select, advance the active stance's clock,
    /// validate it and, if it drops out, select again among the others.
    pub fn update(
        &mut self,
        state: &CharacterState,
        query: &dyn CollisionQuery,
        dt: f32,
        effects: &mut BodyEffects,
    ) -> Vec<StanceTransition> {
        for stance in &mut self.stances {
            stance.observe(state);
        }
        let mut transitions = Vec::new();
        transitions.extend(self.select(state, query, effects));

        let Some(active) = self.active else {
            return transitions;
        };
        let stance = &mut self.stances[active];
        stance.on_update(dt);
        if !stance.validate(state, query) {
            transitions.push(self.switch_to(None, state, effects));
            transitions.extend(self.select_skipping(state, query, effects, Some(active)));
        }
        transitions
    }

    fn switch_to(
        &mut self,
        next: Option<usize>,
        state: &CharacterState,
        effects: &mut BodyEffects,
    ) -> StanceTransition {
        let from = self.active.map(|i| {
            let stance = &mut self.stances[i];
            stance.on_exit(effects);
            stance.name().to_owned()
        });
        let to = next.map(|i| {
            let stance = &mut self.stances[i];
            stance.on_enter(state, effects);
            stance.name().to_owned()
        });
        self.active = next;
        debug!("stance {:?} -> {:?}", from, to);
        StanceTransition { from, to }
    }

    /// Run the active stance's movement hook. Zero with no active stance.
    pub fn on_move(
        &mut self,
        intent: Vec3,
        state: &CharacterState,
        dt: f32,
        effects: &mut BodyEffects,
    ) -> Vec3 {
        match self.active_mut() {
            Some(stance) => stance.on_move(intent, state, dt, effects),
            None => Vec3::ZERO,
        }
    }

    /// Run the active stance's rotation hook. `None` with no active stance.
    pub fn on_rotate(&self, rotation: Quat, state: &CharacterState) -> Option<Quat> {
        self.active().map(|stance| stance.on_rotate(rotation, state))
    }

    /// Velocity change of a jump, or `None` if the active stance forbids
    /// jumping or there is none.
    pub fn on_jump(&self, force: f32, state: &CharacterState) -> Option<Vec3> {
        self.active()
            .filter(|stance| stance.can_jump())
            .map(|stance| stance.on_jump(force, state))
    }

    /// Draw every stance. A failing stance is logged and skipped so one bad
    /// primitive never hides the rest. Returns how many stances failed.
    pub fn draw_debug(&self, state: &CharacterState, draw: &mut dyn DebugDraw) -> usize {
        let mut failures = 0;
        for stance in &self.stances {
            if let Err(err) = stance.draw_debug(state, draw) {
                warn!("debug draw of stance `{}` failed: {err}", stance.name());
                failures += 1;
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        GrabbingConfig, InputGateConfig, SlidingConfig, StanceSettings, WallRunningConfig,
    };
    use crate::debug::DebugLines;
    use crate::testing::MockScene;

    fn grounded(name: &str, priority: i32) -> StanceTemplate {
        StanceTemplate::grounded(
            name,
            StanceSettings::default().with_priority(priority).grounded(),
        )
    }

    fn airborne(name: &str, priority: i32) -> StanceTemplate {
        StanceTemplate::grounded(name, StanceSettings::default().with_priority(priority))
    }

    fn on_ground() -> CharacterState {
        CharacterState {
            on_ground: true,
            ..default()
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = StanceMachine::from_templates(&[grounded("Walk", 0), airborne("Walk", 1)])
            .unwrap_err();
        assert_eq!(err, LocomotionError::DuplicateStance("Walk".into()));
    }

    #[test]
    fn unique_names_build() {
        let machine =
            StanceMachine::from_templates(&[grounded("Walking", 0), airborne("Falling", 1)])
                .unwrap();
        assert_eq!(machine.stances().len(), 2);
        assert!(machine.active().is_none());
    }

    #[test]
    fn grounded_idle_selects_grounded_stance() {
        let scene = MockScene::default();
        let mut machine = StanceMachine::from_templates(&[grounded("Walking", 0)]).unwrap();
        let mut effects = BodyEffects::default();

        for _ in 0..3 {
            machine.update(&on_ground(), &scene, 0.016, &mut effects);
        }

        assert_eq!(machine.active_name(), Some("Walking"));
        let state = on_ground();
        let intent = Vec3::new(0.0, 0.0, -2.0);
        assert_eq!(machine.on_move(intent, &state, 0.02, &mut effects), intent);
        assert!(effects.is_empty());
    }

    #[test]
    fn higher_priority_preempts() {
        let scene = MockScene::default();
        let mut machine =
            StanceMachine::from_templates(&[airborne("Falling", 0), grounded("Walking", 1)])
                .unwrap();
        let mut effects = BodyEffects::default();

        machine.update(&CharacterState::default(), &scene, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Falling"));

        let transitions = machine.update(&on_ground(), &scene, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Walking"));
        assert_eq!(
            transitions,
            vec![StanceTransition {
                from: Some("Falling".into()),
                to: Some("Walking".into()),
            }]
        );
    }

    #[test]
    fn lower_priority_never_demotes_eligible_stance() {
        let scene = MockScene::default();
        let mut machine =
            StanceMachine::from_templates(&[airborne("High", 5), airborne("Low", 1)]).unwrap();
        let mut effects = BodyEffects::default();

        for _ in 0..5 {
            let transitions = machine.update(&on_ground(), &scene, 0.016, &mut effects);
            assert!(transitions.iter().all(|t| t.to.as_deref() != Some("Low")));
        }
        assert_eq!(machine.active_name(), Some("High"));
    }

    #[test]
    fn equal_priority_first_wins() {
        let scene = MockScene::default();
        let mut machine =
            StanceMachine::from_templates(&[airborne("First", 1), airborne("Second", 1)])
                .unwrap();
        let mut effects = BodyEffects::default();
        machine.update(&on_ground(), &scene, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("First"));
    }

    #[test]
    fn failed_validation_reselects_same_frame() {
        let scene = MockScene::default();
        let mut machine =
            StanceMachine::from_templates(&[airborne("Falling", 0), grounded("Walking", 1)])
                .unwrap();
        let mut effects = BodyEffects::default();

        machine.update(&on_ground(), &scene, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Walking"));

        let transitions =
            machine.update(&CharacterState::default(), &scene, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Falling"));
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].to, None);
        assert_eq!(transitions[1].from, None);
        assert_eq!(transitions[1].to.as_deref(), Some("Falling"));
    }

    #[test]
    fn no_active_stance_makes_hooks_noops() {
        let scene = MockScene::default();
        let mut machine = StanceMachine::from_templates(&[grounded("Walking", 0)]).unwrap();
        let mut effects = BodyEffects::default();
        let state = CharacterState::default();

        machine.update(&state, &scene, 0.016, &mut effects);
        assert!(machine.active().is_none());
        assert_eq!(machine.on_move(Vec3::X, &state, 0.02, &mut effects), Vec3::ZERO);
        assert_eq!(machine.on_rotate(Quat::IDENTITY, &state), None);
        assert_eq!(machine.on_jump(4.0, &state), None);
    }

    #[test]
    fn jump_respects_can_jump() {
        let scene = MockScene::default();
        let mut effects = BodyEffects::default();
        let state = on_ground();

        let mut machine = StanceMachine::from_templates(&[grounded("Walking", 0)]).unwrap();
        machine.update(&state, &scene, 0.016, &mut effects);
        assert_eq!(machine.on_jump(4.0, &state), None);

        let jumping = StanceTemplate::grounded(
            "Walking",
            StanceSettings::default().grounded().with_jump(true),
        );
        let mut machine = StanceMachine::from_templates(&[jumping]).unwrap();
        machine.update(&state, &scene, 0.016, &mut effects);
        assert_eq!(machine.on_jump(4.0, &state), Some(Vec3::Y * 4.0));
    }

    #[test]
    fn grab_releases_body_on_landing() {
        let ledge = MockScene {
            box_overlaps: 1,
            ..default()
        };
        let grab = StanceTemplate::grabbing(
            "Grabbing",
            StanceSettings::default().with_priority(3),
            InputGateConfig::hold("Grab"),
            GrabbingConfig::default(),
        );
        let mut machine =
            StanceMachine::from_templates(&[airborne("Falling", 0), grab]).unwrap();

        let mut input = InputState::default();
        let mut history = InputHistory::default();
        input.press("Grab");
        machine.update_gates(&input, &history);
        history.commit(&input);

        let mut effects = BodyEffects::default();
        let airborne_state = CharacterState::default();
        machine.update(&airborne_state, &ledge, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Grabbing"));
        assert_eq!(effects.kinematic, Some(true));

        let mut effects = BodyEffects::default();
        machine.update(&on_ground(), &ledge, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Falling"));
        assert_eq!(effects.kinematic, Some(false));
    }

    #[test]
    fn exit_runs_before_enter() {
        let ledge = MockScene {
            box_overlaps: 1,
            ..default()
        };
        let low = StanceTemplate::grabbing(
            "LowGrab",
            StanceSettings::default().with_priority(3),
            InputGateConfig::hold("Grab"),
            GrabbingConfig::default(),
        );
        let high = StanceTemplate::grabbing(
            "HighGrab",
            StanceSettings::default().with_priority(5),
            InputGateConfig::hold("Climb"),
            GrabbingConfig::default(),
        );
        let mut machine = StanceMachine::from_templates(&[low, high]).unwrap();
        let state = CharacterState::default();
        let mut input = InputState::default();
        let mut history = InputHistory::default();

        input.press("Grab");
        machine.update_gates(&input, &history);
        history.commit(&input);
        machine.update(&state, &ledge, 0.016, &mut BodyEffects::default());
        assert_eq!(machine.active_name(), Some("LowGrab"));

        input.press("Climb");
        machine.update_gates(&input, &history);
        history.commit(&input);
        let mut effects = BodyEffects::default();
        let transitions = machine.update(&state, &ledge, 0.016, &mut effects);

        assert_eq!(machine.active_name(), Some("HighGrab"));
        assert_eq!(transitions.len(), 1);
        // LowGrab's release is overwritten by HighGrab's freeze.
        assert_eq!(effects.kinematic, Some(true));
    }

    #[test]
    fn tap_gated_stance_lasts_one_update() {
        let scene = MockScene::default();
        let dash = airborne("Dash", 4).with_gate(InputGateConfig::tap("Dash"));
        let mut machine =
            StanceMachine::from_templates(&[airborne("Idle", 0), dash]).unwrap();
        let mut effects = BodyEffects::default();
        let state = CharacterState::default();
        let mut input = InputState::default();
        let mut history = InputHistory::default();

        let mut step = |machine: &mut StanceMachine, input: &InputState| {
            machine.update_gates(input, &history);
            history.commit(input);
            machine.update(&state, &scene, 0.016, &mut effects);
            machine.active_name().map(str::to_owned)
        };

        assert_eq!(step(&mut machine, &input).as_deref(), Some("Idle"));
        input.press("Dash");
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Dash"));
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Idle"));
        input.release("Dash");
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Idle"));
    }

    #[test]
    fn toggle_press_waits_behind_higher_priority() {
        let scene = MockScene::default();
        let crouch = airborne("Crouching", 1).with_gate(InputGateConfig::toggle("Crouch"));
        let dash = airborne("Dashing", 5).with_gate(InputGateConfig::hold("Dash"));
        let mut machine =
            StanceMachine::from_templates(&[airborne("Idle", 0), crouch, dash]).unwrap();
        let mut effects = BodyEffects::default();
        // Stick idle throughout.
        let state = CharacterState::default();
        let mut input = InputState::default();
        let mut history = InputHistory::default();

        let mut step = |machine: &mut StanceMachine, input: &InputState| {
            machine.update_gates(input, &history);
            history.commit(input);
            machine.update(&state, &scene, 0.016, &mut effects);
            machine.active_name().map(str::to_owned)
        };

        input.press("Dash");
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Dashing"));
        input.press("Crouch");
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Dashing"));
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Dashing"));

        input.release("Dash");
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Crouching"));
        // Active now, so the idle stick releases it.
        assert_eq!(step(&mut machine, &input).as_deref(), Some("Idle"));
    }

    #[test]
    fn timed_out_wall_run_does_not_restart() {
        let wall = MockScene {
            walls: vec![(Vec3::NEG_X, 0.5, Vec3::X)],
            ..default()
        };
        let run = StanceTemplate::wall_running(
            "WallRunning",
            StanceSettings::default().with_priority(5),
            InputGateConfig::hold("Run"),
            WallRunningConfig::default(),
        );
        let mut machine =
            StanceMachine::from_templates(&[airborne("Falling", 0), run]).unwrap();
        let mut input = InputState::default();
        input.press("Run");
        machine.update_gates(&input, &InputHistory::default());

        let state = CharacterState {
            velocity: Vec3::new(0.0, 0.5, -5.0),
            ..default()
        };
        let mut effects = BodyEffects::default();
        machine.update(&state, &wall, 0.1, &mut effects);
        assert_eq!(machine.active_name(), Some("WallRunning"));

        let mut transitions = Vec::new();
        for _ in 0..60 {
            transitions.extend(machine.update(&state, &wall, 0.1, &mut effects));
        }
        assert_eq!(machine.active_name(), Some("Falling"));
        assert_eq!(
            transitions,
            vec![
                StanceTransition {
                    from: Some("WallRunning".into()),
                    to: None,
                },
                StanceTransition {
                    from: None,
                    to: Some("Falling".into()),
                },
            ]
        );

        // Landing re-arms the wall.
        let landed = CharacterState {
            on_ground: true,
            ..state
        };
        machine.update(&landed, &wall, 0.1, &mut effects);
        machine.update(&state, &wall, 0.1, &mut effects);
        assert_eq!(machine.active_name(), Some("WallRunning"));
    }

    #[test]
    fn sliding_snapshots_velocity_on_enter() {
        let scene = MockScene::default();
        let slide = StanceTemplate::sliding(
            "Sliding",
            StanceSettings::default().with_priority(2),
            InputGateConfig::hold("Slide"),
            SlidingConfig::default(),
        );
        let mut machine =
            StanceMachine::from_templates(&[grounded("Walking", 0), slide]).unwrap();
        let mut input = InputState::default();
        input.press("Slide");
        machine.update_gates(&input, &InputHistory::default());

        let state = CharacterState {
            on_ground: true,
            last_displacement: Vec3::NEG_Z * 0.1,
            fixed_dt: 0.02,
            ..default()
        };
        let mut effects = BodyEffects::default();
        machine.update(&state, &scene, 0.016, &mut effects);
        assert_eq!(machine.active_name(), Some("Sliding"));

        let moved = machine.on_move(Vec3::ZERO, &state, 0.0, &mut effects);
        assert!(moved.distance(Vec3::NEG_Z * 5.0) < 1e-4);
    }

    #[test]
    fn debug_failures_are_contained() {
        let grab = StanceTemplate::grabbing(
            "Grabbing",
            StanceSettings::default(),
            InputGateConfig::hold("Grab"),
            GrabbingConfig::default(),
        );
        let machine = StanceMachine::from_templates(&[grounded("Walking", 0), grab]).unwrap();

        let mut lines = DebugLines::with_capacity(4);
        let failures = machine.draw_debug(&CharacterState::default(), &mut lines);
        assert_eq!(failures, 1);
        assert_eq!(lines.lines().len(), 4);
    }
}
