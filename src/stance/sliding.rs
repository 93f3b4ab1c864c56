//! Slide: keep the momentum the character entered with, bleeding it off
//! with friction while the stick only nudges it.

use bevy::prelude::*;

use crate::config::{sanitize_rate, SlidingConfig};
use crate::debug::DebugDraw;
use crate::error::LocomotionError;

use super::CharacterState;

#[derive(Debug, Clone, PartialEq)]
pub struct Sliding {
    pub config: SlidingConfig,
    velocity: Vec3,
}

impl Sliding {
    pub fn new(config: SlidingConfig) -> Self {
        Self {
            config,
            velocity: Vec3::ZERO,
        }
    }

    /// Remaining slide velocity.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn fast_enough(&self, state: &CharacterState) -> bool {
        state.last_velocity().length() > self.config.min_velocity
    }

    pub(super) fn can_enter(&self, state: &CharacterState) -> bool {
        state.on_ground && self.fast_enough(state)
    }

    pub(super) fn validate(&self, state: &CharacterState) -> bool {
        state.on_ground && self.fast_enough(state)
    }

    pub(super) fn on_enter(&mut self, state: &CharacterState) {
        self.velocity = state.last_velocity();
    }

    pub(super) fn on_move(&mut self, intent: Vec3, dt: f32) -> Vec3 {
        let decay = (1.0 - sanitize_rate(self.config.friction) * sanitize_rate(dt)).max(0.0);
        self.velocity *= decay;
        self.velocity + intent * self.config.control
    }

    pub(super) fn draw_debug(
        &self,
        state: &CharacterState,
        draw: &mut dyn DebugDraw,
    ) -> Result<(), LocomotionError> {
        draw.ray(state.position, self.velocity, Color::srgb(1.0, 0.6, 0.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputGateConfig, StanceSettings};
    use crate::intent::ButtonEdge;
    use crate::stance::{BodyEffects, Stance, StanceTemplate};
    use crate::testing::MockScene;

    const DT: f32 = 0.02;

    fn slide_stance() -> Stance {
        let mut stance = Stance::from_template(&StanceTemplate::sliding(
            "Sliding",
            StanceSettings::default().with_priority(2),
            InputGateConfig::hold("Slide"),
            SlidingConfig::default(),
        ));
        stance.gate_mut().unwrap().update(ButtonEdge {
            started: true,
            cancelled: false,
            held: true,
        });
        stance
    }

    fn running(speed: f32) -> CharacterState {
        CharacterState {
            on_ground: true,
            last_displacement: Vec3::NEG_Z * speed * DT,
            fixed_dt: DT,
            ..default()
        }
    }

    #[test]
    fn needs_speed_ground_and_input() {
        let scene = MockScene::default();
        assert!(slide_stance().can_enter(&running(5.0), &scene));
        assert!(!slide_stance().can_enter(&running(2.0), &scene));

        let airborne = CharacterState {
            on_ground: false,
            ..running(5.0)
        };
        assert!(!slide_stance().can_enter(&airborne, &scene));

        let mut released = slide_stance();
        released.gate_mut().unwrap().update(ButtonEdge {
            started: false,
            cancelled: true,
            held: false,
        });
        assert!(!released.validate(&running(5.0), &scene));
    }

    #[test]
    fn slide_decays_with_friction() {
        let mut stance = slide_stance();
        let mut effects = BodyEffects::default();
        let state = running(5.0);
        stance.on_enter(&state, &mut effects);

        let first = stance.on_move(Vec3::ZERO, &state, DT, &mut effects);
        let expected = 5.0 * (1.0 - 0.2 * DT);
        assert!((first.length() - expected).abs() < 1e-4, "{first:?}");

        let second = stance.on_move(Vec3::ZERO, &state, DT, &mut effects);
        assert!(second.length() < first.length());
        assert!(effects.is_empty());
    }

    #[test]
    fn steering_is_scaled_by_control() {
        let mut stance = slide_stance();
        let mut effects = BodyEffects::default();
        let state = running(5.0);
        stance.on_enter(&state, &mut effects);

        let straight = stance.clone().on_move(Vec3::ZERO, &state, DT, &mut effects);
        let steered = stance.on_move(Vec3::X * 2.0, &state, DT, &mut effects);
        assert!((steered - straight).distance(Vec3::X * 0.2) < 1e-5);
    }
}
