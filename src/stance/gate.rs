//! Button gating for stances.

use bevy::prelude::*;

use crate::config::{GateMode, InputGateConfig};
use crate::intent::ButtonEdge;

/// Opens and closes a stance's eligibility from one button.
///
/// * [`GateMode::Hold`] is open between press and release.
/// * [`GateMode::Toggle`] flips on each press. The owning stance closes it
///   through [`InputGate::release_if_idle`] while it is active.
/// * [`GateMode::Tap`] is open for exactly the update in which the button
///   was pressed. The latch closes at the start of the following update.
#[derive(Debug, Clone, PartialEq)]
pub struct InputGate {
    config: InputGateConfig,
    active: bool,
    expiring: bool,
}

impl InputGate {
    pub fn new(config: InputGateConfig) -> Self {
        Self {
            config,
            active: false,
            expiring: false,
        }
    }

    pub fn button(&self) -> &str {
        &self.config.button
    }

    pub fn mode(&self) -> GateMode {
        self.config.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed this update's button edge.
    pub fn update(&mut self, edge: ButtonEdge) {
        match self.config.mode {
            GateMode::Hold => {
                if edge.started {
                    self.active = true;
                } else if edge.cancelled {
                    self.active = false;
                }
            }
            GateMode::Toggle => {
                if edge.started {
                    self.active = !self.active;
                }
            }
            GateMode::Tap => {
                if self.expiring {
                    self.active = false;
                    self.expiring = false;
                }
                if edge.started {
                    self.active = true;
                    self.expiring = true;
                }
            }
        }
    }

    /// Close a toggle once the movement stick falls under
    /// `toggle_threshold`. Other modes ignore the stick.
    pub fn release_if_idle(&mut self, movement: Vec2) {
        if self.config.mode == GateMode::Toggle
            && movement.length_squared() < self.config.toggle_threshold
        {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESS: ButtonEdge = ButtonEdge {
        started: true,
        cancelled: false,
        held: true,
    };
    const HELD: ButtonEdge = ButtonEdge {
        started: false,
        cancelled: false,
        held: true,
    };
    const RELEASE: ButtonEdge = ButtonEdge {
        started: false,
        cancelled: true,
        held: false,
    };
    const IDLE: ButtonEdge = ButtonEdge {
        started: false,
        cancelled: false,
        held: false,
    };

    #[test]
    fn hold_follows_the_button() {
        let mut gate = InputGate::new(InputGateConfig::hold("Slide"));
        assert!(!gate.is_active());

        gate.update(PRESS);
        assert!(gate.is_active());
        gate.update(HELD);
        assert!(gate.is_active());
        gate.update(RELEASE);
        assert!(!gate.is_active());
    }

    #[test]
    fn toggle_flips_on_press() {
        let mut gate = InputGate::new(InputGateConfig::toggle("Slide"));

        gate.update(PRESS);
        assert!(gate.is_active());
        gate.update(RELEASE);
        assert!(gate.is_active());
        gate.update(PRESS);
        assert!(!gate.is_active());
    }

    #[test]
    fn toggle_survives_idle_stick_until_released() {
        let mut gate = InputGate::new(InputGateConfig::toggle("Slide"));
        gate.update(PRESS);

        // Updates alone never clear the latch
        gate.update(IDLE);
        assert!(gate.is_active());

        // 0.5^2 + 0.5^2 = 0.5 is not below the threshold
        gate.release_if_idle(Vec2::splat(0.5));
        assert!(gate.is_active());

        gate.release_if_idle(Vec2::new(0.5, 0.0));
        assert!(!gate.is_active());
    }

    #[test]
    fn hold_ignores_idle_stick() {
        let mut gate = InputGate::new(InputGateConfig::hold("Slide"));
        gate.update(PRESS);
        gate.release_if_idle(Vec2::ZERO);
        assert!(gate.is_active());
    }

    #[test]
    fn tap_lasts_exactly_one_update() {
        let mut gate = InputGate::new(InputGateConfig::tap("Dash"));

        gate.update(PRESS);
        assert!(gate.is_active());
        gate.update(HELD);
        assert!(!gate.is_active());
        gate.update(RELEASE);
        assert!(!gate.is_active());

        gate.update(PRESS);
        assert!(gate.is_active());
    }
}
