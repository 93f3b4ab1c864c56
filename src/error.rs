//! Error types.
//!
//! Simulation paths never fail: missing hits, unmapped bones and degenerate
//! vectors all have defined fallbacks. These errors only cover construction
//! and diagnostics.

use bevy::prelude::Entity;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocomotionError {
    /// Two stances in one set share a name. Names double as animation
    /// parameter keys, so they must be unique per character.
    #[error("duplicate stance name `{0}`")]
    DuplicateStance(String),

    /// A debug-draw sink refused a primitive.
    #[error("debug draw failed: {0}")]
    DebugDraw(String),

    /// A rig binding names an entity that is missing a required component.
    #[error("entity {entity} is missing component `{component}`")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        let err = LocomotionError::DuplicateStance("Sliding".into());
        assert!(err.to_string().contains("Sliding"));

        let err = LocomotionError::MissingComponent {
            entity: Entity::PLACEHOLDER,
            component: "Transform",
        };
        assert!(err.to_string().contains("Transform"));
    }
}
