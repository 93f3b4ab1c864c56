use crate::config::StanceSettings;

use super::CharacterState;

/// The grounded requirement shared by every stance.
pub(super) fn grounded_ok(settings: &StanceSettings, state: &CharacterState) -> bool {
    state.on_ground || !settings.needs_grounded
}
