//! Collision-aware movement.
//!
//! [`resolve_move`] turns a desired displacement into one the body can
//! actually make: sweep the body along the displacement, stop at the first
//! obstruction, push off the surface, then slide the remainder along it.

use bevy::prelude::*;

use crate::backend::{BodySweep, CollisionQuery};
use crate::config::{sanitize_fraction, sanitize_rate, MoverConfig};
use crate::detection::SensorCast;
use crate::rotation::project_on_plane;

/// Outcome of one [`resolve_move`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveResult {
    /// Displacement actually applied.
    pub displacement: Vec3,
    /// The obstruction, if the sweep was blocked.
    pub hit: Option<SensorCast>,
    /// Whether the body stepped up onto a ledge.
    pub stepped: bool,
}

impl MoveResult {
    fn free(displacement: Vec3) -> Self {
        Self {
            displacement,
            ..default()
        }
    }
}

/// Resolve `displacement` for a body currently at `position`.
///
/// A zero-length (or non-finite) displacement returns zero without sweeping.
/// An unobstructed sweep returns `displacement` exactly. When the sweep hits
/// at fraction `d` of the requested distance, the result is
/// `displacement * d`, plus the hit normal scaled by `normal_offset`, plus the
/// remaining `1 - d` of the move scaled by `slide_amount` and projected onto
/// the hit plane.
pub fn resolve_move<Q>(
    query: &Q,
    position: Vec3,
    displacement: Vec3,
    config: &MoverConfig,
) -> MoveResult
where
    Q: BodySweep + CollisionQuery + ?Sized,
{
    let distance = displacement.length();
    if !distance.is_finite() || distance <= f32::EPSILON {
        return MoveResult::free(Vec3::ZERO);
    }
    let direction = displacement / distance;

    let Some(hit) = query.sweep(direction, distance).as_hit() else {
        return MoveResult::free(displacement);
    };

    if config.step_enabled {
        if let Some(step) = check_step(query, position, displacement, config) {
            return MoveResult {
                displacement: step,
                hit: Some(hit),
                stepped: true,
            };
        }
    }

    let fraction = sanitize_fraction(hit.distance / distance);
    let remaining = distance * (1.0 - fraction);
    let slide = project_on_plane(
        direction * remaining * sanitize_fraction(config.slide_amount),
        hit.normal,
    );

    MoveResult {
        displacement: displacement * fraction
            + hit.normal * sanitize_rate(config.normal_offset)
            + slide,
        hit: Some(hit),
        stepped: false,
    }
}

/// Probe for a ledge at the end of the move. Returns the displacement onto
/// it when it is no higher than `max_step_height`.
fn check_step<Q>(
    query: &Q,
    position: Vec3,
    displacement: Vec3,
    config: &MoverConfig,
) -> Option<Vec3>
where
    Q: CollisionQuery + ?Sized,
{
    let max_step = sanitize_rate(config.max_step_height);
    let offset = sanitize_rate(config.normal_offset);
    let probe_height = max_step + offset * 2.0;

    let origin = position + displacement + Vec3::Y * probe_height;
    let hit = query
        .cast_ray(origin, Vec3::NEG_Y, probe_height, config.ground_mask)
        .as_hit()?;

    let rise = hit.point.y - position.y;
    (rise > 0.0 && rise <= max_step).then(|| hit.point + Vec3::Y * offset - position)
}
