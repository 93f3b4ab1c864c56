//! Angle wrapping and euler clamping helpers.
//!
//! Euler angles here are degrees in (pitch, yaw, roll) order, decomposed as
//! yaw, then pitch, then roll (`EulerRot::YXZ`). That is the order a
//! first-person camera composes its rotation in, so clamping one axis never
//! bleeds into another for the ranges a camera actually uses.

use bevy::prelude::*;

/// Wrap an angle in degrees into `[0, 360)`.
///
/// Non-finite input yields `0.0`.
pub fn wrap_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn wrap_signed_degrees(angle: f32) -> f32 {
    let angle = wrap_degrees(angle);
    if angle > 180.0 {
        angle - 360.0
    } else {
        angle
    }
}

/// Wrap each component of an euler triple into `[0, 360)`.
pub fn wrap_euler(euler: Vec3) -> Vec3 {
    Vec3::new(
        wrap_degrees(euler.x),
        wrap_degrees(euler.y),
        wrap_degrees(euler.z),
    )
}

/// Decompose a rotation into (pitch, yaw, roll) degrees, each in `[0, 360)`.
pub fn euler_degrees(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    wrap_euler(Vec3::new(
        pitch.to_degrees(),
        yaw.to_degrees(),
        roll.to_degrees(),
    ))
}

/// Build a rotation from (pitch, yaw, roll) degrees.
pub fn from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Clamp `input` so that each euler axis stays within `[min, max]` degrees of
/// the same axis of `reference`.
///
/// Differences are measured the short way round, so a reference yaw of 350°
/// and an input yaw of 10° differ by +20°, not −340°.
pub fn clamp_relative(input: Quat, reference: Quat, min: Vec3, max: Vec3) -> Quat {
    let reference_euler = euler_degrees(reference);
    let delta = euler_degrees(input) - reference_euler;

    let delta = Vec3::new(
        clamp_axis(wrap_signed_degrees(delta.x), min.x, max.x),
        clamp_axis(wrap_signed_degrees(delta.y), min.y, max.y),
        clamp_axis(wrap_signed_degrees(delta.z), min.z, max.z),
    );

    from_euler_degrees(delta + reference_euler)
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    // tolerate swapped bounds from hand-edited configs
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    value.clamp(lo, hi)
}

/// Signed shortest rotation in degrees that turns heading `from` into `to`.
///
/// Positive values turn toward increasing angles. An exact half turn
/// resolves to `+180`.
pub fn shortest_yaw(from: f32, to: f32) -> f32 {
    wrap_signed_degrees(to - from)
}

/// Unsigned angle between two vectors in degrees.
///
/// Returns `0.0` when either vector is (near) zero length, which is how the
/// approach-angle checks treat a character standing still.
pub fn angle_between_degrees(a: Vec3, b: Vec3) -> f32 {
    let (Some(a), Some(b)) = (a.try_normalize(), b.try_normalize()) else {
        return 0.0;
    };
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Rotation taking direction `from` onto direction `to`, identity when
/// either is zero length.
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(from), Some(to)) => Quat::from_rotation_arc(from, to),
        _ => Quat::IDENTITY,
    }
}

/// Remove the component of `vector` along the plane normal `normal`.
pub fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    match normal.try_normalize() {
        Some(n) => vector - n * vector.dot(n),
        None => vector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::same_rotation;

    const EPS: f32 = 1e-2;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn wraps_into_unsigned_circle() {
        assert!(approx(wrap_degrees(-90.0), 270.0));
        assert!(approx(wrap_degrees(725.0), 5.0));
        assert!(approx(wrap_degrees(360.0), 0.0));
        assert_eq!(wrap_degrees(f32::NAN), 0.0);
        assert_eq!(wrap_degrees(f32::INFINITY), 0.0);
    }

    #[test]
    fn wraps_into_signed_circle() {
        assert!(approx(wrap_signed_degrees(270.0), -90.0));
        assert!(approx(wrap_signed_degrees(180.0), 180.0));
        assert!(approx(wrap_signed_degrees(-180.0), 180.0));
        assert!(approx(wrap_signed_degrees(-10.0), -10.0));
    }

    #[test]
    fn euler_round_trip() {
        let euler = Vec3::new(30.0, 120.0, 10.0);
        let back = euler_degrees(from_euler_degrees(euler));
        assert!(approx(back.x, 30.0), "{back:?}");
        assert!(approx(back.y, 120.0), "{back:?}");
        assert!(approx(back.z, 10.0), "{back:?}");
    }

    #[test]
    fn clamp_relative_limits_yaw_and_pitch() {
        let reference = Quat::IDENTITY;
        let input = from_euler_degrees(Vec3::new(-85.0, 170.0, 0.0));
        let clamped = clamp_relative(
            input,
            reference,
            Vec3::new(-80.0, -130.0, -360.0),
            Vec3::new(80.0, 130.0, 360.0),
        );
        let euler = euler_degrees(clamped);
        assert!(approx(wrap_signed_degrees(euler.x), -80.0), "{euler:?}");
        assert!(approx(euler.y, 130.0), "{euler:?}");
    }

    #[test]
    fn clamp_relative_measures_short_way_round() {
        let reference = from_euler_degrees(Vec3::new(0.0, 350.0, 0.0));
        let input = from_euler_degrees(Vec3::new(0.0, 10.0, 0.0));
        let clamped = clamp_relative(
            input,
            reference,
            Vec3::new(-80.0, -15.0, 0.0),
            Vec3::new(80.0, 15.0, 0.0),
        );
        // +20 relative is clamped to +15, i.e. absolute yaw 5
        assert!(approx(euler_degrees(clamped).y, 5.0));
    }

    #[test]
    fn clamp_relative_within_bounds_is_unchanged() {
        let reference = from_euler_degrees(Vec3::new(0.0, 45.0, 0.0));
        let input = from_euler_degrees(Vec3::new(20.0, 60.0, 0.0));
        let clamped = clamp_relative(
            input,
            reference,
            Vec3::new(-80.0, -130.0, -360.0),
            Vec3::new(80.0, 130.0, 360.0),
        );
        assert!(same_rotation(clamped, input));
    }

    #[test]
    fn shortest_yaw_picks_direction() {
        assert!(approx(shortest_yaw(350.0, 10.0), 20.0));
        assert!(approx(shortest_yaw(10.0, 350.0), -20.0));
        assert!(approx(shortest_yaw(-45.0, 315.0), 0.0));
        assert!(approx(shortest_yaw(0.0, 180.0), 180.0));
    }

    #[test]
    fn angle_between_handles_zero_vectors() {
        assert_eq!(angle_between_degrees(Vec3::ZERO, Vec3::X), 0.0);
        assert!(approx(angle_between_degrees(Vec3::X, Vec3::Y), 90.0));
        assert!(approx(angle_between_degrees(Vec3::X, Vec3::NEG_X), 180.0));
    }

    #[test]
    fn rotation_between_tilts_up_onto_slope() {
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        let rotation = rotation_between(Vec3::Y, normal);
        assert!((rotation * Vec3::Y).distance(normal) < 1e-4);
        assert_eq!(rotation_between(Vec3::Y, Vec3::ZERO), Quat::IDENTITY);
        assert!(same_rotation(rotation_between(Vec3::Y, Vec3::Y * 3.0), Quat::IDENTITY));

        // Opposite directions give a half turn.
        let flipped = rotation_between(Vec3::Y, Vec3::NEG_Y);
        assert!((flipped * Vec3::Y).distance(Vec3::NEG_Y) < 1e-4);
    }

    #[test]
    fn project_on_plane_removes_normal_component() {
        let projected = project_on_plane(Vec3::new(1.0, -2.0, 3.0), Vec3::Y * 5.0);
        assert_eq!(projected, Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(project_on_plane(Vec3::ONE, Vec3::ZERO), Vec3::ONE);
    }
}
