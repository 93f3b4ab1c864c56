//! Per-character tuning.
//!
//! Each concern gets its own component so hosts only attach what they use:
//! a character without [`FootIkConfig`] simply gets no foot IK.

mod animation;
mod controller;
mod foot_ik;
mod mover;
mod ragdoll;
mod stances;

pub use animation::AnimationConfig;
pub use controller::ControllerConfig;
pub use foot_ik::FootIkConfig;
pub use mover::MoverConfig;
pub use ragdoll::RagdollConfig;
pub use stances::{
    GateMode, GrabbingConfig, InputGateConfig, SlidingConfig, StanceSettings, WallRunningConfig,
};

/// Treat negative or non-finite rates as zero.
pub(crate) fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() {
        rate.max(0.0)
    } else {
        0.0
    }
}

/// Clamp a fraction into `[0, 1]`, mapping NaN to zero.
pub(crate) fn sanitize_fraction(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Interpolation factor for a per-second rate over `dt`.
///
/// Always in `[0, 1]`, so smoothing with it is a convex blend.
pub(crate) fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    sanitize_fraction(sanitize_rate(rate) * sanitize_rate(dt))
}
