//! Scene query results and layer masks.
//!
//! Every probe the locomotion code makes (ground rays, foot probes, wall
//! rays, body sweeps) reports a [`SensorCast`], filtered by a
//! [`CollisionMask`].

use bevy::prelude::*;

/// Outcome of one ray, sphere or body cast.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorCast {
    /// Whether the cast hit something.
    pub hit: bool,
    /// World distance travelled before contact.
    pub distance: f32,
    /// Surface normal at the contact.
    pub normal: Vec3,
    /// Contact point in world space.
    pub point: Vec3,
    /// Collider entity that was struck, when the backend knows it.
    pub entity: Option<Entity>,
}

impl SensorCast {
    /// Nothing was struck.
    pub fn miss() -> Self {
        Self::default()
    }

    /// Something was struck.
    pub fn hit(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            hit: true,
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Returns `Some(self)` when the cast hit, for `?`-style chaining.
    pub fn as_hit(self) -> Option<Self> {
        self.hit.then_some(self)
    }
}

/// Bit mask selecting which collision layers a query considers.
///
/// Layer `n` is bit `1 << n`. Matches how avian's `LayerMask` is laid out so
/// backends can pass it straight through.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    /// Mask matching every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// Mask matching nothing.
    pub const NONE: Self = Self(0);

    /// Mask containing a single layer.
    pub const fn layer(index: u32) -> Self {
        Self(1 << index)
    }

    /// Combine two masks.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether any layer of `other` is in this mask.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ALL
    }
}
