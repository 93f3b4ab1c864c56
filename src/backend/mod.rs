mod noop;
mod traits;

pub use noop::{NoOpBackend, NoOpBackendPlugin, NoOpBody, NOOP_GRAVITY};
pub use traits::{BackendQuery, BodySweep, CharacterPhysicsBackend, CollisionQuery};

#[cfg(feature = "avian3d")]
pub use crate::avian::Avian3dBackend;
