//! Arena Push - simulation core for a platform arena brawler
//!
//! Core modules:
//! - `sim`: Entity store, per-frame systems (physics, collisions, falling,
//!   waves, power-ups, performance governor) and the event queue
//! - `tuning`: Data-driven game balance
//! - `error`: Error type for the few fallible entry points
//!
//! Rendering, audio, UI and persistence live outside this crate; they
//! consume [`sim::GameEvent`]s drained once per frame.

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use tuning::Tuning;

use glam::{Quat, Vec2, Vec3};

/// Game configuration constants
pub mod consts {
    /// Frame timestep used by the demo driver and tests (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;
    /// Upgrades available per type before further picks are no-ops
    pub const MAX_UPGRADE_LEVEL: u32 = 5;
    /// Number of upgrade choices offered after a wave
    pub const UPGRADE_CHOICE_COUNT: usize = 3;
}

/// Project a 3D position onto the ground plane (X, Z)
#[inline]
pub fn planar(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Planar (X, Z) distance between two positions, ignoring height
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar(a).distance(planar(b))
}

/// Unit direction from `from` to `to` on the ground plane (Y = 0).
///
/// Returns zero when the points coincide.
#[inline]
pub fn planar_direction(from: Vec3, to: Vec3) -> Vec3 {
    let d = to - from;
    Vec3::new(d.x, 0.0, d.z).normalize_or_zero()
}

/// Rotation about +Y that makes an entity at `from` face `to`
#[inline]
pub fn facing_rotation(from: Vec3, to: Vec3) -> Quat {
    let dir = planar_direction(from, to);
    if dir == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y(dir.x.atan2(dir.z))
}
