//! Error type for fallible simulation entry points
//!
//! Per-entity faults inside a frame are never surfaced here; systems skip
//! the entity and log instead.

use thiserror::Error;

use crate::sim::UpgradeKind;

/// Errors raised at configuration or command boundaries
#[derive(Debug, Error)]
pub enum SimError {
    /// Physics body rejected at creation time
    #[error("invalid physics body: mass {mass} must be > 0 and friction {friction} in (0, 1)")]
    InvalidBody { mass: f32, friction: f32 },

    /// Tuning value outside its legal range
    #[error("invalid tuning `{field}`: {reason}")]
    InvalidTuning { field: &'static str, reason: String },

    /// Tuning JSON failed to parse
    #[error("failed to parse tuning: {0}")]
    TuningParse(#[from] serde_json::Error),

    /// Upgrade chosen that is not among the pending choices
    #[error("upgrade {0:?} was not offered")]
    UpgradeNotOffered(UpgradeKind),

    /// Upgrade already at its level cap
    #[error("upgrade {0:?} is already at max level")]
    UpgradeMaxed(UpgradeKind),

    /// Command issued while no player entity exists
    #[error("no player entity in the world")]
    MissingPlayer,
}

impl SimError {
    pub(crate) fn tuning(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidTuning {
            field,
            reason: reason.into(),
        }
    }
}
