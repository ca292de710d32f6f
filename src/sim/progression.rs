//! Permanent player upgrades
//!
//! Five multipliers start at 1.0. Each pick of an upgrade adds
//! `base × diminishing^(level - 1)` to its multiplier, so repeated picks
//! are worth less each time. A type stops being offered once it reaches
//! [`MAX_UPGRADE_LEVEL`](crate::consts::MAX_UPGRADE_LEVEL).

use std::collections::BTreeMap;

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_UPGRADE_LEVEL, UPGRADE_CHOICE_COUNT};
use crate::tuning::ProgressionTuning;

/// Upgrade types the player can pick after a wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Pushed less by enemies
    Resilience,
    /// Pushes enemies harder
    Force,
    /// Moves faster
    Speed,
    /// Longer time-slow windows
    SlowDuration,
    /// Stronger shockwaves
    ShockwavePower,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 5] = [
        UpgradeKind::Resilience,
        UpgradeKind::Force,
        UpgradeKind::Speed,
        UpgradeKind::SlowDuration,
        UpgradeKind::ShockwavePower,
    ];

    pub fn base_increment(&self, tuning: &ProgressionTuning) -> f32 {
        match self {
            UpgradeKind::Resilience => tuning.resilience_increment,
            UpgradeKind::Force => tuning.force_increment,
            UpgradeKind::Speed => tuning.speed_increment,
            UpgradeKind::SlowDuration => tuning.slow_duration_increment,
            UpgradeKind::ShockwavePower => tuning.shockwave_increment,
        }
    }
}

/// Sampling weight for an upgrade already at `level`
pub fn choice_weight(level: u32) -> f64 {
    match level {
        0..=1 => 1.0,
        2..=3 => 0.7,
        _ => 0.3,
    }
}

/// Upgrade multipliers, per-type levels and wave counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub resilience: f32,
    pub force: f32,
    pub speed: f32,
    pub slow_duration: f32,
    pub shockwave_power: f32,
    /// Times each upgrade has been applied (capped)
    pub applied: BTreeMap<UpgradeKind, u32>,
    pub waves_completed: u32,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            resilience: 1.0,
            force: 1.0,
            speed: 1.0,
            slow_duration: 1.0,
            shockwave_power: 1.0,
            applied: BTreeMap::new(),
            waves_completed: 0,
        }
    }
}

impl ProgressionState {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        self.applied.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_maxed(&self, kind: UpgradeKind) -> bool {
        self.level(kind) >= MAX_UPGRADE_LEVEL
    }

    pub fn multiplier(&self, kind: UpgradeKind) -> f32 {
        match kind {
            UpgradeKind::Resilience => self.resilience,
            UpgradeKind::Force => self.force,
            UpgradeKind::Speed => self.speed,
            UpgradeKind::SlowDuration => self.slow_duration,
            UpgradeKind::ShockwavePower => self.shockwave_power,
        }
    }

    fn multiplier_mut(&mut self, kind: UpgradeKind) -> &mut f32 {
        match kind {
            UpgradeKind::Resilience => &mut self.resilience,
            UpgradeKind::Force => &mut self.force,
            UpgradeKind::Speed => &mut self.speed,
            UpgradeKind::SlowDuration => &mut self.slow_duration,
            UpgradeKind::ShockwavePower => &mut self.shockwave_power,
        }
    }

    /// Apply one level of `kind`.
    ///
    /// Returns the increment added, or `None` when already at cap (no-op).
    pub fn apply(&mut self, kind: UpgradeKind, tuning: &ProgressionTuning) -> Option<f32> {
        let level = self.level(kind);
        if level >= MAX_UPGRADE_LEVEL {
            return None;
        }
        let new_level = level + 1;
        self.applied.insert(kind, new_level);
        let increment =
            kind.base_increment(tuning) * tuning.diminishing_factor.powi(new_level as i32 - 1);
        *self.multiplier_mut(kind) += increment;
        Some(increment)
    }

    /// Upgrade types that can still be picked
    pub fn eligible(&self) -> Vec<UpgradeKind> {
        UpgradeKind::ALL
            .into_iter()
            .filter(|k| !self.is_maxed(*k))
            .collect()
    }

    /// Draw up to three distinct, non-maxed upgrades.
    ///
    /// Higher-level upgrades are less likely but never excluded.
    pub fn generate_choices<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<UpgradeKind> {
        let mut pool = self.eligible();
        let mut choices = Vec::with_capacity(UPGRADE_CHOICE_COUNT);

        while choices.len() < UPGRADE_CHOICE_COUNT && !pool.is_empty() {
            let weights: Vec<f64> = pool.iter().map(|k| choice_weight(self.level(*k))).collect();
            let idx = match WeightedIndex::new(&weights) {
                Ok(dist) => dist.sample(rng),
                Err(err) => {
                    log::warn!("Upgrade weights unusable ({err}), taking first eligible");
                    0
                }
            };
            choices.push(pool.swap_remove(idx));
        }
        choices
    }
}
