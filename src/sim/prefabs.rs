//! Spawn templates
//!
//! The asset layer owns models; the simulation only needs the gameplay half
//! of a template. A provider may not know a key, in which case the spawner
//! skips that spawn.

use super::components::{EnemyTier, PowerUpKind};
use crate::tuning::{TierStats, Tuning};

/// Gameplay data for cloning an enemy of one tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyTemplate {
    pub tier: EnemyTier,
    pub stats: TierStats,
}

/// Gameplay data for cloning a loot box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootBoxTemplate {
    pub kind: PowerUpKind,
    pub lifetime: f32,
}

/// Source of cloneable enemy and loot box templates
pub trait PrefabProvider {
    fn enemy(&self, tier: EnemyTier) -> Option<EnemyTemplate>;
    fn loot_box(&self, kind: PowerUpKind) -> Option<LootBoxTemplate>;
}

/// Templates built straight from the tuning tables
#[derive(Debug, Clone)]
pub struct BuiltinPrefabs {
    tiers: [TierStats; 5],
    loot_lifetime: f32,
}

impl BuiltinPrefabs {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            tiers: tuning.tiers.0,
            loot_lifetime: tuning.loot.lifetime,
        }
    }
}

impl PrefabProvider for BuiltinPrefabs {
    fn enemy(&self, tier: EnemyTier) -> Option<EnemyTemplate> {
        let stats = *self.tiers.get(usize::from(tier.ordinal()) - 1)?;
        Some(EnemyTemplate { tier, stats })
    }

    fn loot_box(&self, kind: PowerUpKind) -> Option<LootBoxTemplate> {
        Some(LootBoxTemplate {
            kind,
            lifetime: self.loot_lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_tier() {
        let prefabs = BuiltinPrefabs::from_tuning(&Tuning::default());
        for tier in EnemyTier::ALL {
            let template = prefabs.enemy(tier).unwrap();
            assert_eq!(template.tier, tier);
        }
        assert_eq!(prefabs.enemy(EnemyTier::One).unwrap().stats.push_force, 0.3);
        assert_eq!(prefabs.loot_box(PowerUpKind::TimeSlow).unwrap().lifetime, 10.0);
    }
}
