//! Data-driven game balance
//!
//! Every constant the systems read lives here so a balance pass never needs
//! a code change. Sections mirror the systems that consume them. Loading is
//! JSON via serde; any omitted field keeps its default.

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Movement, friction and fall detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// World Y below which anything counts as fallen
    pub fall_threshold_y: f32,
    /// Slack past the platform edge before a fall triggers
    pub edge_buffer: f32,
    pub player_mass: f32,
    pub player_friction: f32,
    /// Acceleration from a full-magnitude movement input (units/s²)
    pub player_acceleration: f32,
    /// Height of an entity's origin above the platform surface
    pub ground_level: f32,
    /// Downward acceleration for bodies with no platform under them
    pub gravity: f32,
    /// Enemy acceleration per unit of steering speed
    pub enemy_acceleration: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            fall_threshold_y: -5.0,
            edge_buffer: 0.3,
            player_mass: 1.0,
            player_friction: 0.92,
            player_acceleration: 30.0,
            ground_level: 0.5,
            gravity: 20.0,
            enemy_acceleration: 6.0,
        }
    }
}

/// The square arena platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformTuning {
    /// Half-extent of the unscaled platform model
    pub base_half_extent: f32,
    /// Uniform scale applied to the platform entity
    pub scale: f32,
    pub surface_y: f32,
}

impl Default for PlatformTuning {
    fn default() -> Self {
        Self {
            base_half_extent: 1.0,
            scale: 10.0,
            surface_y: 0.0,
        }
    }
}

/// Push resolution constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    pub player_enemy_radius: f32,
    pub enemy_enemy_radius: f32,
    /// Scales every push impulse
    pub base_force: f32,
    /// Player push strength before the force upgrade multiplier
    pub player_base_strength: f32,
    /// Resistance of enemies to being pushed
    pub enemy_resistance: f32,
    /// Minimum seconds between two pushes from the same enemy
    pub hit_cooldown: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            player_enemy_radius: 1.2,
            enemy_enemy_radius: 1.0,
            base_force: 12.0,
            player_base_strength: 1.0,
            enemy_resistance: 1.0,
            hit_cooldown: 0.25,
        }
    }
}

/// Base stats for one enemy tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub speed: f32,
    pub mass: f32,
    pub push_force: f32,
    pub score: u32,
    pub friction: f32,
    /// Visual scale of the template model
    pub scale: f32,
}

/// Enemy tier table, index 0 = tier 1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTuning(pub [TierStats; 5]);

impl Default for TierTuning {
    fn default() -> Self {
        Self([
            TierStats { speed: 3.0, mass: 1.0, push_force: 0.3, score: 10, friction: 0.9, scale: 1.0 },
            TierStats { speed: 3.5, mass: 1.3, push_force: 0.45, score: 20, friction: 0.9, scale: 1.1 },
            TierStats { speed: 4.0, mass: 1.6, push_force: 0.6, score: 35, friction: 0.9, scale: 1.2 },
            TierStats { speed: 4.5, mass: 2.0, push_force: 0.8, score: 50, friction: 0.88, scale: 1.35 },
            TierStats { speed: 5.0, mass: 2.6, push_force: 1.0, score: 80, friction: 0.88, scale: 1.5 },
        ])
    }
}

/// Knock-off animation timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallTuning {
    pub enemy_duration: f32,
    pub player_duration: f32,
    /// How far an entity sinks over the full animation
    pub descent_distance: f32,
    /// Radians of tumble over the full animation
    pub spin: f32,
    /// Final scale of a falling enemy (players keep their size)
    pub enemy_end_scale: f32,
}

impl Default for FallTuning {
    fn default() -> Self {
        Self {
            enemy_duration: 1.0,
            player_duration: 1.5,
            descent_distance: 6.0,
            spin: std::f32::consts::TAU,
            enemy_end_scale: 0.2,
        }
    }
}

/// Wave pacing and difficulty ramp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    pub base_quota: f32,
    pub growth_rate: f32,
    pub speed_increment: f32,
    pub score_increment: f32,
    /// Per-wave increase of the concurrent enemy cap multiplier
    pub concurrency_increment: f32,
    /// Seconds between completing a wave and starting the next
    pub inter_wave_delay: f32,
    /// Delay before the upgrade prompt is posted after a clear
    pub upgrade_prompt_delay: f32,
    pub base_bonus: f32,
    pub bonus_diminishing: f32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_quota: 5.0,
            growth_rate: 1.25,
            speed_increment: 0.05,
            score_increment: 0.1,
            concurrency_increment: 0.25,
            inter_wave_delay: 5.0,
            upgrade_prompt_delay: 1.0,
            base_bonus: 100.0,
            bonus_diminishing: 0.9,
        }
    }
}

/// Enemy spawn cadence and bursts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerTuning {
    pub base_interval: f32,
    pub reduction_per_wave: f32,
    pub min_ratio: f32,
    pub min_interval: f32,
    pub base_max_concurrent: u32,
    /// Distance kept from the platform edge when spawning
    pub spawn_margin: f32,
    pub burst_wave_threshold: u32,
    pub burst_chance: f64,
    pub burst_max: u32,
    pub burst_cooldown: f32,
    /// Seconds between enemies inside one burst
    pub burst_stagger: f32,
    /// Radius of the cluster a burst spawns into
    pub burst_spread: f32,
}

impl Default for SpawnerTuning {
    fn default() -> Self {
        Self {
            base_interval: 1.5,
            reduction_per_wave: 0.1,
            min_ratio: 0.3,
            min_interval: 0.4,
            base_max_concurrent: 4,
            spawn_margin: 1.5,
            burst_wave_threshold: 5,
            burst_chance: 0.2,
            burst_max: 4,
            burst_cooldown: 8.0,
            burst_stagger: 0.15,
            burst_spread: 1.5,
        }
    }
}

/// Loot box drops and placement search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTuning {
    pub spawn_interval: f32,
    pub spawn_chance: f64,
    pub max_active: usize,
    pub lifetime: f32,
    pub cell_size: f32,
    /// Minimum distance between two loot boxes
    pub min_spacing: f32,
    /// Loot never lands this close to the player
    pub player_exclusion: f32,
    pub fallback_attempts: u32,
    pub drop_height: f32,
    pub drop_duration: f32,
    pub pickup_radius: f32,
}

impl Default for LootTuning {
    fn default() -> Self {
        Self {
            spawn_interval: 8.0,
            spawn_chance: 0.6,
            max_active: 2,
            lifetime: 10.0,
            cell_size: 2.0,
            min_spacing: 3.0,
            player_exclusion: 3.0,
            fallback_attempts: 10,
            drop_height: 4.0,
            drop_duration: 0.5,
            pickup_radius: 1.0,
        }
    }
}

/// Time-slow and shockwave effects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    pub slow_factor: f32,
    pub slow_duration: f32,
    pub shockwave_radius: f32,
    pub shockwave_force: f32,
    /// Seconds the player is rooted while the shockwave plays
    pub shockwave_lock: f32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            slow_factor: 0.5,
            slow_duration: 3.0,
            shockwave_radius: 6.0,
            shockwave_force: 15.0,
            shockwave_lock: 0.6,
        }
    }
}

/// Permanent upgrade increments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    pub resilience_increment: f32,
    pub force_increment: f32,
    pub speed_increment: f32,
    pub slow_duration_increment: f32,
    pub shockwave_increment: f32,
    pub diminishing_factor: f32,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            resilience_increment: 0.25,
            force_increment: 0.2,
            speed_increment: 0.15,
            slow_duration_increment: 0.35,
            shockwave_increment: 0.3,
            diminishing_factor: 0.8,
        }
    }
}

/// Load-shedding thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceTuning {
    pub enabled: bool,
    pub fps_window: usize,
    pub low_fps: f32,
    pub high_enemy_count: usize,
    pub collision_interval: u64,
    pub aggressive_collision_interval: u64,
    pub batch_size: usize,
    pub aggressive_batch_size: usize,
    pub cache_refresh_frames: u64,
    pub aggressive_cache_refresh_frames: u64,
    /// Enemies farther than this from the player are "distant"
    pub lod_distance: f32,
    /// Distant enemies steer only every Nth frame under load
    pub distant_update_every: u64,
}

impl Default for PerformanceTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            fps_window: 60,
            low_fps: 45.0,
            high_enemy_count: 25,
            collision_interval: 1,
            aggressive_collision_interval: 3,
            batch_size: 64,
            aggressive_batch_size: 16,
            cache_refresh_frames: 10,
            aggressive_cache_refresh_frames: 30,
            lod_distance: 12.0,
            distant_update_every: 3,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub platform: PlatformTuning,
    pub collision: CollisionTuning,
    pub tiers: TierTuning,
    pub falling: FallTuning,
    pub wave: WaveTuning,
    pub spawner: SpawnerTuning,
    pub loot: LootTuning,
    pub power_ups: PowerUpTuning,
    pub progression: ProgressionTuning,
    pub performance: PerformanceTuning,
}

impl Tuning {
    /// Parse and validate a JSON balance sheet
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to pretty JSON (for dumping the defaults)
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the systems cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        let p = &self.physics;
        check_body("physics.player", p.player_mass, p.player_friction)?;
        positive("physics.edge_buffer", p.edge_buffer, true)?;

        positive("platform.base_half_extent", self.platform.base_half_extent, false)?;
        positive("platform.scale", self.platform.scale, false)?;

        let c = &self.collision;
        positive("collision.player_enemy_radius", c.player_enemy_radius, false)?;
        positive("collision.enemy_enemy_radius", c.enemy_enemy_radius, false)?;
        positive("collision.enemy_resistance", c.enemy_resistance, false)?;

        for stats in &self.tiers.0 {
            check_body("tiers", stats.mass, stats.friction)?;
            positive("tiers.speed", stats.speed, true)?;
        }

        positive("falling.enemy_duration", self.falling.enemy_duration, false)?;
        positive("falling.player_duration", self.falling.player_duration, false)?;

        let w = &self.wave;
        positive("wave.base_quota", w.base_quota, false)?;
        positive("wave.growth_rate", w.growth_rate, false)?;
        positive("wave.inter_wave_delay", w.inter_wave_delay, true)?;

        let s = &self.spawner;
        positive("spawner.base_interval", s.base_interval, false)?;
        positive("spawner.min_interval", s.min_interval, false)?;
        if s.base_max_concurrent == 0 {
            return Err(SimError::tuning("spawner.base_max_concurrent", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&s.burst_chance) {
            return Err(SimError::tuning("spawner.burst_chance", "must be a probability"));
        }
        if s.spawn_margin * 2.0 >= self.platform.base_half_extent * self.platform.scale * 2.0 {
            return Err(SimError::tuning("spawner.spawn_margin", "leaves no spawn area"));
        }

        let l = &self.loot;
        positive("loot.cell_size", l.cell_size, false)?;
        positive("loot.lifetime", l.lifetime, false)?;
        if !(0.0..=1.0).contains(&l.spawn_chance) {
            return Err(SimError::tuning("loot.spawn_chance", "must be a probability"));
        }

        if !(0.0..=1.0).contains(&self.power_ups.slow_factor) {
            return Err(SimError::tuning("power_ups.slow_factor", "must be in [0, 1]"));
        }

        let g = &self.progression;
        if !(0.0..=1.0).contains(&g.diminishing_factor) {
            return Err(SimError::tuning("progression.diminishing_factor", "must be in [0, 1]"));
        }

        let perf = &self.performance;
        if perf.fps_window < 2 {
            return Err(SimError::tuning("performance.fps_window", "needs at least 2 frames"));
        }
        if perf.collision_interval == 0
            || perf.aggressive_collision_interval == 0
            || perf.distant_update_every == 0
        {
            return Err(SimError::tuning("performance", "frame intervals must be >= 1"));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32, allow_zero: bool) -> Result<(), SimError> {
    let ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::tuning(field, format!("{value} is out of range")))
    }
}

fn check_body(field: &'static str, mass: f32, friction: f32) -> Result<(), SimError> {
    if mass > 0.0 && friction > 0.0 && friction < 1.0 {
        Ok(())
    } else {
        Err(SimError::tuning(field, format!("mass {mass} / friction {friction} out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "wave": { "base_quota": 8.0 } }"#).unwrap();
        assert_eq!(tuning.wave.base_quota, 8.0);
        assert_eq!(tuning.wave.growth_rate, WaveTuning::default().growth_rate);
        assert_eq!(tuning.spawner.base_interval, 1.5);
    }

    #[test]
    fn rejects_bad_friction() {
        let err = Tuning::from_json(r#"{ "physics": { "player_friction": 1.0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidTuning { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SimError::TuningParse(_)));
    }

    #[test]
    fn json_round_trip() {
        let json = Tuning::default().to_json().unwrap();
        let back = Tuning::from_json(&json).unwrap();
        assert_eq!(back.tiers.0, Tuning::default().tiers.0);
    }
}
